#![allow(dead_code)]
use std::{
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use transactor::{
    Beginnable, Error, Executor, Query, QueryResult, Result, RowsAffected, Transaction,
    TransactionError, stream::{self, Stream},
};

#[derive(Default)]
struct Shared {
    log: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    transactions: AtomicUsize,
}

impl Shared {
    fn record(&self, source: &str, sql: &str) -> Result<()> {
        self.log.lock().unwrap().push(format!("{source}: {sql}"));
        if self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| sql.starts_with(prefix.as_str()))
        {
            return Err(Error::msg(format!("injected failure on `{sql}`")));
        }
        Ok(())
    }
}

/// In process driver recording every statement it receives, prefixed with
/// `root` or `txN` (N counting transactions from 1).
#[derive(Clone, Default)]
pub struct Recorder {
    shared: Arc<Shared>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements starting with `prefix` fail after being recorded.
    pub fn fail_on(&self, prefix: &str) {
        self.shared.failing.lock().unwrap().push(prefix.into());
    }

    pub fn statements(&self) -> Vec<String> {
        self.shared.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.shared.log.lock().unwrap().clear();
    }
}

fn record(shared: &Shared, source: &str, query: Query) -> impl Stream<Item = Result<QueryResult>> {
    let result = shared.record(source, &query.sql).map(|_| {
        RowsAffected {
            rows_affected: 1,
            last_affected_id: None,
        }
        .into()
    });
    stream::iter([result])
}

impl Executor for Recorder {
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        record(&self.shared, "root", query)
    }
}

impl Beginnable for Recorder {
    type Transaction = RecorderTransaction;

    fn begin(&self) -> impl Future<Output = Result<RecorderTransaction>> + Send {
        let id = self.shared.transactions.fetch_add(1, Ordering::Relaxed) + 1;
        let transaction = RecorderTransaction {
            name: format!("tx{id}"),
            shared: self.shared.clone(),
            done: AtomicBool::new(false),
        };
        async move {
            transaction.shared.record(&transaction.name, "BEGIN")?;
            Ok(transaction)
        }
    }
}

pub struct RecorderTransaction {
    name: String,
    shared: Arc<Shared>,
    done: AtomicBool,
}

impl RecorderTransaction {
    fn complete(&self, sql: &str) -> Result<()> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Err(TransactionError::AlreadyCompleted.into());
        }
        self.shared.record(&self.name, sql)
    }
}

impl Executor for RecorderTransaction {
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        record(&self.shared, &self.name, query)
    }
}

impl Transaction for RecorderTransaction {
    fn commit(&self) -> impl Future<Output = Result<()>> + Send {
        let result = self.complete("COMMIT");
        async move { result }
    }

    fn rollback(&self) -> impl Future<Output = Result<()>> + Send {
        let result = self.complete("ROLLBACK");
        async move { result }
    }
}
