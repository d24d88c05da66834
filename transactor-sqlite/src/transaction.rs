use crate::SqliteConnection;
use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
};
use transactor_core::{
    ErrorContext, Executor, Query, QueryResult, Result, Row, RowsAffected, Transaction,
    TransactionError, stream::Stream,
};

/// Transaction running on its own connection, opened by
/// [`SqliteConnection::begin`](transactor_core::Beginnable::begin).
pub struct SqliteTransaction {
    connection: SqliteConnection,
    done: AtomicBool,
}

impl SqliteTransaction {
    pub(crate) async fn new(connection: SqliteConnection) -> Result<Self> {
        connection
            .execute("BEGIN".into())
            .await
            .context("Could not begin the sqlite transaction")?;
        log::debug!("Began sqlite transaction on `{}`", connection.url());
        Ok(Self {
            connection,
            done: AtomicBool::new(false),
        })
    }

    async fn complete(&self, sql: &'static str) -> Result<()> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Err(TransactionError::AlreadyCompleted.into());
        }
        self.connection.execute(sql.into()).await?;
        Ok(())
    }
}

impl Executor for SqliteTransaction {
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.connection.run(query)
    }

    fn fetch(&self, query: Query) -> impl Stream<Item = Result<Row>> + Send {
        self.connection.fetch(query)
    }

    fn execute(&self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.connection.execute(query)
    }
}

impl Transaction for SqliteTransaction {
    fn commit(&self) -> impl Future<Output = Result<()>> + Send {
        self.complete("COMMIT")
    }

    fn rollback(&self) -> impl Future<Output = Result<()>> + Send {
        self.complete("ROLLBACK")
    }
}
