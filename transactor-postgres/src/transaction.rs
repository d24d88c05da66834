use crate::PostgresConnection;
use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
};
use transactor_core::{
    ErrorContext, Executor, Query, QueryResult, Result, Row, RowsAffected, Transaction,
    TransactionError, stream::Stream,
};

/// Transaction holding its own session, opened by
/// [`PostgresConnection::begin`](transactor_core::Beginnable::begin). Dropping
/// it without completing closes the session, which rolls back.
pub struct PostgresTransaction {
    connection: PostgresConnection,
    done: AtomicBool,
}

impl PostgresTransaction {
    pub(crate) async fn new(connection: PostgresConnection) -> Result<Self> {
        connection
            .execute("BEGIN".into())
            .await
            .context("Could not begin the postgres transaction")?;
        log::debug!("Began postgres transaction");
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

impl Executor for PostgresTransaction {
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

impl Transaction for PostgresTransaction {
    fn commit(&self) -> impl Future<Output = Result<()>> + Send {
        self.complete("COMMIT")
    }

    fn rollback(&self) -> impl Future<Output = Result<()>> + Send {
        self.complete("ROLLBACK")
    }
}
