use crate::{
    Query, QueryResult, Result, Row, RowsAffected,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::{future::Future, pin::pin, sync::Arc};

/// Anything that can run statements: a root connection, a transaction, or a
/// nested transaction wrapper.
///
/// Every method takes `&self`, drivers are expected to synchronize access to
/// the underlying connection themselves.
pub trait Executor: Send + Sync {
    /// General method to send any query and return any result type (either row or count)
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Execute the query and returns the rows.
    fn fetch(&self, query: Query) -> impl Stream<Item = Result<Row>> + Send {
        self.run(query).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute the query and return the total number of rows affected.
    fn execute(&self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }

    /// Execute the query and return the first row, if any.
    fn fetch_one(&self, query: Query) -> impl Future<Output = Result<Option<Row>>> + Send {
        async move {
            let mut stream = pin!(self.fetch(query));
            stream.try_next().await
        }
    }
}

impl<E: Executor> Executor for Arc<E> {
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        (**self).run(query)
    }

    fn fetch(&self, query: Query) -> impl Stream<Item = Result<Row>> + Send {
        (**self).fetch(query)
    }

    fn execute(&self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        (**self).execute(query)
    }

    fn fetch_one(&self, query: Query) -> impl Future<Output = Result<Option<Row>>> + Send {
        (**self).fetch_one(query)
    }
}
