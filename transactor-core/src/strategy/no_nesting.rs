use crate::{
    Beginnable, CommitTarget, Executor, NestedTransactionStrategy, Query, QueryResult, Result,
    Row, RowsAffected, Scope, Transaction, TransactionError, stream::Stream,
};
use std::{future::Future, sync::Arc};

/// Refuses nested transactions.
///
/// A `within_transaction` call made inside another one fails to begin with
/// [`TransactionError::NestedTransactionsUnsupported`] and its unit of work
/// never runs. The enclosing transaction is left alone, it is up to the
/// enclosing unit of work to decide what the failure means.
#[derive(Default, Clone, Copy, Debug)]
pub struct NoNesting;

impl<T: Transaction + 'static> NestedTransactionStrategy<T> for NoNesting {
    type Handle = NoNestingTransaction<T>;

    fn nest(
        &self,
        scope: Scope<'_, Self::Handle>,
        transaction: Arc<T>,
    ) -> (Arc<Self::Handle>, CommitTarget<T, Self::Handle>) {
        match scope {
            Scope::Root => (
                Arc::new(NoNestingTransaction {
                    transaction: transaction.clone(),
                }),
                CommitTarget::Transaction(transaction),
            ),
            // Unreachable through a transactor: the handle never begins
            Scope::Nested(handle) => (handle.clone(), CommitTarget::Handle(handle.clone())),
        }
    }
}

/// Handle put in scope by [`NoNesting`]. Completing it completes the
/// transaction, beginning on it always fails.
#[derive(Debug)]
pub struct NoNestingTransaction<T> {
    transaction: Arc<T>,
}

impl<T: Transaction> Executor for NoNestingTransaction<T> {
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.transaction.run(query)
    }

    fn fetch(&self, query: Query) -> impl Stream<Item = Result<Row>> + Send {
        self.transaction.fetch(query)
    }

    fn execute(&self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.transaction.execute(query)
    }
}

impl<T: Transaction> Beginnable for NoNestingTransaction<T> {
    type Transaction = Arc<T>;

    fn begin(&self) -> impl Future<Output = Result<Arc<T>>> + Send {
        async { Err(TransactionError::NestedTransactionsUnsupported.into()) }
    }
}

impl<T: Transaction> Transaction for NoNestingTransaction<T> {
    fn commit(&self) -> impl Future<Output = Result<()>> + Send {
        self.transaction.commit()
    }

    fn rollback(&self) -> impl Future<Output = Result<()>> + Send {
        self.transaction.rollback()
    }
}
