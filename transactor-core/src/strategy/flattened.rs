use crate::{
    Beginnable, CommitTarget, Executor, NestedTransactionStrategy, Query, QueryResult, Result,
    Row, RowsAffected, Scope, Transaction, stream::Stream,
};
use std::{future::Future, sync::Arc};

/// Nested transactions flattened into the outermost one, without savepoints.
///
/// Nested calls run directly in the enclosing transaction and completing them
/// does nothing: only the outermost commit or rollback has an effect. Do not
/// use it when intermediate changes must survive the failure of a nested
/// unit of work. Works with any backend.
#[derive(Default, Clone, Copy, Debug)]
pub struct Flattened;

impl<T: Transaction + 'static> NestedTransactionStrategy<T> for Flattened {
    type Handle = FlattenedTransaction<T>;

    fn nest(
        &self,
        scope: Scope<'_, Self::Handle>,
        transaction: Arc<T>,
    ) -> (Arc<Self::Handle>, CommitTarget<T, Self::Handle>) {
        match scope {
            Scope::Root => (
                Arc::new(FlattenedTransaction {
                    transaction: transaction.clone(),
                }),
                CommitTarget::Transaction(transaction),
            ),
            Scope::Nested(handle) => (handle.clone(), CommitTarget::Handle(handle.clone())),
        }
    }
}

/// Handle put in scope by [`Flattened`].
#[derive(Debug)]
pub struct FlattenedTransaction<T> {
    transaction: Arc<T>,
}

impl<T: Transaction> Executor for FlattenedTransaction<T> {
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

impl<T: Transaction> Beginnable for FlattenedTransaction<T> {
    type Transaction = Arc<T>;

    fn begin(&self) -> impl Future<Output = Result<Arc<T>>> + Send {
        let transaction = self.transaction.clone();
        async move { Ok(transaction) }
    }
}

impl<T: Transaction> Transaction for FlattenedTransaction<T> {
    fn commit(&self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn rollback(&self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        CommitTarget, Flattened, NestedTransactionStrategy, Scope, Transaction,
        strategy::tests::{begin_nested, shared},
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn nesting_shares_the_handle() {
        let transaction = shared();
        let (root, target) = Flattened.nest(Scope::Root, transaction.clone());
        assert!(matches!(target, CommitTarget::Transaction(..)));

        let begun = begin_nested(&*root).await.unwrap();
        assert!(Arc::ptr_eq(&begun, &transaction));
        let (nested, nested_target) = Flattened.nest(Scope::Nested(&root), begun);
        assert!(Arc::ptr_eq(&nested, &root));
        assert!(matches!(nested_target, CommitTarget::Handle(..)));

        nested_target.rollback().await.unwrap();
        nested.commit().await.unwrap();
        assert!(transaction.statements().is_empty());

        target.commit().await.unwrap();
        assert_eq!(transaction.statements(), ["COMMIT"]);
    }
}
