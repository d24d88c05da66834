use crate::{Context, Executor, Result, RootDbGetter, TransactionRunner};
use std::{future::Future, sync::Arc};

/// Runner that does not open transactions.
///
/// `within_transaction` calls the unit of work with the context it received
/// and returns its result. Useful to test services written against
/// [`TransactionRunner`] and [`DbGetter`](crate::DbGetter).
#[derive(Default, Clone, Copy, Debug)]
pub struct FakeTransactor;

impl FakeTransactor {
    /// The runner plus a getter always returning `root`.
    pub fn new<D: Executor>(root: D) -> (Self, RootDbGetter<D>) {
        Self::from_arc(Arc::new(root))
    }

    pub fn from_arc<D: Executor>(root: Arc<D>) -> (Self, RootDbGetter<D>) {
        (FakeTransactor, RootDbGetter::new(root))
    }
}

impl TransactionRunner for FakeTransactor {
    fn within_transaction<F, Fut, R>(
        &self,
        ctx: &Context,
        f: F,
    ) -> impl Future<Output = Result<R>> + Send
    where
        F: FnOnce(Context) -> Fut + Send,
        Fut: Future<Output = Result<R>> + Send,
        R: Send,
    {
        f(ctx.clone())
    }

    fn is_within_transaction(&self, _ctx: &Context) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Context, DbGetter, Error, Executor, FakeTransactor, Query, QueryResult, Result,
        RowsAffected, TransactionRunner,
        stream::{self, Stream},
    };
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default)]
    struct Counting {
        statements: AtomicUsize,
    }

    impl Executor for Counting {
        fn run(&self, _query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
            self.statements.fetch_add(1, Ordering::Relaxed);
            stream::iter([Ok(RowsAffected {
                rows_affected: 1,
                last_affected_id: None,
            }
            .into())])
        }
    }

    #[tokio::test]
    async fn runs_the_unit_of_work_once() {
        let (transactor, getter) = FakeTransactor::new(Counting::default());
        let ctx = Context::new();
        let mut calls = 0;
        let affected = transactor
            .within_transaction(&ctx, async |inner| {
                calls += 1;
                assert!(!transactor.is_within_transaction(&inner));
                assert!(!inner.is_within_any_transaction());
                getter.get(&inner).execute("DELETE FROM t".into()).await
            })
            .await
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(affected.rows_affected, 1);
        assert_eq!(getter.get(&ctx).statements.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn error_is_returned_unchanged() {
        let (transactor, getter) = FakeTransactor::new(Counting::default());
        let error = transactor
            .within_transaction(&Context::new(), async |_| {
                Err::<(), Error>(Error::msg("boom"))
            })
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "boom");
        assert!(Arc::ptr_eq(
            &getter.get(&Context::new()),
            &getter.get(&Context::new())
        ));
    }
}
