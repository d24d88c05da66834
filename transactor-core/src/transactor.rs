use crate::{
    Beginnable, Context, Db, ErrorContext, NestedTransactionStrategy, Result, Savepoints, Scope,
    ScopeKey, ScopedDbGetter,
};
use std::{fmt, future::Future, sync::Arc};

/// Runs units of work inside a transaction.
///
/// Implemented by [`Transactor`] and [`FakeTransactor`](crate::FakeTransactor),
/// services can be generic over it and be tested without a database.
pub trait TransactionRunner: Send + Sync {
    /// Run `f` inside a transaction.
    ///
    /// `f` receives the context to pass down the call chain, every handle
    /// obtained from it participates in the transaction. The transaction is
    /// committed when `f` succeeds and rolled back when it fails, in which
    /// case the error of `f` is returned unchanged.
    fn within_transaction<F, Fut, R>(
        &self,
        ctx: &Context,
        f: F,
    ) -> impl Future<Output = Result<R>> + Send
    where
        F: FnOnce(Context) -> Fut + Send,
        Fut: Future<Output = Result<R>> + Send,
        R: Send;

    /// True when `ctx` was derived inside a `within_transaction` call of this
    /// runner.
    fn is_within_transaction(&self, ctx: &Context) -> bool;
}

/// Transaction manager over a root database handle.
///
/// Each instance owns a private [`ScopeKey`]: only the handles it put in a
/// context are visible to it, so several transactors (even over the same
/// root) can be used in the same call chain. Nested `within_transaction`
/// calls are handled by the strategy `S`, savepoints by default.
pub struct Transactor<D, S = Savepoints> {
    root: Arc<D>,
    strategy: S,
    key: ScopeKey,
}

impl<D, S> Transactor<D, S>
where
    D: Beginnable + 'static,
    D::Transaction: 'static,
    S: NestedTransactionStrategy<D::Transaction>,
{
    pub fn new(root: D, strategy: S) -> Self {
        Self::from_arc(Arc::new(root), strategy)
    }

    pub fn from_arc(root: Arc<D>, strategy: S) -> Self {
        Self {
            root,
            strategy,
            key: ScopeKey::new(),
        }
    }

    /// The current handle: the innermost transaction this transactor has in
    /// `ctx`, otherwise the root.
    pub fn db(&self, ctx: &Context) -> Db<D, S::Handle> {
        match ctx.resolve::<S::Handle>(self.key) {
            Some(handle) => Db::Transaction(handle),
            None => Db::Root(self.root.clone()),
        }
    }

    /// Getter doing the same as [`Transactor::db`], to hand to repositories.
    pub fn db_getter(&self) -> ScopedDbGetter<D, S::Handle> {
        ScopedDbGetter::new(self.root.clone(), self.key)
    }

    pub fn root(&self) -> &Arc<D> {
        &self.root
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn key(&self) -> ScopeKey {
        self.key
    }
}

impl<D, S> TransactionRunner for Transactor<D, S>
where
    D: Beginnable + 'static,
    D::Transaction: 'static,
    S: NestedTransactionStrategy<D::Transaction>,
{
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
        let ctx = ctx.clone();
        async move {
            let current = ctx.resolve::<S::Handle>(self.key);
            let transaction = match &current {
                Some(handle) => handle.begin().await,
                None => self.root.begin().await.map(Arc::new),
            }
            .context("failed to begin transaction")?;
            let scope = match &current {
                Some(handle) => Scope::Nested(handle),
                None => Scope::Root,
            };
            log::debug!(
                "Began {} transaction for {:?}",
                if current.is_some() { "nested" } else { "root" },
                self.key
            );
            let (handle, target) = self.strategy.nest(scope, transaction);
            let inner = ctx.with_transaction(self.key, handle);
            match f(inner).await {
                Ok(result) => {
                    target
                        .commit()
                        .await
                        .context("failed to commit transaction")?;
                    Ok(result)
                }
                Err(error) => {
                    if let Err(rollback) = target.rollback().await {
                        log::warn!(
                            "Rollback failed after `{:#}`, ignoring: {:#}",
                            error,
                            rollback
                        );
                    }
                    Err(error)
                }
            }
        }
    }

    fn is_within_transaction(&self, ctx: &Context) -> bool {
        ctx.contains(self.key)
    }
}

impl<D, S: Clone> Clone for Transactor<D, S> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            strategy: self.strategy.clone(),
            key: self.key,
        }
    }
}

impl<D, S: fmt::Debug> fmt::Debug for Transactor<D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transactor")
            .field("strategy", &self.strategy)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Beginnable, Context, Db, Error, Executor, Flattened, NoNesting, Query, QueryResult,
        Result, RowsAffected, Savepoints, TransactionError, TransactionRunner, Transactor,
        stream::{self, Stream},
        strategy::tests::LogTransaction,
    };
    use std::{
        future::Future,
        sync::{Arc, Mutex},
    };

    /// Root handing out one shared recording transaction per `begin`.
    #[derive(Default)]
    struct LogRoot {
        begun: Mutex<Vec<Arc<LogTransaction>>>,
    }

    impl LogRoot {
        fn last(&self) -> Arc<LogTransaction> {
            self.begun.lock().unwrap().last().unwrap().clone()
        }
    }

    impl Executor for LogRoot {
        fn run(&self, _query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
            stream::iter([Ok(RowsAffected::default().into())])
        }
    }

    impl Beginnable for LogRoot {
        type Transaction = Arc<LogTransaction>;

        fn begin(&self) -> impl Future<Output = Result<Self::Transaction>> + Send {
            let transaction = Arc::new(LogTransaction::default());
            self.begun.lock().unwrap().push(transaction.clone());
            async move { Ok(transaction) }
        }
    }

    #[tokio::test]
    async fn commits_on_success() {
        let transactor = Transactor::new(LogRoot::default(), Savepoints::new());
        let ctx = Context::new();
        let value = transactor
            .within_transaction(&ctx, async |ctx| {
                transactor.db(&ctx).execute("UPDATE t SET v = 1".into()).await?;
                Ok::<_, Error>(7)
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(
            transactor.root().last().statements(),
            ["UPDATE t SET v = 1", "COMMIT"]
        );
    }

    #[tokio::test]
    async fn rolls_back_on_failure() {
        let transactor = Transactor::new(LogRoot::default(), Savepoints::new());
        let error = transactor
            .within_transaction(&Context::new(), async |_| {
                Err::<(), Error>(TransactionError::AlreadyCompleted.into())
            })
            .await
            .unwrap_err();
        assert_eq!(
            error.downcast_ref::<TransactionError>(),
            Some(&TransactionError::AlreadyCompleted)
        );
        assert_eq!(transactor.root().last().statements(), ["ROLLBACK"]);
    }

    #[tokio::test]
    async fn scope_is_visible_only_inside() {
        let transactor = Transactor::new(LogRoot::default(), Flattened);
        let ctx = Context::new();
        assert!(!transactor.is_within_transaction(&ctx));
        assert!(matches!(transactor.db(&ctx), Db::Root(..)));
        transactor
            .within_transaction(&ctx, async |inner| {
                assert!(transactor.is_within_transaction(&inner));
                assert!(inner.is_within_any_transaction());
                assert!(matches!(transactor.db(&inner), Db::Transaction(..)));
                Ok::<_, Error>(())
            })
            .await
            .unwrap();
        assert!(!transactor.is_within_transaction(&ctx));
    }

    #[tokio::test]
    async fn nested_savepoint_rollback() {
        let transactor = Transactor::new(LogRoot::default(), Savepoints::new());
        transactor
            .within_transaction(&Context::new(), async |ctx| {
                let nested = transactor
                    .within_transaction(&ctx, async |_| {
                        Err::<(), Error>(Error::msg("nested failure"))
                    })
                    .await;
                assert_eq!(nested.unwrap_err().to_string(), "nested failure");
                Ok::<_, Error>(())
            })
            .await
            .unwrap();
        assert_eq!(transactor.root().begun.lock().unwrap().len(), 1);
        assert_eq!(
            transactor.root().last().statements(),
            ["SAVEPOINT sp_1", "ROLLBACK TO SAVEPOINT sp_1", "COMMIT"]
        );
    }

    #[tokio::test]
    async fn no_nesting_refuses_without_running() {
        let transactor = Transactor::new(LogRoot::default(), NoNesting);
        transactor
            .within_transaction(&Context::new(), async |ctx| {
                let mut ran = false;
                let error = transactor
                    .within_transaction(&ctx, async |_| {
                        ran = true;
                        Ok::<_, Error>(())
                    })
                    .await
                    .unwrap_err();
                assert!(!ran);
                assert_eq!(
                    error.downcast_ref::<TransactionError>(),
                    Some(&TransactionError::NestedTransactionsUnsupported)
                );
                assert_eq!(
                    format!("{:#}", error),
                    "failed to begin transaction: nested transactions are not supported"
                );
                Ok::<_, Error>(())
            })
            .await
            .unwrap();
        assert_eq!(transactor.root().last().statements(), ["COMMIT"]);
    }
}
