use crate::{
    Beginnable, CommitTarget, ErrorContext, Executor, NestedTransactionStrategy,
    NoReleaseSavepointWriter, Query, QueryResult, Result, Row, RowsAffected, SavepointWriter,
    Scope, SqlServerSavepointWriter, StandardSavepointWriter, Transaction, TransactionError,
    savepoint_name, stream::Stream,
};
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Nested transactions emulated with savepoints.
///
/// Every nesting level shares the transaction begun by the outermost call.
/// A nested call creates the savepoint `sp_<depth>` when it begins, releases
/// it when it commits and rolls back to it when it fails, so the enclosing
/// levels keep their own work.
///
/// The statement syntax comes from the [`SavepointWriter`]: see
/// [`NoReleaseSavepoints`] and [`SqlServerSavepoints`] for other dialects.
#[derive(Default, Clone, Debug)]
pub struct Savepoints<W: SavepointWriter = StandardSavepointWriter> {
    writer: W,
}

/// Savepoints without `RELEASE SAVEPOINT` (Oracle).
pub type NoReleaseSavepoints = Savepoints<NoReleaseSavepointWriter>;
/// Savepoints in Microsoft SQL Server syntax.
pub type SqlServerSavepoints = Savepoints<SqlServerSavepointWriter>;

impl Savepoints {
    pub const fn new() -> Self {
        Self {
            writer: StandardSavepointWriter,
        }
    }
}

impl<W: SavepointWriter> Savepoints<W> {
    pub const fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<T, W> NestedTransactionStrategy<T> for Savepoints<W>
where
    T: Transaction + 'static,
    W: SavepointWriter,
{
    type Handle = SavepointTransaction<T, W>;

    fn nest(
        &self,
        scope: Scope<'_, Self::Handle>,
        transaction: Arc<T>,
    ) -> (Arc<Self::Handle>, CommitTarget<T, Self::Handle>) {
        match scope {
            Scope::Root => (
                Arc::new(SavepointTransaction::new(
                    transaction.clone(),
                    self.writer.clone(),
                    0,
                )),
                CommitTarget::Transaction(transaction),
            ),
            Scope::Nested(parent) => {
                let handle = Arc::new(SavepointTransaction::new(
                    transaction,
                    self.writer.clone(),
                    parent.depth + 1,
                ));
                (handle.clone(), CommitTarget::Handle(handle))
            }
        }
    }
}

/// Handle put in scope by [`Savepoints`]: the shared transaction plus the
/// nesting depth it was created at.
///
/// The outermost handle (depth 0) owns no savepoint, completing it completes
/// the transaction itself.
#[derive(Debug)]
pub struct SavepointTransaction<T, W> {
    transaction: Arc<T>,
    writer: W,
    depth: u64,
    done: AtomicBool,
}

impl<T: Transaction, W: SavepointWriter> SavepointTransaction<T, W> {
    pub fn new(transaction: Arc<T>, writer: W, depth: u64) -> Self {
        Self {
            transaction,
            writer,
            depth,
            done: AtomicBool::new(false),
        }
    }

    /// 0 for the outermost level.
    pub fn depth(&self) -> u64 {
        self.depth
    }

    pub fn transaction(&self) -> &Arc<T> {
        &self.transaction
    }

    fn complete(&self) -> Result<()> {
        if self
            .done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TransactionError::AlreadyCompleted.into());
        }
        Ok(())
    }
}

impl<T: Transaction, W: SavepointWriter> Executor for SavepointTransaction<T, W> {
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

impl<T: Transaction, W: SavepointWriter> Beginnable for SavepointTransaction<T, W> {
    type Transaction = Arc<T>;

    fn begin(&self) -> impl Future<Output = Result<Arc<T>>> + Send {
        let name = savepoint_name(self.depth + 1);
        let mut sql = String::new();
        self.writer.write_savepoint(&mut sql, &name);
        async move {
            log::debug!("Creating savepoint `{}`", name);
            self.transaction
                .execute(sql.into())
                .await
                .with_context(|| format!("failed to create savepoint `{}`", name))?;
            Ok(self.transaction.clone())
        }
    }
}

impl<T: Transaction, W: SavepointWriter> Transaction for SavepointTransaction<T, W> {
    fn commit(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            if self.depth == 0 {
                return self.transaction.commit().await;
            }
            self.complete()?;
            let name = savepoint_name(self.depth);
            let mut sql = String::new();
            self.writer.write_release_savepoint(&mut sql, &name);
            if sql.is_empty() {
                return Ok(());
            }
            log::debug!("Releasing savepoint `{}`", name);
            self.transaction
                .execute(sql.into())
                .await
                .with_context(|| format!("failed to release savepoint `{}`", name))?;
            Ok(())
        }
    }

    fn rollback(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            if self.depth == 0 {
                return self.transaction.rollback().await;
            }
            self.complete()?;
            let name = savepoint_name(self.depth);
            let mut sql = String::new();
            self.writer.write_rollback_to_savepoint(&mut sql, &name);
            log::debug!("Rolling back to savepoint `{}`", name);
            self.transaction
                .execute(sql.into())
                .await
                .with_context(|| format!("failed to rollback to savepoint `{}`", name))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        CommitTarget, NestedTransactionStrategy, NoReleaseSavepoints, Savepoints, Scope,
        SqlServerSavepoints, Transaction, TransactionError,
        strategy::tests::{begin_nested, shared},
    };

    #[tokio::test]
    async fn root_commits_the_transaction() {
        let transaction = shared();
        let (handle, target) = Savepoints::new().nest(Scope::Root, transaction.clone());
        assert_eq!(handle.depth(), 0);
        assert!(matches!(target, CommitTarget::Transaction(..)));
        target.commit().await.unwrap();
        assert_eq!(transaction.statements(), ["COMMIT"]);
    }

    #[tokio::test]
    async fn outermost_handle_completes_the_transaction() {
        let transaction = shared();
        let (root, _) = Savepoints::new().nest(Scope::Root, transaction.clone());
        root.commit().await.unwrap();
        let (root, _) = Savepoints::new().nest(Scope::Root, transaction.clone());
        root.rollback().await.unwrap();
        assert_eq!(transaction.statements(), ["COMMIT", "ROLLBACK"]);
    }

    #[tokio::test]
    async fn nested_levels_use_positional_names() {
        let transaction = shared();
        let strategy = Savepoints::new();
        let (root, _) = strategy.nest(Scope::Root, transaction.clone());

        let begun = begin_nested(&*root).await.unwrap();
        let (first, target) = strategy.nest(Scope::Nested(&root), begun);
        assert_eq!(first.depth(), 1);
        assert!(matches!(target, CommitTarget::Handle(..)));

        let begun = begin_nested(&*first).await.unwrap();
        let (second, second_target) = strategy.nest(Scope::Nested(&first), begun);
        assert_eq!(second.depth(), 2);
        second_target.rollback().await.unwrap();
        target.commit().await.unwrap();

        // A sibling at depth 1 reuses the same name
        let begun = begin_nested(&*root).await.unwrap();
        let (sibling, sibling_target) = strategy.nest(Scope::Nested(&root), begun);
        assert_eq!(sibling.depth(), 1);
        sibling_target.commit().await.unwrap();

        assert_eq!(
            transaction.statements(),
            [
                "SAVEPOINT sp_1",
                "SAVEPOINT sp_2",
                "ROLLBACK TO SAVEPOINT sp_2",
                "RELEASE SAVEPOINT sp_1",
                "SAVEPOINT sp_1",
                "RELEASE SAVEPOINT sp_1",
            ]
        );
    }

    #[tokio::test]
    async fn completion_happens_once() {
        let transaction = shared();
        let strategy = Savepoints::new();
        let (root, _) = strategy.nest(Scope::Root, transaction.clone());
        let begun = begin_nested(&*root).await.unwrap();
        let (nested, _) = strategy.nest(Scope::Nested(&root), begun);

        nested.rollback().await.unwrap();
        let error = nested.commit().await.unwrap_err();
        assert_eq!(
            error.downcast_ref::<TransactionError>(),
            Some(&TransactionError::AlreadyCompleted)
        );
        assert!(nested.rollback().await.is_err());
        assert_eq!(
            transaction.statements(),
            ["SAVEPOINT sp_1", "ROLLBACK TO SAVEPOINT sp_1"]
        );
    }

    #[tokio::test]
    async fn no_release_dialect() {
        let transaction = shared();
        let strategy = NoReleaseSavepoints::default();
        let (root, _) = strategy.nest(Scope::Root, transaction.clone());
        let begun = begin_nested(&*root).await.unwrap();
        let (nested, target) = strategy.nest(Scope::Nested(&root), begun);
        target.commit().await.unwrap();
        assert!(nested.commit().await.is_err());
        let begun = begin_nested(&*root).await.unwrap();
        let (_, target) = strategy.nest(Scope::Nested(&root), begun);
        target.rollback().await.unwrap();
        assert_eq!(
            transaction.statements(),
            [
                "SAVEPOINT sp_1",
                "SAVEPOINT sp_1",
                "ROLLBACK TO SAVEPOINT sp_1"
            ]
        );
    }

    #[tokio::test]
    async fn sql_server_dialect() {
        let transaction = shared();
        let strategy = SqlServerSavepoints::default();
        let (root, _) = strategy.nest(Scope::Root, transaction.clone());
        let begun = begin_nested(&*root).await.unwrap();
        let (nested, target) = strategy.nest(Scope::Nested(&root), begun);
        let begun = begin_nested(&*nested).await.unwrap();
        let (_, inner_target) = strategy.nest(Scope::Nested(&nested), begun);
        inner_target.rollback().await.unwrap();
        target.commit().await.unwrap();
        assert_eq!(
            transaction.statements(),
            [
                "SAVE TRANSACTION sp_1",
                "SAVE TRANSACTION sp_2",
                "ROLLBACK TRANSACTION sp_2"
            ]
        );
    }
}
