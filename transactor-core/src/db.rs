use crate::{
    Context, Executor, Query, QueryResult, Result, Row, RowsAffected, ScopeKey,
    future::Either,
    stream::Stream,
};
use std::{any::Any, fmt, future::Future, marker::PhantomData, sync::Arc};

/// Handle returned by a getter: the root or the transaction in scope.
pub enum Db<D, H> {
    Root(Arc<D>),
    Transaction(Arc<H>),
}

impl<D, H> Db<D, H> {
    pub fn is_transaction(&self) -> bool {
        matches!(self, Db::Transaction(..))
    }
}

impl<D, H> Clone for Db<D, H> {
    fn clone(&self) -> Self {
        match self {
            Db::Root(root) => Db::Root(root.clone()),
            Db::Transaction(handle) => Db::Transaction(handle.clone()),
        }
    }
}

impl<D, H> fmt::Debug for Db<D, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Db::Root(..) => "Db::Root",
            Db::Transaction(..) => "Db::Transaction",
        })
    }
}

impl<D: Executor, H: Executor> Executor for Db<D, H> {
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        match self {
            Db::Root(root) => Either::Left(root.run(query)),
            Db::Transaction(handle) => Either::Right(handle.run(query)),
        }
    }

    fn fetch(&self, query: Query) -> impl Stream<Item = Result<Row>> + Send {
        match self {
            Db::Root(root) => Either::Left(root.fetch(query)),
            Db::Transaction(handle) => Either::Right(handle.fetch(query)),
        }
    }

    fn execute(&self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        match self {
            Db::Root(root) => Either::Left(root.execute(query)),
            Db::Transaction(handle) => Either::Right(handle.execute(query)),
        }
    }
}

/// Gives repositories the handle they should run their statements on.
pub trait DbGetter: Send + Sync {
    type Db: Executor;

    fn get(&self, ctx: &Context) -> Self::Db;
}

/// Getter bound to a [`Transactor`](crate::Transactor): resolves its scope in
/// the context and falls back to the root.
pub struct ScopedDbGetter<D, H> {
    root: Arc<D>,
    key: ScopeKey,
    _handle: PhantomData<fn() -> H>,
}

impl<D, H> ScopedDbGetter<D, H> {
    pub fn new(root: Arc<D>, key: ScopeKey) -> Self {
        Self {
            root,
            key,
            _handle: PhantomData,
        }
    }
}

impl<D, H> Clone for ScopedDbGetter<D, H> {
    fn clone(&self) -> Self {
        Self::new(self.root.clone(), self.key)
    }
}

impl<D: Executor, H: Executor + Any> DbGetter for ScopedDbGetter<D, H> {
    type Db = Db<D, H>;

    fn get(&self, ctx: &Context) -> Self::Db {
        match ctx.resolve::<H>(self.key) {
            Some(handle) => Db::Transaction(handle),
            None => Db::Root(self.root.clone()),
        }
    }
}

/// Getter always returning the root, paired with
/// [`FakeTransactor`](crate::FakeTransactor).
pub struct RootDbGetter<D> {
    root: Arc<D>,
}

impl<D> RootDbGetter<D> {
    pub fn new(root: Arc<D>) -> Self {
        Self { root }
    }
}

impl<D> Clone for RootDbGetter<D> {
    fn clone(&self) -> Self {
        Self::new(self.root.clone())
    }
}

impl<D: Executor> DbGetter for RootDbGetter<D> {
    type Db = Arc<D>;

    fn get(&self, _ctx: &Context) -> Self::Db {
        self.root.clone()
    }
}
