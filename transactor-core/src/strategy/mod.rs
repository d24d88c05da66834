mod flattened;
mod no_nesting;
mod savepoints;

pub use flattened::*;
pub use no_nesting::*;
pub use savepoints::*;

use crate::{Beginnable, Result, Transaction};
use std::sync::Arc;

/// Where a `within_transaction` call happens.
#[derive(Debug)]
pub enum Scope<'a, H> {
    /// Outermost call, the transaction was begun on the root handle.
    Root,
    /// Nested call, the transaction was begun on this handle of an enclosing
    /// call.
    Nested(&'a Arc<H>),
}

/// What the transactor commits or rolls back when the unit of work ends.
#[derive(Debug)]
pub enum CommitTarget<T, H> {
    /// The real transaction.
    Transaction(Arc<T>),
    /// A strategy handle, deciding by itself what completing means.
    Handle(Arc<H>),
}

impl<T: Transaction, H: Transaction> CommitTarget<T, H> {
    pub async fn commit(&self) -> Result<()> {
        match self {
            CommitTarget::Transaction(transaction) => transaction.commit().await,
            CommitTarget::Handle(handle) => handle.commit().await,
        }
    }

    pub async fn rollback(&self) -> Result<()> {
        match self {
            CommitTarget::Transaction(transaction) => transaction.rollback().await,
            CommitTarget::Handle(handle) => handle.rollback().await,
        }
    }
}

/// Policy deciding what a `within_transaction` call puts in scope and what
/// it completes, given where it happens and the transaction just begun.
///
/// A transactor asks its strategy once per call, right after `begin`
/// succeeded on the current handle: the root handle for the outermost call,
/// otherwise the [`Handle`](NestedTransactionStrategy::Handle) an enclosing
/// call put in scope. Nested calls therefore begin through `Handle::begin`,
/// which is where each policy creates a savepoint, reuses the transaction or
/// refuses to nest.
pub trait NestedTransactionStrategy<T: Transaction>: Send + Sync + 'static {
    type Handle: Beginnable<Transaction = Arc<T>> + Transaction + 'static;

    fn nest(
        &self,
        scope: Scope<'_, Self::Handle>,
        transaction: Arc<T>,
    ) -> (Arc<Self::Handle>, CommitTarget<T, Self::Handle>);
}
