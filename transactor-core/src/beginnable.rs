use crate::{Executor, Result, Transaction};
use std::future::Future;

/// An `Executor` able to start a transaction.
///
/// The root handle given to a [`Transactor`](crate::Transactor) must implement
/// it, and so do the handles nested strategies put in scope, since a nested
/// `within_transaction` begins on whatever handle is current.
pub trait Beginnable: Executor {
    type Transaction: Transaction;

    fn begin(&self) -> impl Future<Output = Result<Self::Transaction>> + Send;
}
