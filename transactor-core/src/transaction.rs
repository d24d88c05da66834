use crate::{Executor, Result};
use std::{future::Future, sync::Arc};

/// Transactional `Executor` with `commit` and `rollback`.
///
/// Both take `&self` because a transaction can be shared by several nesting
/// levels. Implementations decide what a second completion does, the
/// wrappers shipped with this crate report [`TransactionError::AlreadyCompleted`](crate::TransactionError::AlreadyCompleted).
pub trait Transaction: Executor {
    /// Commit the outstanding changes.
    fn commit(&self) -> impl Future<Output = Result<()>> + Send;
    /// Rollback any uncommitted changes.
    fn rollback(&self) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Transaction> Transaction for Arc<T> {
    fn commit(&self) -> impl Future<Output = Result<()>> + Send {
        (**self).commit()
    }

    fn rollback(&self) -> impl Future<Output = Result<()>> + Send {
        (**self).rollback()
    }
}
