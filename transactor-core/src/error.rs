use thiserror::Error;

/// Failures raised by the transaction machinery itself, as opposed to the
/// driver or the unit of work. They travel inside [`Error`](crate::Error) and
/// can be recovered with `downcast_ref`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionError {
    #[error("nested transactions are not supported")]
    NestedTransactionsUnsupported,
    #[error("the transaction has already been committed or rolled back")]
    AlreadyCompleted,
}
