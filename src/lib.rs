//! Run units of work inside a database transaction without passing the
//! transaction around.
//!
//! A [`Transactor`] begins a transaction, puts it in the [`Context`] handed to
//! the unit of work and commits or rolls back when the unit of work ends.
//! Code further down the call chain asks a [`DbGetter`] for the current handle
//! and transparently joins the transaction. Calls made inside another one are
//! resolved by a [`NestedTransactionStrategy`]: [`Savepoints`] (default),
//! [`Flattened`] or [`NoNesting`].
pub use transactor_core::*;
