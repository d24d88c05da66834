mod as_value;
mod beginnable;
mod context;
mod db;
mod error;
mod executor;
mod fake;
mod query;
mod savepoint_writer;
mod strategy;
mod transaction;
mod transactor;
mod util;
mod value;

pub use ::anyhow::Context as ErrorContext;
pub use as_value::*;
pub use beginnable::*;
pub use context::*;
pub use db::*;
pub use error::*;
pub use executor::*;
pub use fake::*;
pub use query::*;
pub use savepoint_writer::*;
pub use strategy::*;
pub use transaction::*;
pub use transactor::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
