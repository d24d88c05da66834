mod connection;
mod transaction;
mod util;
mod value_holder;

pub use connection::*;
pub use transaction::*;
pub(crate) use value_holder::*;
