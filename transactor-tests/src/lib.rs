mod balances;
mod flattened;
mod isolation;
mod no_nesting;
mod savepoints;

use crate::{
    flattened::flattened,
    isolation::{isolation, two_transactors},
    no_nesting::no_nesting,
    savepoints::{savepoint_names, savepoints},
};
use log::LevelFilter;
use std::{env, sync::Arc};
use transactor::Beginnable;

pub use balances::*;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Run every scenario against `root`. The backend must understand
/// `SAVEPOINT` and `RELEASE SAVEPOINT`, and `begin` must return transactions
/// that do not see each other's uncommitted changes.
pub async fn execute_tests<D>(root: D)
where
    D: Beginnable + 'static,
    D::Transaction: 'static,
{
    let root = Arc::new(root);
    savepoints(&root).await;
    savepoint_names(&root).await;
    flattened(&root).await;
    no_nesting(&root).await;
    isolation(&root).await;
    two_transactors(&root).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
