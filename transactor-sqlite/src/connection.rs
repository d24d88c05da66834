use crate::{
    CBox, SqliteTransaction,
    bind::bind_parameters,
    error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use async_stream::try_stream;
use libsqlite3_sys::{
    SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_URI, SQLITE_ROW, sqlite3, sqlite3_busy_timeout, sqlite3_close,
    sqlite3_column_count, sqlite3_errmsg, sqlite3_finalize, sqlite3_last_insert_rowid,
    sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt, sqlite3_total_changes64,
};
use std::{
    borrow::Cow,
    ffi::{CString, c_char, c_int},
    future::Future,
    ptr,
    sync::Arc,
};
use tokio::{sync::Mutex, task::spawn_blocking};
use transactor_core::{
    Beginnable, Error, ErrorContext, Executor, Query, QueryResult, Result, Row, RowNames,
    RowsAffected, log_error, stream::Stream, truncate_long,
};

const BUSY_TIMEOUT_MS: c_int = 5000;

/// Connection to a sqlite database.
///
/// Statements run one at a time on a blocking thread. Every
/// [`begin`](Beginnable::begin) opens a new connection to the same database,
/// so use a file (or a shared cache memory database) when working with
/// transactions.
pub struct SqliteConnection {
    url: Cow<'static, str>,
    connection: Arc<Mutex<CBox<*mut sqlite3>>>,
}

impl SqliteConnection {
    pub const PREFIX: &'static str = "sqlite://";

    /// Open the database at `sqlite://<path>`, query parameters are passed to
    /// sqlite as a URI (`?mode=rwc`, `?mode=memory&cache=shared`).
    pub async fn connect(url: Cow<'static, str>) -> Result<SqliteConnection> {
        if !url.starts_with(Self::PREFIX) {
            let error = Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                Self::PREFIX
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        let context = format!("While opening the sqlite database `{}`", url);
        let path = url.trim_start_matches(Self::PREFIX);
        let path = if path.starts_with("file:") {
            path.to_string()
        } else {
            format!("file:{}", path)
        };
        let path = CString::new(path)
            .context(context.clone())
            .map_err(|e| log_error!(e))?;
        let connection = spawn_blocking(move || unsafe {
            let mut connection = CBox::new(ptr::null_mut(), |p| {
                sqlite3_close(p);
            });
            let rc = sqlite3_open_v2(
                path.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI | SQLITE_OPEN_FULLMUTEX,
                ptr::null(),
            );
            if rc != SQLITE_OK {
                return Err(Error::msg(error_message_from_ptr(sqlite3_errmsg(
                    *connection,
                ))));
            }
            sqlite3_busy_timeout(*connection, BUSY_TIMEOUT_MS);
            Ok(connection)
        })
        .await?
        .context(context)
        .map_err(|e| log_error!(e))?;
        log::debug!("Opened sqlite database `{}`", url);
        Ok(Self {
            url,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Run every statement in `query`, collecting what each produces.
fn execute(connection: *mut sqlite3, query: &Query) -> Result<Vec<QueryResult>> {
    let sql = CString::new(query.sql.as_bytes())
        .context("Could not create a CString from the query String")?;
    let mut results = Vec::new();
    let mut remaining: *const c_char = sql.as_ptr();
    unsafe {
        while *remaining != 0 {
            let mut statement = CBox::new(ptr::null_mut(), |p| {
                sqlite3_finalize(p);
            });
            let mut tail = ptr::null();
            let rc = sqlite3_prepare_v2(connection, remaining, -1, &mut *statement, &mut tail);
            if rc != SQLITE_OK {
                return Err(Error::msg(error_message_from_ptr(sqlite3_errmsg(
                    connection,
                ))));
            }
            remaining = tail;
            // Whitespace or comment
            if statement.is_null() {
                continue;
            }
            bind_parameters(*statement, &query.params)?;
            step(connection, *statement, &mut results)?;
        }
    }
    Ok(results)
}

fn step(
    connection: *mut sqlite3,
    statement: *mut sqlite3_stmt,
    results: &mut Vec<QueryResult>,
) -> Result<()> {
    unsafe {
        let count = sqlite3_column_count(statement);
        let labels = (0..count)
            .map(|i| extract_name(statement, i))
            .collect::<Result<RowNames>>()?;
        let before = sqlite3_total_changes64(connection);
        loop {
            match sqlite3_step(statement) {
                SQLITE_ROW => {
                    let values = (0..count)
                        .map(|i| extract_value(statement, i))
                        .collect::<Result<Box<[_]>>>()?;
                    results.push(Row::new(labels.clone(), values).into());
                }
                SQLITE_DONE => break,
                _ => {
                    return Err(Error::msg(error_message_from_ptr(sqlite3_errmsg(
                        connection,
                    ))));
                }
            }
        }
        if count == 0 {
            let rows_affected = (sqlite3_total_changes64(connection) - before) as u64;
            results.push(
                RowsAffected {
                    rows_affected,
                    last_affected_id: (rows_affected > 0)
                        .then(|| sqlite3_last_insert_rowid(connection)),
                }
                .into(),
            );
        }
    }
    Ok(())
}

impl Executor for SqliteConnection {
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        let connection = self.connection.clone();
        try_stream! {
            let context = format!("While executing the query:\n{}", truncate_long!(query.sql));
            let guard = connection.lock_owned().await;
            let results = spawn_blocking(move || execute(**guard, &query))
                .await?
                .context(context)
                .map_err(|e| log_error!(e))?;
            for result in results {
                yield result;
            }
        }
    }
}

impl Beginnable for SqliteConnection {
    type Transaction = SqliteTransaction;

    fn begin(&self) -> impl Future<Output = Result<SqliteTransaction>> + Send {
        let url = self.url.clone();
        async move { SqliteTransaction::new(SqliteConnection::connect(url).await?).await }
    }
}
