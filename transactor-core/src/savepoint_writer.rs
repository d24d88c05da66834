use std::fmt::Debug;

/// Produces the dialect specific savepoint statements used by
/// [`Savepoints`](crate::Savepoints).
///
/// Each method appends a single statement to `out`, without a trailing
/// semicolon. Leaving `out` untouched means there is nothing to execute.
pub trait SavepointWriter: Clone + Debug + Send + Sync + 'static {
    /// Emit the statement creating the savepoint `name`.
    fn write_savepoint(&self, out: &mut String, name: &str);

    /// Emit the statement releasing the savepoint `name`.
    fn write_release_savepoint(&self, out: &mut String, name: &str);

    /// Emit the statement undoing everything done after the savepoint `name`.
    fn write_rollback_to_savepoint(&self, out: &mut String, name: &str);
}

/// `SAVEPOINT`, `RELEASE SAVEPOINT` and `ROLLBACK TO SAVEPOINT`, understood
/// by PostgreSQL, MySQL, MariaDB and SQLite.
#[derive(Default, Clone, Copy, Debug)]
pub struct StandardSavepointWriter;

impl SavepointWriter for StandardSavepointWriter {
    fn write_savepoint(&self, out: &mut String, name: &str) {
        out.push_str("SAVEPOINT ");
        out.push_str(name);
    }

    fn write_release_savepoint(&self, out: &mut String, name: &str) {
        out.push_str("RELEASE SAVEPOINT ");
        out.push_str(name);
    }

    fn write_rollback_to_savepoint(&self, out: &mut String, name: &str) {
        out.push_str("ROLLBACK TO SAVEPOINT ");
        out.push_str(name);
    }
}

/// Standard syntax for engines that have no `RELEASE SAVEPOINT` (Oracle):
/// savepoints go away with the enclosing transaction.
#[derive(Default, Clone, Copy, Debug)]
pub struct NoReleaseSavepointWriter;

impl SavepointWriter for NoReleaseSavepointWriter {
    fn write_savepoint(&self, out: &mut String, name: &str) {
        StandardSavepointWriter.write_savepoint(out, name);
    }

    fn write_release_savepoint(&self, _out: &mut String, _name: &str) {}

    fn write_rollback_to_savepoint(&self, out: &mut String, name: &str) {
        StandardSavepointWriter.write_rollback_to_savepoint(out, name);
    }
}

/// Microsoft SQL Server `SAVE TRANSACTION` / `ROLLBACK TRANSACTION`.
#[derive(Default, Clone, Copy, Debug)]
pub struct SqlServerSavepointWriter;

impl SavepointWriter for SqlServerSavepointWriter {
    fn write_savepoint(&self, out: &mut String, name: &str) {
        out.push_str("SAVE TRANSACTION ");
        out.push_str(name);
    }

    fn write_release_savepoint(&self, _out: &mut String, _name: &str) {}

    fn write_rollback_to_savepoint(&self, out: &mut String, name: &str) {
        out.push_str("ROLLBACK TRANSACTION ");
        out.push_str(name);
    }
}
