use crate::{Result, RowMapping, RowsAffected, SqlWriter};
use std::future::Future;

/// Contract a connector backend fulfils for the adapter engine.
///
/// The engine never opens, pools or closes connections and never starts
/// transactions; callers pass an already-open connection into every
/// operation and remain responsible for its lifecycle. Each adapter
/// operation suspends at exactly one point: the delegated call into one of
/// these methods. Statement failures, timeouts and cancellation are the
/// backend's business and propagate to the caller unchanged.
pub trait Connection: Send {
    type Writer: SqlWriter;

    /// Dialect writer used for statement synthesis, identifier quoting and
    /// the value escaping primitive.
    fn sql_writer(&self) -> Self::Writer;

    /// Runs a statement and materializes the full result set as ordered
    /// column-to-value mappings. No streaming.
    fn fetch_all(&mut self, sql: &str) -> impl Future<Output = Result<Vec<RowMapping>>> + Send;

    /// Runs a statement that modifies rows.
    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<RowsAffected>> + Send;

    /// Runs an INSERT whose primary key the database generates, reporting
    /// the new key in [`RowsAffected::last_insert_id`].
    ///
    /// The default delegates to [`Connection::execute`]; backends whose
    /// dialect cannot report the key out of band (see
    /// `PostgresSqlWriter::write_insert_returning`) fetch the RETURNING row
    /// here instead.
    fn insert_returning_key(
        &mut self,
        sql: &str,
        _key_column: &str,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.execute(sql)
    }
}
