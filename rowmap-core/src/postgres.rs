use crate::SqlWriter;

/// PostgreSQL dialect. Identifier quoting, string escaping and the
/// `information_schema` introspection of the generic writer already match
/// Postgres; the one divergence is key generation, reported by appending
/// `RETURNING <pk>` to the INSERT so the connector can fetch the new key
/// from the result row.
#[derive(Default, Clone, Copy)]
pub struct PostgresSqlWriter;

impl PostgresSqlWriter {
    pub const fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for PostgresSqlWriter {
    fn write_insert_returning(&self, out: &mut String, key_column: &str) {
        out.push_str("\nRETURNING ");
        self.write_identifier_quoted(out, key_column);
    }
}
