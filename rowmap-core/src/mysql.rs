use crate::{Error, Result, RowMapping, SqlWriter, TableSchema, Value};

/// MySQL / MariaDB dialect: backtick identifiers, backslash string escaping,
/// `DESCRIBE` introspection. Generated keys surface through the driver
/// protocol (`last_insert_id`), so INSERTs need no returning clause.
#[derive(Default, Clone, Copy)]
pub struct MysqlSqlWriter;

impl MysqlSqlWriter {
    pub const fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for MysqlSqlWriter {
    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(out, value, '`', "``");
        out.push('`');
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        let mut position = 0;
        for (i, c) in value.char_indices() {
            let replace = match c {
                '\'' => "\\'",
                '\\' => "\\\\",
                '\n' => "\\n",
                _ => continue,
            };
            out.push_str(&value[position..i]);
            out.push_str(replace);
            position = i + c.len_utf8();
        }
        out.push_str(&value[position..]);
        out.push('\'');
    }

    fn write_table_columns(&self, out: &mut String, table: &str) {
        out.push_str("DESCRIBE ");
        self.write_identifier_quoted(out, table);
    }

    fn parse_table_columns(&self, table: &str, rows: Vec<RowMapping>) -> Result<TableSchema> {
        if rows.is_empty() {
            return Err(Error::msg(format!(
                "Table `{}` does not exist or has no columns",
                table
            )));
        }
        let mut primary_key = None;
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = row.get("Field").and_then(Value::as_str).ok_or_else(|| {
                Error::msg(format!("Malformed DESCRIBE row for table `{}`", table))
            })?;
            if row.get("Key").and_then(Value::as_str) == Some("PRI")
                && primary_key.replace(name.to_owned()).is_some()
            {
                return Err(Error::msg(format!(
                    "Table `{}` has a composite primary key, which is not supported",
                    table
                )));
            }
            columns.push(name.to_owned());
        }
        let primary_key = primary_key.ok_or_else(|| {
            Error::msg(format!(
                "Could not discover a primary key for table `{}`",
                table
            ))
        })?;
        TableSchema::new(table, primary_key, columns)
    }
}
