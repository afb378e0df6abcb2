use crate::{
    CalculatedColumn, Error, RawOverrides, Result, RowMapping, TableSchema, TransformMap, Value,
    separated_by,
};
use indexmap::IndexMap;
use std::fmt::Write;
use time::{Date, Time};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($out:ident, $value:expr) => {{
        if $value.is_finite() {
            let mut buffer = ryu::Buffer::new();
            $out.push_str(buffer.format($value));
        } else if $value.is_nan() {
            $out.push_str("'NaN'");
        } else if $value > 0.0 {
            $out.push_str("'Infinity'");
        } else {
            $out.push_str("'-Infinity'");
        }
    }};
}

/// Statement synthesis for one SQL dialect.
///
/// Every method is pure with respect to its inputs and writes into a caller
/// provided buffer. The defaults speak generic ANSI SQL; dialect writers
/// override the handful of methods where their syntax diverges (identifier
/// quoting, string escaping, schema introspection).
pub trait SqlWriter: Send + Sync {
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + 1;
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    /// Renders a single value as a SQL literal.
    fn write_value(&self, out: &mut String, value: &Value) {
        let _ = match value {
            v if v.is_null() => self.write_value_none(out),
            Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
            Value::Int16(Some(v)) => write_integer!(out, *v),
            Value::Int32(Some(v)) => write_integer!(out, *v),
            Value::Int64(Some(v)) => write_integer!(out, *v),
            Value::Float32(Some(v)) => write_float!(out, *v),
            Value::Float64(Some(v)) => write_float!(out, *v),
            Value::Decimal(Some(v)) => drop(write!(out, "{}", v)),
            Value::Varchar(Some(v)) => self.write_value_string(out, v),
            Value::Blob(Some(v)) => self.write_value_blob(out, v.as_ref()),
            Value::Date(Some(v)) => {
                out.push('\'');
                self.write_value_date(out, v);
                out.push('\'');
            }
            Value::Time(Some(v)) => {
                out.push('\'');
                self.write_value_time(out, v);
                out.push('\'');
            }
            Value::Timestamp(Some(v)) => {
                out.push('\'');
                self.write_value_date(out, &v.date());
                out.push('T');
                self.write_value_time(out, &v.time());
                out.push('\'');
            }
            Value::TimestampWithTimezone(Some(v)) => {
                out.push('\'');
                self.write_value_date(out, &v.date());
                out.push('T');
                self.write_value_time(out, &v.time());
                let _ = write!(
                    out,
                    "{:+03}:{:02}",
                    v.offset().whole_hours(),
                    v.offset().whole_minutes().unsigned_abs() % 60,
                );
                out.push('\'');
            }
            Value::Uuid(Some(v)) => drop(write!(out, "'{}'", v)),
            _ => unreachable!("null variants handled above"),
        };
    }

    /// The escaping primitive: a value as self-contained SQL-safe text.
    fn escape(&self, value: &Value) -> String {
        let mut out = String::with_capacity(16);
        self.write_value(&mut out, value);
        out
    }

    fn write_value_none(&self, out: &mut String) {
        out.push_str("NULL")
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize])
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push('\'');
        for b in value {
            let _ = write!(out, "\\x{:02X}", b);
        }
        out.push('\'');
    }

    fn write_value_date(&self, out: &mut String, value: &Date) {
        let _ = write!(
            out,
            "{:04}-{:02}-{:02}",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    fn write_value_time(&self, out: &mut String, value: &Time) {
        let _ = write!(
            out,
            "{:02}:{:02}:{:02}",
            value.hour(),
            value.minute(),
            value.second()
        );
        let mut subsecond = value.nanosecond();
        if subsecond != 0 {
            let mut width = 9;
            while width > 1 && subsecond % 10 == 0 {
                subsecond /= 10;
                width -= 1;
            }
            let _ = write!(out, ".{:0width$}", subsecond);
        }
    }

    /// Replaces each `?` placeholder outside single-quoted runs with the
    /// escaped argument, in order. Placeholder and argument counts must
    /// match exactly.
    fn substitute(&self, condition: &str, args: &[Value]) -> Result<String> {
        let mut out = String::with_capacity(condition.len() + args.len() * 8);
        let mut args = args.iter();
        let mut in_string = false;
        for c in condition.chars() {
            match c {
                '\'' => {
                    in_string = !in_string;
                    out.push(c);
                }
                '?' if !in_string => {
                    let value = args.next().ok_or_else(|| {
                        Error::msg(format!(
                            "Not enough arguments for the placeholders in `{condition}`"
                        ))
                    })?;
                    self.write_value(&mut out, value);
                }
                _ => out.push(c),
            }
        }
        if args.next().is_some() {
            return Err(Error::msg(format!(
                "More arguments than placeholders in `{condition}`"
            )));
        }
        Ok(out)
    }

    /// Effective write set: serialized columns restricted to the schema,
    /// overlaid by raw literal fragments. Raw text wins for a shared column
    /// and is emitted untouched; it may also introduce columns the
    /// serializer never produced. The primary key participates only when
    /// `include_key` is set and its value is non-NULL.
    fn collect_write_set(
        &self,
        schema: &TableSchema,
        row: &RowMapping,
        raw: Option<&RawOverrides>,
        include_key: bool,
    ) -> Result<IndexMap<String, String>> {
        let mut set = IndexMap::with_capacity(row.len());
        for (column, value) in row {
            if !schema.has_column(column) {
                continue;
            }
            if *column == schema.primary_key && (!include_key || value.is_null()) {
                continue;
            }
            set.insert(column.clone(), self.escape(value));
        }
        if let Some(raw) = raw {
            for (column, text) in raw {
                set.insert(column.clone(), text.clone());
            }
        }
        if set.is_empty() {
            return Err(Error::msg(format!(
                "No columns left to write for table `{}`",
                schema.table
            )));
        }
        Ok(set)
    }

    /// `SELECT <columns>, <expr> AS <alias>, ... FROM <table> WHERE
    /// <condition> [LIMIT n]`. A column with a read transform is emitted as
    /// the wrapped reference aliased back to its own name, so fetched rows
    /// keep the plain column names. The condition arrives already
    /// substituted and is emitted verbatim.
    fn write_select(
        &self,
        out: &mut String,
        schema: &TableSchema,
        calculated: &[CalculatedColumn],
        transforms: &TransformMap,
        condition: &str,
        limit: Option<u32>,
    ) {
        out.push_str("SELECT ");
        separated_by(
            out,
            schema.columns.iter(),
            |out, col| match transforms.get(col.as_str()).and_then(|t| t.read.as_ref()) {
                Some(read) => {
                    let mut reference = String::with_capacity(col.len() + 2);
                    self.write_identifier_quoted(&mut reference, col);
                    out.push_str(&read(&reference));
                    out.push_str(" AS ");
                    self.write_identifier_quoted(out, col);
                }
                None => self.write_identifier_quoted(out, col),
            },
            ", ",
        );
        for calc in calculated {
            out.push_str(", ");
            out.push_str(&calc.expression);
            out.push_str(" AS ");
            self.write_identifier_quoted(out, &calc.output_name);
        }
        out.push_str("\nFROM ");
        self.write_identifier_quoted(out, &schema.table);
        out.push_str("\nWHERE ");
        out.push_str(condition);
        if let Some(limit) = limit {
            let _ = write!(out, "\nLIMIT {}", limit);
        }
    }

    /// `INSERT INTO <table> (<columns>) VALUES (<values>)`. The primary key
    /// column is omitted when its value is absent or NULL, letting the
    /// database generate it. An empty effective column set is an error.
    fn write_insert(
        &self,
        out: &mut String,
        schema: &TableSchema,
        row: &RowMapping,
        raw: Option<&RawOverrides>,
    ) -> Result<()> {
        let values = self.collect_write_set(schema, row, raw, true)?;
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(out, &schema.table);
        out.push_str(" (");
        separated_by(
            out,
            values.keys(),
            |out, col| self.write_identifier_quoted(out, col),
            ", ",
        );
        out.push_str(") VALUES (");
        separated_by(out, values.values(), |out, text| out.push_str(text), ", ");
        out.push(')');
        Ok(())
    }

    /// Dialect hook appending a generated-key clause to a finished INSERT.
    /// No-op by default; dialects that report the key out of band (e.g.
    /// through their driver protocol) need nothing here.
    fn write_insert_returning(&self, _out: &mut String, _key_column: &str) {}

    /// `UPDATE <table> SET <col> = <value>, ... WHERE <pk> = <key>`. Every
    /// selected column is written whether or not it changed; the primary key
    /// is never part of the SET list. Missing or NULL primary key and an
    /// empty effective column set are errors.
    fn write_update(
        &self,
        out: &mut String,
        schema: &TableSchema,
        row: &RowMapping,
        raw: Option<&RawOverrides>,
    ) -> Result<()> {
        let key = row
            .get(schema.primary_key.as_str())
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                Error::msg(format!(
                    "Primary key `{}` not provided for UPDATE on `{}`",
                    schema.primary_key, schema.table
                ))
            })?;
        let assignments = self.collect_write_set(schema, row, raw, false)?;
        out.push_str("UPDATE ");
        self.write_identifier_quoted(out, &schema.table);
        out.push_str(" SET ");
        separated_by(
            out,
            assignments.iter(),
            |out, (col, text)| {
                self.write_identifier_quoted(out, col);
                out.push_str(" = ");
                out.push_str(text);
            },
            ", ",
        );
        out.push_str("\nWHERE ");
        self.write_identifier_quoted(out, &schema.primary_key);
        out.push_str(" = ");
        self.write_value(out, key);
        Ok(())
    }

    /// `DELETE FROM <table> WHERE <condition>`. The condition arrives
    /// already substituted and is emitted verbatim.
    fn write_delete(&self, out: &mut String, schema: &TableSchema, condition: &str) {
        out.push_str("DELETE FROM ");
        self.write_identifier_quoted(out, &schema.table);
        out.push_str("\nWHERE ");
        out.push_str(condition);
    }

    /// `SELECT COUNT(*) FROM <table> WHERE <clause>`. The clause is the
    /// caller's responsibility and is never escaped.
    fn write_count(&self, out: &mut String, schema: &TableSchema, clause: &str) {
        out.push_str("SELECT COUNT(*) AS tally\nFROM ");
        self.write_identifier_quoted(out, &schema.table);
        out.push_str("\nWHERE ");
        out.push_str(clause);
    }

    /// Introspection statement discovering the columns of `table`.
    ///
    /// The generic form reads `information_schema`, which most backends
    /// expose; dialects with a cheaper native command override it together
    /// with [`SqlWriter::parse_table_columns`]. Constraint usage is filtered
    /// to PRIMARY KEY so a UNIQUE column is not mistaken for a second key.
    fn write_table_columns(&self, out: &mut String, table: &str) {
        out.push_str(
            "SELECT c.column_name AS fieldname\
             , CASE WHEN k.column_name IS NULL THEN 0 ELSE 1 END AS pk\
             \nFROM information_schema.columns c\
             \nLEFT OUTER JOIN (\
             \n  SELECT u.table_name, u.column_name\
             \n  FROM information_schema.table_constraints t\
             \n  JOIN information_schema.constraint_column_usage u\
             \n  ON t.constraint_name = u.constraint_name AND t.table_name = u.table_name\
             \n  WHERE t.constraint_type = 'PRIMARY KEY'\
             \n) k\
             \nON c.table_name = k.table_name AND c.column_name = k.column_name\
             \nWHERE c.table_name = ",
        );
        self.write_value_string(out, table);
        out.push_str("\nORDER BY c.ordinal_position");
    }

    /// Interprets the rows of [`SqlWriter::write_table_columns`] into a
    /// schema. Exactly one primary key column must be discoverable.
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
            let name = row
                .get("fieldname")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::msg(format!("Malformed introspection row for table `{}`", table))
                })?;
            if row.get("pk").and_then(Value::as_i64) == Some(1)
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

/// ANSI SQL writer with no dialect overrides.
#[derive(Default, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub const fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {}
