use crate::{
    CalculatedColumn, ColumnTransforms, Connection, Error, RawOverrides, Result, RowMapping,
    SqlWriter, TableSchema, TransformMap, Value, catalog, truncate_long,
};
use anyhow::Context as _;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Builds an ordered mapping out of an application object.
pub type Serializer<T> = Box<dyn Fn(&T) -> RowMapping + Send + Sync>;
/// Builds an application object out of a fetched row.
pub type Factory<T> = Box<dyn Fn(RowMapping) -> Result<T> + Send + Sync>;
/// Writes a database-generated key back into an application object.
pub type KeySetter<T> = Box<dyn Fn(&mut T, &Value) + Send + Sync>;
/// Transforms a mapping at one of the two hook points, with connection
/// access for lookups the transformation might need.
pub type Hook<C> =
    Box<dyn for<'a> Fn(&'a mut C, RowMapping) -> BoxFuture<'a, Result<RowMapping>> + Send + Sync>;

/// How a [`Adapter::delete`] picks its rows.
pub enum DeleteBy<'a, T> {
    /// By primary key value.
    PrimaryKey(Value),
    /// By the primary key carried in an object (extracted via the
    /// serializer).
    Object(&'a T),
    /// By a raw condition with `?` placeholders and escaped arguments.
    Condition(&'a str, &'a [Value]),
}

/// Outcome of a modify operation, returned directly so concurrent callers
/// never observe each other's metadata.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    /// The exact statement that was executed.
    pub statement: String,
    pub rows_affected: u64,
    /// Generated primary key, for INSERTs where the database produced one.
    pub last_insert_id: Option<Value>,
}

/// Binding of one application type to one database table.
///
/// The table's primary key and column set are discovered from the database
/// on first use and cached for the process lifetime; only the table name,
/// the conversion closures, calculated columns and per-column SQL
/// transforms are configured in code. Aside from that configuration the adapter is stateless: every
/// operation takes an open connection and returns its own result.
///
/// ```rust,ignore
/// let users: Adapter<User, PgConnection> = Adapter::new(
///     "user",
///     |u: &User| row! { "id" => u.id, "account" => u.account.clone() },
///     |row| Ok(User::from_row(row)?),
/// )
/// .primary_key_setter(|u, key| u.id = key.as_i64());
///
/// let outcome = users.save(&mut con, &mut fred, None).await?;
/// ```
pub struct Adapter<T, C: Connection> {
    table: String,
    serializer: Serializer<T>,
    factory: Factory<T>,
    key_setter: Option<KeySetter<T>>,
    calculated: Vec<CalculatedColumn>,
    transforms: TransformMap,
    before_save: Option<Hook<C>>,
    after_load: Option<Hook<C>>,
}

impl<T, C: Connection> Adapter<T, C> {
    pub fn new(
        table: impl Into<String>,
        serializer: impl Fn(&T) -> RowMapping + Send + Sync + 'static,
        factory: impl Fn(RowMapping) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            table: table.into(),
            serializer: Box::new(serializer),
            factory: Box::new(factory),
            key_setter: None,
            calculated: Vec::new(),
            transforms: TransformMap::new(),
            before_save: None,
            after_load: None,
        }
    }

    /// Adds a computed output column, emitted as `<expression> AS <name>` in
    /// every SELECT and never written. A name colliding with a real column
    /// is rejected with a fatal error at the first schema resolution, the
    /// earliest point the real column set is known.
    pub fn calculated(
        mut self,
        output_name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        self.calculated
            .push(CalculatedColumn::new(output_name, expression));
        self
    }

    /// SQL wrapper for reading a real column whose stored shape the
    /// application does not speak natively. The closure receives the quoted
    /// column reference and its result replaces it in every SELECT, aliased
    /// back to the column name:
    /// `.read_transform("geom", |col| format!("ST_AsText({col})"))`.
    pub fn read_transform(
        mut self,
        column: impl Into<String>,
        f: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.transforms
            .entry(column.into())
            .or_insert_with(ColumnTransforms::default)
            .read = Some(Box::new(f));
        self
    }

    /// Companion of [`Adapter::read_transform`] for the write side. The
    /// closure receives the escaped value and its result is emitted as
    /// literal SQL on INSERT and UPDATE:
    /// `.write_transform("geom", |value| format!("ST_GeomFromText({value})"))`.
    /// A raw override for the same column still wins.
    pub fn write_transform(
        mut self,
        column: impl Into<String>,
        f: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.transforms
            .entry(column.into())
            .or_insert_with(ColumnTransforms::default)
            .write = Some(Box::new(f));
        self
    }

    /// Closure used to write a generated key back into the object after an
    /// INSERT. Without one the key is still reported in the
    /// [`WriteOutcome`] but the object is left untouched.
    pub fn primary_key_setter(mut self, f: impl Fn(&mut T, &Value) + Send + Sync + 'static) -> Self {
        self.key_setter = Some(Box::new(f));
        self
    }

    /// Hook transforming the serialized mapping before any write (save,
    /// insert, update). Runs after serialization, before statement
    /// building. Absent hook is the identity.
    pub fn before_save(
        mut self,
        hook: impl for<'a> Fn(&'a mut C, RowMapping) -> BoxFuture<'a, Result<RowMapping>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.before_save = Some(Box::new(hook));
        self
    }

    /// Hook transforming each fetched row before the factory sees it (load,
    /// query, query_one). Absent hook is the identity.
    pub fn after_load(
        mut self,
        hook: impl for<'a> Fn(&'a mut C, RowMapping) -> BoxFuture<'a, Result<RowMapping>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.after_load = Some(Box::new(hook));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Resolves the table schema through the process-wide catalog and
    /// validates the calculated columns against the real column set.
    async fn schema(&self, con: &mut C) -> Result<Arc<TableSchema>> {
        let schema = catalog()
            .resolve(con, &self.table)
            .await
            .with_context(|| format!("While resolving the schema of `{}`", self.table))?;
        for calc in &self.calculated {
            if schema.has_column(&calc.output_name) {
                return Err(Error::msg(format!(
                    "Calculated column `{}` collides with a real column of table `{}`",
                    calc.output_name, self.table
                )));
            }
        }
        Ok(schema)
    }

    async fn run_before_save(&self, con: &mut C, row: RowMapping) -> Result<RowMapping> {
        match &self.before_save {
            Some(hook) => hook(con, row).await,
            None => Ok(row),
        }
    }

    async fn run_after_load(&self, con: &mut C, row: RowMapping) -> Result<RowMapping> {
        match &self.after_load {
            Some(hook) => hook(con, row).await,
            None => Ok(row),
        }
    }

    /// Folds the per-column write transforms into the raw overlay: each
    /// transformed schema column with a non-NULL value in `row` is escaped,
    /// wrapped and carried as a literal fragment. Caller raw fragments are
    /// applied on top and win for a shared column.
    fn write_overrides(
        &self,
        writer: &C::Writer,
        schema: &TableSchema,
        row: &RowMapping,
        raw: Option<&RawOverrides>,
    ) -> Option<RawOverrides> {
        let mut out = RawOverrides::new();
        for (column, transforms) in &self.transforms {
            let Some(write) = &transforms.write else {
                continue;
            };
            if !schema.has_column(column) || *column == schema.primary_key {
                continue;
            }
            if let Some(value) = row.get(column.as_str()).filter(|v| !v.is_null()) {
                out.insert(column.clone(), write(&writer.escape(value)));
            }
        }
        if let Some(raw) = raw {
            for (column, text) in raw {
                out.insert(column.clone(), text.clone());
            }
        }
        if out.is_empty() { None } else { Some(out) }
    }

    fn key_condition(&self, writer: &C::Writer, schema: &TableSchema, key: &Value) -> String {
        let mut condition = String::with_capacity(32);
        writer.write_identifier_quoted(&mut condition, &schema.primary_key);
        condition.push_str(" = ");
        writer.write_value(&mut condition, key);
        condition
    }

    /// Saves `data`: UPDATE when its serialized primary key holds a value,
    /// INSERT otherwise. On INSERT the generated key is written back into
    /// `data` through the configured setter.
    pub async fn save(
        &self,
        con: &mut C,
        data: &mut T,
        raw: Option<&RawOverrides>,
    ) -> Result<WriteOutcome> {
        let row = (self.serializer)(data);
        let row = self.run_before_save(con, row).await?;
        let schema = self.schema(con).await?;
        let has_key = row
            .get(schema.primary_key.as_str())
            .is_some_and(|v| !v.is_null());
        if has_key {
            self.update_row(con, &schema, &row, raw).await
        } else {
            self.insert_row(con, &schema, &row, raw, Some(data)).await
        }
    }

    /// Always INSERTs, whether or not the primary key carries a value. The
    /// generated key is written back only when the key was absent.
    pub async fn insert(
        &self,
        con: &mut C,
        data: &mut T,
        raw: Option<&RawOverrides>,
    ) -> Result<WriteOutcome> {
        let row = (self.serializer)(data);
        let row = self.run_before_save(con, row).await?;
        let schema = self.schema(con).await?;
        self.insert_row(con, &schema, &row, raw, Some(data)).await
    }

    /// Always UPDATEs, writing every selected column whether or not it
    /// changed. A missing or NULL primary key is an error.
    pub async fn update(
        &self,
        con: &mut C,
        data: &T,
        raw: Option<&RawOverrides>,
    ) -> Result<WriteOutcome> {
        let row = (self.serializer)(data);
        let row = self.run_before_save(con, row).await?;
        let schema = self.schema(con).await?;
        self.update_row(con, &schema, &row, raw).await
    }

    async fn insert_row(
        &self,
        con: &mut C,
        schema: &TableSchema,
        row: &RowMapping,
        raw: Option<&RawOverrides>,
        data: Option<&mut T>,
    ) -> Result<WriteOutcome> {
        let writer = con.sql_writer();
        let has_key = row
            .get(schema.primary_key.as_str())
            .is_some_and(|v| !v.is_null());
        let raw = self.write_overrides(&writer, schema, row, raw);
        let mut sql = String::with_capacity(256);
        writer.write_insert(&mut sql, schema, row, raw.as_ref())?;
        log::debug!("{}", truncate_long!(sql));
        let affected = if has_key {
            con.execute(&sql).await
        } else {
            writer.write_insert_returning(&mut sql, &schema.primary_key);
            con.insert_returning_key(&sql, &schema.primary_key).await
        }
        .with_context(|| format!("While inserting into `{}`", self.table))?;
        if !has_key {
            if let (Some(data), Some(setter), Some(key)) =
                (data, &self.key_setter, &affected.last_insert_id)
            {
                setter(data, key);
            }
        }
        Ok(WriteOutcome {
            statement: sql,
            rows_affected: affected.rows_affected,
            last_insert_id: affected.last_insert_id,
        })
    }

    async fn update_row(
        &self,
        con: &mut C,
        schema: &TableSchema,
        row: &RowMapping,
        raw: Option<&RawOverrides>,
    ) -> Result<WriteOutcome> {
        let writer = con.sql_writer();
        let raw = self.write_overrides(&writer, schema, row, raw);
        let mut sql = String::with_capacity(256);
        writer.write_update(&mut sql, schema, row, raw.as_ref())?;
        log::debug!("{}", truncate_long!(sql));
        let affected = con
            .execute(&sql)
            .await
            .with_context(|| format!("While updating `{}`", self.table))?;
        Ok(WriteOutcome {
            statement: sql,
            rows_affected: affected.rows_affected,
            last_insert_id: None,
        })
    }

    /// Loads the row with the given primary key, or `None` when no row
    /// matches. Absence is a normal outcome, not an error.
    pub async fn load(&self, con: &mut C, key: impl Into<Value>) -> Result<Option<T>> {
        let schema = self.schema(con).await?;
        let condition = self.key_condition(&con.sql_writer(), &schema, &key.into());
        let mut rows = self.fetch_rows(con, &schema, &condition, Some(1)).await?;
        match rows.pop() {
            Some(row) => {
                let row = self.run_after_load(con, row).await?;
                Ok(Some((self.factory)(row)?))
            }
            None => Ok(None),
        }
    }

    /// Fetches every row matching `condition` (default: all rows), capped
    /// at `limit`. Each `?` placeholder in the condition is replaced, in
    /// order, with the escaped argument; the condition text itself is never
    /// escaped. The whole result set is materialized before conversion.
    pub async fn query(
        &self,
        con: &mut C,
        condition: Option<&str>,
        args: &[Value],
        limit: Option<u32>,
    ) -> Result<Vec<T>> {
        let schema = self.schema(con).await?;
        let condition = con
            .sql_writer()
            .substitute(condition.unwrap_or("1 = 1"), args)?;
        let rows = self.fetch_rows(con, &schema, &condition, limit).await?;
        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let row = self.run_after_load(con, row).await?;
            result.push((self.factory)(row)?);
        }
        Ok(result)
    }

    /// [`Adapter::query`] with an implicit `LIMIT 1`, yielding a single
    /// object instead of a one-element collection.
    pub async fn query_one(
        &self,
        con: &mut C,
        condition: Option<&str>,
        args: &[Value],
    ) -> Result<Option<T>> {
        let schema = self.schema(con).await?;
        let condition = con
            .sql_writer()
            .substitute(condition.unwrap_or("1 = 1"), args)?;
        let mut rows = self.fetch_rows(con, &schema, &condition, Some(1)).await?;
        match rows.pop() {
            Some(row) => {
                let row = self.run_after_load(con, row).await?;
                Ok(Some((self.factory)(row)?))
            }
            None => Ok(None),
        }
    }

    async fn fetch_rows(
        &self,
        con: &mut C,
        schema: &TableSchema,
        condition: &str,
        limit: Option<u32>,
    ) -> Result<Vec<RowMapping>> {
        let writer = con.sql_writer();
        let mut sql = String::with_capacity(256);
        writer.write_select(
            &mut sql,
            schema,
            &self.calculated,
            &self.transforms,
            condition,
            limit,
        );
        log::debug!("{}", truncate_long!(sql));
        con.fetch_all(&sql)
            .await
            .with_context(|| format!("While querying `{}`", self.table))
    }

    /// Deletes rows picked by the given target. The three variants are
    /// equivalent for a row they all describe.
    pub async fn delete(&self, con: &mut C, target: DeleteBy<'_, T>) -> Result<WriteOutcome> {
        let schema = self.schema(con).await?;
        let writer = con.sql_writer();
        let condition = match target {
            DeleteBy::PrimaryKey(key) => self.key_condition(&writer, &schema, &key),
            DeleteBy::Object(data) => {
                let row = (self.serializer)(data);
                let key = row
                    .get(schema.primary_key.as_str())
                    .filter(|v| !v.is_null())
                    .ok_or_else(|| {
                        Error::msg(format!(
                            "Object carries no `{}` value to delete by",
                            schema.primary_key
                        ))
                    })?;
                self.key_condition(&writer, &schema, key)
            }
            DeleteBy::Condition(condition, args) => writer.substitute(condition, args)?,
        };
        let mut sql = String::with_capacity(128);
        writer.write_delete(&mut sql, &schema, &condition);
        log::debug!("{}", truncate_long!(sql));
        let affected = con
            .execute(&sql)
            .await
            .with_context(|| format!("While deleting from `{}`", self.table))?;
        Ok(WriteOutcome {
            statement: sql,
            rows_affected: affected.rows_affected,
            last_insert_id: None,
        })
    }

    /// Counts the rows matching `clause` (default: all rows). The clause
    /// passes through unescaped; it is the caller's responsibility.
    pub async fn count(&self, con: &mut C, clause: Option<&str>) -> Result<u64> {
        let schema = self.schema(con).await?;
        self.count_where(con, &schema, clause.unwrap_or("1 = 1"))
            .await
    }

    /// Whether a row with the given primary key exists.
    pub async fn exists(&self, con: &mut C, key: impl Into<Value>) -> Result<bool> {
        let schema = self.schema(con).await?;
        let condition = self.key_condition(&con.sql_writer(), &schema, &key.into());
        Ok(self.count_where(con, &schema, &condition).await? > 0)
    }

    async fn count_where(&self, con: &mut C, schema: &TableSchema, clause: &str) -> Result<u64> {
        let writer = con.sql_writer();
        let mut sql = String::with_capacity(128);
        writer.write_count(&mut sql, schema, clause);
        log::debug!("{}", truncate_long!(sql));
        let rows = con
            .fetch_all(&sql)
            .await
            .with_context(|| format!("While counting rows of `{}`", self.table))?;
        rows.first()
            .and_then(|row| row.values().next())
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                Error::msg(format!(
                    "COUNT(*) on `{}` returned no usable result",
                    self.table
                ))
            })
    }
}
