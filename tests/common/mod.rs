#![allow(dead_code)]

use log::LevelFilter;
use rowmap::{
    Adapter, AsValue, Connection, GenericSqlWriter, Result, RowMapping, RowsAffected, Value, row,
};
use std::{collections::VecDeque, env};

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

/// In-memory connector fulfilling the `Connection` contract: records every
/// statement it receives, answers introspection from `schema_rows` and
/// other fetches from a scripted queue.
pub struct FakeConnection {
    pub statements: Vec<String>,
    pub results: VecDeque<Vec<RowMapping>>,
    pub rows_affected: u64,
    pub next_key: i64,
    pub introspections: usize,
    pub schema_rows: Vec<RowMapping>,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
            results: VecDeque::new(),
            rows_affected: 1,
            next_key: 100,
            introspections: 0,
            schema_rows: schema_rows("id", &["id", "account", "is_active"]),
        }
    }

    pub fn push_rows(&mut self, rows: Vec<RowMapping>) {
        self.results.push_back(rows);
    }

    pub fn last_statement(&self) -> &str {
        self.statements.last().map(String::as_str).unwrap_or("")
    }
}

impl Connection for FakeConnection {
    type Writer = GenericSqlWriter;

    fn sql_writer(&self) -> GenericSqlWriter {
        GenericSqlWriter::new()
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<RowMapping>> {
        self.statements.push(sql.to_owned());
        if sql.contains("information_schema") {
            self.introspections += 1;
            return Ok(self.schema_rows.clone());
        }
        Ok(self.results.pop_front().unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str) -> Result<RowsAffected> {
        self.statements.push(sql.to_owned());
        Ok(RowsAffected {
            rows_affected: self.rows_affected,
            last_insert_id: None,
        })
    }

    async fn insert_returning_key(&mut self, sql: &str, _key_column: &str) -> Result<RowsAffected> {
        self.statements.push(sql.to_owned());
        let key = self.next_key;
        self.next_key += 1;
        Ok(RowsAffected {
            rows_affected: self.rows_affected,
            last_insert_id: Some(Value::Int64(Some(key))),
        })
    }
}

/// Introspection rows in the shape the generic writer parses.
pub fn schema_rows(pk: &str, columns: &[&str]) -> Vec<RowMapping> {
    columns
        .iter()
        .map(|column| {
            row! {
                "fieldname" => *column,
                "pk" => (*column == pk) as i64,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub account: String,
    pub is_active: bool,
}

impl User {
    pub fn new(account: &str) -> Self {
        Self {
            id: None,
            account: account.to_owned(),
            is_active: true,
        }
    }
}

pub fn serialize_user(user: &User) -> RowMapping {
    row! {
        "id" => user.id,
        "account" => user.account.clone(),
        "is_active" => user.is_active,
    }
}

pub fn user_factory(row: RowMapping) -> Result<User> {
    Ok(User {
        id: Option::<i64>::try_from_value(row.get("id").cloned().unwrap_or_default())?,
        account: String::try_from_value(row.get("account").cloned().unwrap_or_default())?,
        is_active: bool::try_from_value(row.get("is_active").cloned().unwrap_or_default())?,
    })
}

pub fn user_adapter(table: &str) -> Adapter<User, FakeConnection> {
    Adapter::new(table, serialize_user, user_factory)
        .primary_key_setter(|user, key| user.id = key.as_i64())
}
