mod adapter;
mod as_value;
mod column;
mod connection;
mod mysql;
mod postgres;
mod row;
mod schema;
mod sql_writer;
mod util;
mod value;

pub use ::anyhow::Context;
pub use adapter::*;
pub use as_value::*;
pub use column::*;
pub use connection::*;
pub use mysql::*;
pub use postgres::*;
pub use row::*;
pub use schema::*;
pub use sql_writer::*;
pub use util::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
