//! Table-to-object adapter.
//!
//! `rowmap` binds an application type to a relational table whose shape it
//! discovers from the database itself: the primary key and column set come
//! from introspection, never from declarations in code. On top of that
//! discovered schema it offers CRUD by primary key and simple filtered
//! queries, converting between rows and objects through caller supplied
//! closures. Joins, relationship graphs and query DSLs are deliberately out
//! of scope; hand-written SQL handles those better.
//!
//! The engine lives in `rowmap-core`, re-exported here in full. Connector
//! backends implement the [`Connection`] contract; see the integration
//! tests for a minimal in-memory one.

pub use rowmap_core::*;
