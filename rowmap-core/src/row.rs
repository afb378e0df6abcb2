use crate::Value;
use indexmap::IndexMap;

/// Ordered mapping of column name to value.
///
/// The universal interchange format of the crate: serializers produce one,
/// factories consume one, hooks transform one, and connectors return fetched
/// rows as a sequence of them. Insertion order is preserved so the emitted
/// column lists stay deterministic.
pub type RowMapping = IndexMap<String, Value>;

/// Mapping of column name to literal SQL text.
///
/// Entries bypass escaping entirely and overlay the serialized mapping on
/// writes (the raw text wins for a shared column, and may introduce columns
/// the serializer never produced). The caller vouches for the safety of the
/// fragments.
pub type RawOverrides = IndexMap<String, String>;

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Key generated by the database for the inserted row, when available.
    pub last_insert_id: Option<Value>,
}

/// Builds a [`RowMapping`] from `column => value` pairs.
///
/// ```rust
/// use rowmap_core::{row, Value};
/// let r = row! { "id" => 7i64, "account" => "fred" };
/// assert_eq!(r.get("account"), Some(&Value::from("fred")));
/// ```
#[macro_export]
macro_rules! row {
    ($($column:expr => $value:expr),* $(,)?) => {{
        let mut row = $crate::RowMapping::new();
        $(row.insert(::std::string::String::from($column), $crate::Value::from($value));)*
        row
    }};
}
