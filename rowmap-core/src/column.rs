use indexmap::IndexMap;

/// A read-only, query-time-computed output column.
///
/// The expression is emitted verbatim as `<expression> AS <output_name>` in
/// every SELECT the owning adapter builds; it never participates in INSERT
/// or UPDATE column sets and never appears in the discovered table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculatedColumn {
    /// Alias the expression is exposed under in fetched rows.
    pub output_name: String,
    /// Raw SQL fragment computing the value. Not escaped.
    pub expression: String,
}

impl CalculatedColumn {
    pub fn new(output_name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            output_name: output_name.into(),
            expression: expression.into(),
        }
    }
}

/// SQL wrapper applied to one side of a real column's round trip. Receives
/// SQL text (a quoted column reference on reads, an escaped value on
/// writes) and returns the wrapped fragment.
pub type ColumnTransform = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Read/write transforms for one column whose stored shape differs from
/// what the application speaks natively, e.g. a geometry column read back
/// through `ST_AsText` and written through `ST_GeomFromText`.
#[derive(Default)]
pub struct ColumnTransforms {
    /// Wraps the quoted column reference in every SELECT; the result is
    /// aliased back to the column name.
    pub read: Option<ColumnTransform>,
    /// Wraps the escaped value on INSERT and UPDATE.
    pub write: Option<ColumnTransform>,
}

/// Column name to its configured transforms.
pub type TransformMap = IndexMap<String, ColumnTransforms>;
