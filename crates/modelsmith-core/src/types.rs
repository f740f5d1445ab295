use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Formatted and raw catalog type metadata for a column.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnType {
    /// User-friendly formatted type (e.g. `character varying(255)`).
    pub data_type: String,
    /// Namespace of the underlying type.
    pub udt_schema: String,
    /// Name of the underlying type (e.g. `varchar`, `_int4`).
    pub udt_name: String,
    pub character_max_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub collation: Option<String>,
}

impl ColumnType {
    /// Array types follow the catalog convention of a leading underscore.
    pub fn is_array(&self) -> bool {
        self.udt_name.starts_with('_') || self.data_type.ends_with("[]")
    }

    /// Element type name for array columns.
    pub fn element_udt_name(&self) -> &str {
        self.udt_name.strip_prefix('_').unwrap_or(&self.udt_name)
    }
}

/// Identity generation strategy for columns using `GENERATED ... AS IDENTITY`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdentityGeneration {
    Always,
    ByDefault,
}

/// Kind of generated column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedKind {
    Stored,
}

/// Information about generated column expressions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedExpression {
    pub kind: GeneratedKind,
    pub expression: Option<String>,
}

/// Catalog enum type with its ordered labels.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EnumType {
    pub schema: String,
    pub name: String,
    pub labels: Vec<String>,
}
