use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Primary key definition preserving column order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PrimaryKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Unique constraint definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UniqueConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub is_deferrable: bool,
    #[serde(default)]
    pub initially_deferred: bool,
}

/// Check constraint definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckConstraint {
    pub name: Option<String>,
    pub expression: String,
}

/// Foreign key action semantics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FkAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
    Unknown,
}

impl FkAction {
    /// SQL spelling used in rendered `ondelete`/`onupdate` arguments.
    ///
    /// `NoAction` is the database default and is never rendered.
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            FkAction::Restrict => Some("RESTRICT"),
            FkAction::Cascade => Some("CASCADE"),
            FkAction::SetNull => Some("SET NULL"),
            FkAction::SetDefault => Some("SET DEFAULT"),
            FkAction::NoAction | FkAction::Unknown => None,
        }
    }
}

/// Foreign key match semantics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FkMatchType {
    Full,
    Partial,
    Simple,
    Unknown,
}

fn default_fk_action() -> FkAction {
    FkAction::NoAction
}

fn default_match_type() -> FkMatchType {
    FkMatchType::Simple
}

/// Foreign key definition preserving column ordering.
///
/// `columns[i]` references `referenced_columns[i]`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    #[serde(default = "default_fk_action")]
    pub on_update: FkAction,
    #[serde(default = "default_fk_action")]
    pub on_delete: FkAction,
    #[serde(default = "default_match_type")]
    pub match_type: FkMatchType,
    #[serde(default)]
    pub is_deferrable: bool,
    #[serde(default)]
    pub initially_deferred: bool,
}

impl ForeignKey {
    /// Local column → referenced column pairs.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.referenced_columns.iter().map(String::as_str))
    }

    /// Whether the local column set equals `columns`, ignoring order.
    pub fn covers_exactly(&self, columns: &[String]) -> bool {
        self.columns.len() == columns.len()
            && self.columns.iter().all(|column| columns.contains(column))
    }
}

/// Index definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Index {
    pub name: String,
    /// Indexed columns in key order; empty for pure expression indexes.
    #[serde(default)]
    pub columns: Vec<String>,
    pub is_unique: bool,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default = "default_true")]
    pub is_valid: bool,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub definition: String,
}

fn default_true() -> bool {
    true
}

/// Table-level constraint definitions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    PrimaryKey(PrimaryKey),
    ForeignKey(ForeignKey),
    Unique(UniqueConstraint),
    Check(CheckConstraint),
}
