use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constraints::{CheckConstraint, Constraint, ForeignKey, Index, PrimaryKey, UniqueConstraint};
use crate::types::{ColumnType, EnumType, GeneratedExpression, IdentityGeneration};

/// Top-level schema snapshot for a database.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseSchema {
    /// Contract version for this schema format.
    pub schema_version: String,
    /// Database engine identifier (e.g. `postgres`).
    pub engine: String,
    /// Database name when available.
    pub database: Option<String>,
    /// Namespaces captured from the database.
    pub schemas: Vec<Schema>,
    /// Enum types captured across namespaces.
    #[serde(default)]
    pub enums: Vec<EnumType>,
    /// Optional fingerprint of the schema for cache/validation purposes.
    #[serde(default)]
    pub schema_fingerprint: Option<String>,
}

impl DatabaseSchema {
    /// Look up a namespace by name.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|schema| schema.name == name)
    }

    /// Look up a catalog enum by namespace and name.
    pub fn enum_type(&self, schema: &str, name: &str) -> Option<&EnumType> {
        self.enums
            .iter()
            .find(|enum_type| enum_type.schema == schema && enum_type.name == name)
    }
}

/// A namespace containing tables and related objects.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
}

impl Schema {
    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }
}

/// A table-like object (table, view, materialized view, foreign table, partitioned table).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    #[serde(default)]
    pub comment: Option<String>,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    /// Engine-specific hints. Unknown keys are carried but never interpreted.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dialect_hints: BTreeMap<String, String>,
}

impl Table {
    pub fn is_view(&self) -> bool {
        matches!(self.kind, TableKind::View | TableKind::MaterializedView)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.constraints.iter().find_map(|constraint| match constraint {
            Constraint::PrimaryKey(pk) => Some(pk),
            _ => None,
        })
    }

    /// Primary key columns, empty when the table has no primary key.
    pub fn primary_key_columns(&self) -> &[String] {
        self.primary_key()
            .map(|pk| pk.columns.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_primary_key_column(&self, name: &str) -> bool {
        self.primary_key_columns().iter().any(|column| column == name)
    }

    /// Foreign keys in declaration order.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.constraints.iter().filter_map(|constraint| match constraint {
            Constraint::ForeignKey(fk) => Some(fk),
            _ => None,
        })
    }

    pub fn unique_constraints(&self) -> impl Iterator<Item = &UniqueConstraint> {
        self.constraints.iter().filter_map(|constraint| match constraint {
            Constraint::Unique(unique) => Some(unique),
            _ => None,
        })
    }

    pub fn check_constraints(&self) -> impl Iterator<Item = &CheckConstraint> {
        self.constraints.iter().filter_map(|constraint| match constraint {
            Constraint::Check(check) => Some(check),
            _ => None,
        })
    }

    /// Whether the given column set is guaranteed unique: it equals the
    /// primary key, a unique constraint, or a valid unique index.
    pub fn is_unique_column_set(&self, columns: &[String]) -> bool {
        let same_set = |other: &[String]| {
            other.len() == columns.len() && other.iter().all(|column| columns.contains(column))
        };

        if !columns.is_empty() && same_set(self.primary_key_columns()) {
            return true;
        }
        if self
            .unique_constraints()
            .any(|unique| same_set(&unique.columns))
        {
            return true;
        }
        self.indexes
            .iter()
            .any(|index| index.is_unique && index.is_valid && same_set(&index.columns))
    }
}

/// Kind of table represented in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    PartitionedTable,
    View,
    MaterializedView,
    ForeignTable,
    Other(String),
}

/// Column metadata for a table-like object.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    pub ordinal_position: i16,
    pub name: String,
    pub column_type: ColumnType,
    pub is_nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub identity: Option<IdentityGeneration>,
    #[serde(default)]
    pub generated: Option<GeneratedExpression>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Column {
    /// Identity columns and sequence-backed defaults count as autoincrement.
    pub fn is_autoincrement(&self) -> bool {
        self.identity.is_some()
            || self
                .default
                .as_deref()
                .is_some_and(|default| default.starts_with("nextval("))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> Column {
        Column {
            ordinal_position: 1,
            name: name.to_string(),
            column_type: ColumnType {
                data_type: "integer".to_string(),
                udt_schema: "pg_catalog".to_string(),
                udt_name: "int4".to_string(),
                character_max_length: None,
                numeric_precision: None,
                numeric_scale: None,
                collation: None,
            },
            is_nullable: true,
            default: None,
            identity: None,
            generated: None,
            comment: None,
        }
    }

    fn table() -> Table {
        Table {
            name: "accounts".to_string(),
            kind: TableKind::Table,
            comment: None,
            columns: vec![column("id"), column("email"), column("tenant_id")],
            constraints: vec![
                Constraint::PrimaryKey(PrimaryKey {
                    name: None,
                    columns: vec!["id".to_string()],
                }),
                Constraint::Unique(UniqueConstraint {
                    name: None,
                    columns: vec!["email".to_string()],
                    is_deferrable: false,
                    initially_deferred: false,
                }),
            ],
            indexes: vec![Index {
                name: "accounts_tenant_email".to_string(),
                columns: vec!["tenant_id".to_string(), "email".to_string()],
                is_unique: true,
                is_primary: false,
                is_valid: true,
                method: "btree".to_string(),
                definition: String::new(),
            }],
            dialect_hints: BTreeMap::new(),
        }
    }

    #[test]
    fn detects_unique_column_sets() {
        let table = table();
        assert!(table.is_unique_column_set(&["id".to_string()]));
        assert!(table.is_unique_column_set(&["email".to_string(), "tenant_id".to_string()]));
        assert!(!table.is_unique_column_set(&["tenant_id".to_string()]));
    }

    #[test]
    fn sequence_default_is_autoincrement() {
        let mut id = column("id");
        assert!(!id.is_autoincrement());
        id.default = Some("nextval('accounts_id_seq'::regclass)".to_string());
        assert!(id.is_autoincrement());
    }
}
