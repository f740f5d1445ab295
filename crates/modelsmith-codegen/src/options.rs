use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::typemap::TypeMapping;

/// Options for the code generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Namespace to render. Defaults to `public` when present, else the first one.
    /// An explicit value is also rendered into every table declaration.
    pub schema: Option<String>,
    /// Allow-list of table names; `None` renders every table.
    pub tables: Option<Vec<String>>,
    /// Render views as plain table declarations.
    pub include_views: bool,
    /// Render index declarations.
    pub include_indexes: bool,
    /// Render unique and check constraints.
    pub include_constraints: bool,
    /// Detect joined-table inheritance.
    pub detect_inheritance: bool,
    /// Singularize table names into class names.
    pub inflect: bool,
    /// Render mapped classes; when off every table is a plain declaration.
    pub generate_classes: bool,
    /// Tables whose classes receive audit bookkeeping.
    pub audited: BTreeSet<String>,
    /// Audit every mapped class.
    pub audit_all: bool,
    /// Table whose class gets the login-user capability.
    pub login_user: Option<String>,
    /// Table whose class gets the login-role capability.
    pub login_role: Option<String>,
    pub backrefs: BackrefOptions,
    /// Caller-declared relationships, authoritative over inference.
    pub relationships: Vec<ForcedRelationship>,
    /// Extra catalog type mappings keyed by catalog type name (e.g. `ltree`).
    pub types: BTreeMap<String, TypeMapping>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            schema: None,
            tables: None,
            include_views: true,
            include_indexes: true,
            include_constraints: true,
            detect_inheritance: true,
            inflect: true,
            generate_classes: true,
            audited: BTreeSet::new(),
            audit_all: false,
            login_user: None,
            login_role: None,
            backrefs: BackrefOptions::default(),
            relationships: Vec::new(),
            types: BTreeMap::new(),
        }
    }
}

/// Controls generation of one-to-many/one-to-one back-references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackrefOptions {
    pub enabled: bool,
    /// Drop the inferred back-reference of an edge when a forced relationship
    /// already links the same source table to the same target table.
    pub suppress_when_forced: bool,
    /// Foreign key edges that never get a back-reference.
    pub disabled: Vec<EdgeRef>,
}

impl Default for BackrefOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            suppress_when_forced: false,
            disabled: Vec::new(),
        }
    }
}

impl BackrefOptions {
    pub fn is_disabled(&self, table: &str, columns: &[String]) -> bool {
        !self.enabled
            || self.disabled.iter().any(|edge| {
                edge.table == table
                    && edge.columns.len() == columns.len()
                    && edge.columns.iter().all(|column| columns.contains(column))
            })
    }
}

/// A foreign key edge identified by its referencing table and local columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRef {
    pub table: String,
    pub columns: Vec<String>,
}

/// Caller-supplied relationship declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcedRelationship {
    /// Table whose class receives the attribute.
    pub source: String,
    /// Table whose class the attribute points at.
    pub target: String,
    /// Attribute name on the source class.
    pub name: String,
    /// Relationship arguments, rendered verbatim as `key=value`.
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl ForcedRelationship {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            name: name.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}
