use std::collections::{BTreeMap, BTreeSet};

use heck::ToUpperCamelCase;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use modelsmith_core::{Column, DatabaseSchema, ForeignKey, Schema, Table};

use crate::annotate::Capability;
use crate::classify::AssociationRule;
use crate::errors::CodegenError;
use crate::inflect::{Inflector, sanitize_identifier};
use crate::options::GeneratorOptions;

/// Relationship cardinality as seen from the class that owns the attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ManyToOne,
    /// Many-to-one through a foreign key whose columns are unique.
    ManyToOneUnique,
    OneToMany,
    OneToOne,
    ManyToMany,
}

impl Cardinality {
    /// Whether the owning class holds the foreign key.
    pub fn is_forward(&self) -> bool {
        matches!(self, Cardinality::ManyToOne | Cardinality::ManyToOneUnique)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipOrigin {
    Inferred,
    Forced,
}

/// A foreign key edge between two tables of the rendered namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct FkEdge {
    pub table: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

impl FkEdge {
    pub fn from_foreign_key(table: &str, fk: &ForeignKey) -> Self {
        Self {
            table: table.to_string(),
            columns: fk.columns.clone(),
            referenced_table: fk.referenced_table.clone(),
            referenced_columns: fk.referenced_columns.clone(),
        }
    }

    pub fn is_self_referential(&self) -> bool {
        self.table == self.referenced_table
    }
}

/// Many-to-many link through an association table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Association {
    pub table: String,
    /// Edge from the association table to the owning class's table.
    pub source_edge: FkEdge,
    /// Edge from the association table to the target class's table.
    pub target_edge: FkEdge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub name: String,
    pub cardinality: Cardinality,
    pub origin: RelationshipOrigin,
    /// Foreign key followed by one-to-many/many-to-one/one-to-one relationships.
    pub edge: Option<FkEdge>,
    pub association: Option<Association>,
    pub back_populates: Option<String>,
    /// More than one foreign key path links source and target.
    pub explicit_join: bool,
    pub options: BTreeMap<String, Value>,
}

/// Mapped class for a table that is not an association table.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub table: String,
    pub class_name: String,
    /// Parent table under joined-table inheritance.
    pub parent: Option<String>,
    pub relationships: Vec<Relationship>,
    pub capabilities: Vec<Capability>,
    pub audited: bool,
}

impl Entity {
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|rel| rel.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InheritanceLink {
    pub child: String,
    pub parent: String,
    pub edge: FkEdge,
}

/// Everything the renderer needs, derived once from the snapshot and options.
#[derive(Debug)]
pub struct ObjectModel<'a> {
    pub schema: &'a DatabaseSchema,
    pub namespace: &'a Schema,
    /// Render the namespace into declarations and foreign key targets.
    pub qualified: bool,
    /// Selected tables in snapshot order.
    pub tables: Vec<&'a Table>,
    pub association_tables: BTreeSet<String>,
    pub entities: BTreeMap<String, Entity>,
    pub inheritance: Vec<InheritanceLink>,
}

impl<'a> ObjectModel<'a> {
    /// Select tables, classify association tables and create one entity per
    /// remaining table with a primary key.
    pub fn build(
        schema: &'a DatabaseSchema,
        options: &GeneratorOptions,
        rule: &dyn AssociationRule,
        inflector: &Inflector,
    ) -> Result<Self, CodegenError> {
        let namespace = select_namespace(schema, options.schema.as_deref())?;

        let tables: Vec<&Table> = namespace
            .tables
            .iter()
            .filter(|table| options.include_views || !table.is_view())
            .filter(|table| {
                options
                    .tables
                    .as_ref()
                    .is_none_or(|allowed| allowed.iter().any(|name| *name == table.name))
            })
            .collect();

        for table in &tables {
            check_foreign_keys(namespace, table)?;
        }

        let mut model = Self {
            schema,
            namespace,
            qualified: options.schema.is_some(),
            tables,
            association_tables: BTreeSet::new(),
            entities: BTreeMap::new(),
            inheritance: Vec::new(),
        };

        if !options.generate_classes {
            return Ok(model);
        }

        let mappable: BTreeSet<&str> = model
            .tables
            .iter()
            .filter(|table| !table.is_view() && !table.primary_key_columns().is_empty())
            .map(|table| table.name.as_str())
            .collect();
        let candidates: BTreeSet<&str> = model
            .tables
            .iter()
            .filter(|table| !table.is_view() && rule.is_association(table))
            .map(|table| table.name.as_str())
            .collect();

        for table in &model.tables {
            if !candidates.contains(table.name.as_str()) {
                continue;
            }
            let targets_mappable = table.foreign_keys().all(|fk| {
                fk.referenced_schema == namespace.name
                    && mappable.contains(fk.referenced_table.as_str())
                    && !candidates.contains(fk.referenced_table.as_str())
            });
            if targets_mappable {
                debug!(event = "association_table", table = %table.name);
                model.association_tables.insert(table.name.clone());
            }
        }

        let reserved: BTreeSet<String> = RESERVED_CLASS_NAMES
            .iter()
            .map(|name| name.to_string())
            .chain(options.types.values().map(|mapping| mapping.name.clone()))
            .collect();
        let mut class_names = BTreeSet::new();
        for table in &model.tables {
            if !mappable.contains(table.name.as_str())
                || model.association_tables.contains(&table.name)
            {
                continue;
            }
            let class_name = unique_class_name(&table.name, inflector, &class_names, &reserved)?;
            class_names.insert(class_name.clone());
            model.entities.insert(
                table.name.clone(),
                Entity {
                    table: table.name.clone(),
                    class_name,
                    parent: None,
                    relationships: Vec::new(),
                    capabilities: Vec::new(),
                    audited: false,
                },
            );
        }

        Ok(model)
    }

    pub fn table(&self, name: &str) -> Option<&'a Table> {
        self.tables.iter().copied().find(|table| table.name == name)
    }

    pub fn entity(&self, table: &str) -> Option<&Entity> {
        self.entities.get(table)
    }

    pub fn is_entity(&self, table: &str) -> bool {
        self.entities.contains_key(table)
    }

    /// Columns declared on the table's own class. A subclass leaves out the
    /// primary key columns it shares with its parent.
    pub fn mapped_columns(&self, table: &'a Table) -> Vec<&'a Column> {
        let inherited = self
            .entity(&table.name)
            .is_some_and(|entity| entity.parent.is_some());
        table
            .columns
            .iter()
            .filter(|column| !inherited || !table.is_primary_key_column(&column.name))
            .collect()
    }

    /// Attribute names taken by columns on the table's class.
    pub fn column_attributes(&self, table: &'a Table) -> BTreeSet<String> {
        self.mapped_columns(table)
            .into_iter()
            .map(|column| column_attribute(&column.name))
            .collect()
    }

    /// Number of foreign keys linking the two tables, in either direction.
    pub fn foreign_key_paths(&self, a: &str, b: &str) -> usize {
        let count = |from: &str, to: &str| {
            self.table(from).map_or(0, |table| {
                table
                    .foreign_keys()
                    .filter(|fk| {
                        fk.referenced_schema == self.namespace.name && fk.referenced_table == to
                    })
                    .count()
            })
        };
        if a == b { count(a, b) } else { count(a, b) + count(b, a) }
    }

    pub fn is_inherited_edge(&self, edge: &FkEdge) -> bool {
        self.inheritance.iter().any(|link| link.edge == *edge)
    }

    /// Selected tables in rendering order: snapshot order, except that a
    /// parent class is always emitted before its children.
    pub fn render_order(&self) -> Vec<&'a Table> {
        let mut emitted = BTreeSet::new();
        let mut order = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            self.push_with_parents(table, &mut emitted, &mut order);
        }
        order
    }

    fn push_with_parents(
        &self,
        table: &'a Table,
        emitted: &mut BTreeSet<String>,
        order: &mut Vec<&'a Table>,
    ) {
        if emitted.contains(&table.name) {
            return;
        }
        emitted.insert(table.name.clone());
        let parent = self
            .entity(&table.name)
            .and_then(|entity| entity.parent.as_deref())
            .and_then(|parent| self.table(parent));
        if let Some(parent) = parent {
            self.push_with_parents(parent, emitted, order);
        }
        order.push(table);
    }
}

/// Attributes the declarative base defines on every mapped class.
pub const RESERVED_ATTRIBUTES: &[&str] = &["metadata", "registry"];

/// Attribute name for a column on a mapped class. Names the declarative
/// base reserves get a trailing underscore.
pub fn column_attribute(column: &str) -> String {
    let attribute = sanitize_identifier(column);
    if RESERVED_ATTRIBUTES.contains(&attribute.as_str()) {
        format!("{attribute}_")
    } else {
        attribute
    }
}

fn select_namespace<'a>(
    schema: &'a DatabaseSchema,
    requested: Option<&str>,
) -> Result<&'a Schema, CodegenError> {
    match requested {
        Some(name) => schema
            .schema(name)
            .ok_or_else(|| CodegenError::UnknownSchema(name.to_string())),
        None => schema
            .schema("public")
            .or_else(|| schema.schemas.first())
            .ok_or_else(|| CodegenError::UnknownSchema("public".to_string())),
    }
}

fn check_foreign_keys(namespace: &Schema, table: &Table) -> Result<(), CodegenError> {
    let malformed = |detail: String| CodegenError::MalformedForeignKey {
        table: table.name.clone(),
        detail,
    };

    for fk in table.foreign_keys() {
        if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
            return Err(malformed(format!(
                "column count mismatch referencing {}",
                fk.referenced_table
            )));
        }
        if let Some(column) = fk.columns.iter().find(|column| table.column(column).is_none()) {
            return Err(malformed(format!("local column {column} not found")));
        }
        if fk.referenced_schema != namespace.name {
            continue;
        }
        let referenced = namespace
            .table(&fk.referenced_table)
            .ok_or_else(|| malformed(format!("referenced table {} not found", fk.referenced_table)))?;
        if let Some(column) = fk
            .referenced_columns
            .iter()
            .find(|column| referenced.column(column).is_none())
        {
            return Err(malformed(format!(
                "referenced column {}.{} not found",
                fk.referenced_table, column
            )));
        }
    }
    Ok(())
}

/// Module-level names the generated source may import or define. A class
/// named after one of them would shadow it.
const RESERVED_CLASS_NAMES: &[&str] = &[
    "ARRAY", "BIGINT", "Base", "BigInteger", "Boolean", "CHAR", "CIDR", "CheckConstraint",
    "Column", "Computed", "Date", "DateTime", "Enum", "Float", "ForeignKey",
    "ForeignKeyConstraint", "INET", "Index", "Integer", "Interval", "JSON", "JSONB",
    "LargeBinary", "MACADDR", "MONEY", "MetaData", "NullType", "Numeric", "RoleMixin",
    "SmallInteger", "String", "TSVECTOR", "Table", "Text", "Time", "UUID", "UniqueConstraint",
    "UserMixin",
];

fn unique_class_name(
    table: &str,
    inflector: &Inflector,
    taken: &BTreeSet<String>,
    reserved: &BTreeSet<String>,
) -> Result<String, CodegenError> {
    let free = |name: &String| !taken.contains(name) && !reserved.contains(name);
    let preferred = inflector.class_name(table);
    if free(&preferred) {
        return Ok(preferred);
    }
    let raw = sanitize_identifier(&table.to_upper_camel_case());
    if free(&raw) {
        return Ok(raw);
    }
    if reserved.contains(&raw) {
        let escaped = format!("{raw}_");
        if free(&escaped) {
            return Ok(escaped);
        }
    }
    Err(CodegenError::NamingCollision {
        entity: table.to_string(),
        name: preferred,
    })
}
