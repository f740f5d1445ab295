use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use modelsmith_core::{ColumnType, DatabaseSchema};

use crate::render::{Imports, py_repr};

const SQLALCHEMY: &str = "sqlalchemy";
const POSTGRESQL: &str = "sqlalchemy.dialects.postgresql";

/// Caller-supplied mapping of a catalog type to a Python type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    pub module: String,
    pub name: String,
    /// Constructor arguments rendered verbatim, e.g. `length=40`.
    #[serde(default)]
    pub args: Option<String>,
}

impl TypeMapping {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            args: None,
        }
    }
}

/// Catalog type resolution. Caller mappings win over the built-in table.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    custom: BTreeMap<String, TypeMapping>,
}

impl TypeMap {
    pub fn new(custom: BTreeMap<String, TypeMapping>) -> Self {
        Self { custom }
    }

    /// Render the type expression, registering its imports.
    ///
    /// Returns `None` for types nothing knows about.
    pub fn render(
        &self,
        column_type: &ColumnType,
        schema: &DatabaseSchema,
        imports: &mut Imports,
    ) -> Option<String> {
        if column_type.is_array() {
            let element = ColumnType {
                udt_name: column_type.element_udt_name().to_string(),
                data_type: column_type
                    .data_type
                    .trim_end_matches("[]")
                    .to_string(),
                ..column_type.clone()
            };
            let inner = self.render_scalar(&element, schema, imports)?;
            imports.add(POSTGRESQL, "ARRAY");
            return Some(format!("ARRAY({inner})"));
        }
        self.render_scalar(column_type, schema, imports)
    }

    fn render_scalar(
        &self,
        column_type: &ColumnType,
        schema: &DatabaseSchema,
        imports: &mut Imports,
    ) -> Option<String> {
        let base = base_type_name(&column_type.data_type);
        let custom = self
            .custom
            .get(&column_type.udt_name)
            .or_else(|| self.custom.get(&base));
        if let Some(mapping) = custom {
            imports.add(&mapping.module, &mapping.name);
            return Some(match &mapping.args {
                Some(args) => format!("{}({args})", mapping.name),
                None => mapping.name.clone(),
            });
        }

        if let Some(enum_type) = schema.enum_type(&column_type.udt_schema, &column_type.udt_name) {
            imports.add(SQLALCHEMY, "Enum");
            let mut args: Vec<String> = enum_type.labels.iter().map(|label| py_repr(label)).collect();
            args.push(format!("name={}", py_repr(&enum_type.name)));
            return Some(format!("Enum({})", args.join(", ")));
        }

        let canonical = canonical_name(&column_type.udt_name)
            .or_else(|| canonical_name(&base))?;
        let length = column_type.character_max_length;
        let (module, name, rendered) = match canonical {
            "int2" => (SQLALCHEMY, "SmallInteger", None),
            "int4" => (SQLALCHEMY, "Integer", None),
            "int8" => (SQLALCHEMY, "BigInteger", None),
            "varchar" => (SQLALCHEMY, "String", length.map(|n| format!("String({n})"))),
            "bpchar" => (SQLALCHEMY, "CHAR", length.map(|n| format!("CHAR({n})"))),
            "text" => (SQLALCHEMY, "Text", None),
            "bool" => (SQLALCHEMY, "Boolean", None),
            "float4" => (SQLALCHEMY, "Float", None),
            "float8" => (SQLALCHEMY, "Float", Some("Float(53)".to_string())),
            "numeric" => (
                SQLALCHEMY,
                "Numeric",
                match (column_type.numeric_precision, column_type.numeric_scale) {
                    (Some(precision), Some(scale)) => Some(format!("Numeric({precision}, {scale})")),
                    (Some(precision), None) => Some(format!("Numeric({precision})")),
                    _ => None,
                },
            ),
            "date" => (SQLALCHEMY, "Date", None),
            "time" => (SQLALCHEMY, "Time", None),
            "timetz" => (SQLALCHEMY, "Time", Some("Time(True)".to_string())),
            "timestamp" => (SQLALCHEMY, "DateTime", None),
            "timestamptz" => (SQLALCHEMY, "DateTime", Some("DateTime(True)".to_string())),
            "interval" => (SQLALCHEMY, "Interval", None),
            "bytea" => (SQLALCHEMY, "LargeBinary", None),
            "json" => (SQLALCHEMY, "JSON", None),
            "jsonb" => (POSTGRESQL, "JSONB", None),
            "uuid" => (POSTGRESQL, "UUID", None),
            "inet" => (POSTGRESQL, "INET", None),
            "cidr" => (POSTGRESQL, "CIDR", None),
            "macaddr" => (POSTGRESQL, "MACADDR", None),
            "money" => (POSTGRESQL, "MONEY", None),
            "tsvector" => (POSTGRESQL, "TSVECTOR", None),
            _ => return None,
        };
        imports.add(module, name);
        Some(rendered.unwrap_or_else(|| name.to_string()))
    }
}

/// `character varying(255)` -> `character varying`.
fn base_type_name(data_type: &str) -> String {
    data_type
        .split('(')
        .next()
        .unwrap_or(data_type)
        .trim()
        .to_lowercase()
}

/// Catalog spellings folded onto the internal type names.
fn canonical_name(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "int2" | "smallint" | "tinyint" => "int2",
        "int4" | "int" | "integer" | "serial" | "mediumint" => "int4",
        "int8" | "bigint" | "bigserial" => "int8",
        "varchar" | "character varying" | "nvarchar" => "varchar",
        "bpchar" | "char" | "character" | "nchar" => "bpchar",
        "text" | "longtext" | "mediumtext" | "clob" => "text",
        "bool" | "boolean" => "bool",
        "float4" | "real" => "float4",
        "float8" | "double precision" | "double" | "float" => "float8",
        "numeric" | "decimal" => "numeric",
        "date" => "date",
        "time" | "time without time zone" => "time",
        "timetz" | "time with time zone" => "timetz",
        "timestamp" | "timestamp without time zone" | "datetime" => "timestamp",
        "timestamptz" | "timestamp with time zone" => "timestamptz",
        "interval" => "interval",
        "bytea" | "blob" | "longblob" | "varbinary" | "binary" => "bytea",
        "json" => "json",
        "jsonb" => "jsonb",
        "uuid" => "uuid",
        "inet" => "inet",
        "cidr" => "cidr",
        "macaddr" => "macaddr",
        "money" => "money",
        "tsvector" => "tsvector",
        _ => return None,
    };
    Some(canonical)
}
