//! Schema snapshot contract consumed by modelsmith.
//!
//! A schema provider (catalog reader, migration tool, hand-written fixture)
//! produces a [`DatabaseSchema`]; the code generator treats it as an
//! immutable, fully resolved input and never re-queries the database.

pub mod constraints;
pub mod contract;
pub mod error;
pub mod schema;
pub mod types;
pub mod validation;

pub use constraints::{
    CheckConstraint, Constraint, FkAction, FkMatchType, ForeignKey, Index, PrimaryKey,
    UniqueConstraint,
};
pub use contract::snapshot_json_schema;
pub use error::{Error, Result};
pub use schema::{Column, DatabaseSchema, Schema, Table, TableKind};
pub use types::{ColumnType, EnumType, GeneratedExpression, GeneratedKind, IdentityGeneration};
pub use validation::validate_schema;

/// Current contract version for `schema.json` snapshots.
pub const SCHEMA_VERSION: &str = "0.1";
