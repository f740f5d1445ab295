//! SQLAlchemy declarative model generation for ModelSmith.
//!
//! This crate consumes a `schema.json` snapshot and produces the source of a
//! Python module with one mapped class per entity table, `Table` declarations
//! for everything else, and the relationships inferred from foreign keys.
//!
//! The pipeline runs in fixed order: build the [`ObjectModel`], detect
//! joined-table inheritance, infer relationships, apply forced overrides,
//! annotate audit flags and capabilities, then render.

pub mod annotate;
pub mod classify;
pub mod engine;
pub mod errors;
pub mod inflect;
pub mod inheritance;
pub mod model;
pub mod options;
pub mod overrides;
pub mod relationships;
pub mod render;
pub mod typemap;

#[cfg(test)]
mod testing;

pub use annotate::{Capability, CapabilitySpec};
pub use classify::{AssociationRule, TwoForeignKeyRule};
pub use engine::{CodeGenerator, GeneratedModule};
pub use errors::{CodegenError, GenerationIssue};
pub use inflect::Inflector;
pub use model::{Cardinality, Entity, ObjectModel, Relationship, RelationshipOrigin};
pub use options::{BackrefOptions, EdgeRef, ForcedRelationship, GeneratorOptions};
pub use overrides::RelationshipOverrides;
pub use typemap::{TypeMap, TypeMapping};
