use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::errors::{CodegenError, GenerationIssue, report};
use crate::model::{Cardinality, ObjectModel, Relationship, RelationshipOrigin};
use crate::options::{BackrefOptions, ForcedRelationship};

/// Forced relationships grouped by source table, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RelationshipOverrides {
    by_source: BTreeMap<String, Vec<ForcedRelationship>>,
}

impl RelationshipOverrides {
    /// Group the entries, rejecting any (source table, name) declared twice.
    pub fn from_entries(
        entries: impl IntoIterator<Item = ForcedRelationship>,
    ) -> Result<Self, CodegenError> {
        let mut seen = BTreeSet::new();
        let mut by_source: BTreeMap<String, Vec<ForcedRelationship>> = BTreeMap::new();

        for entry in entries {
            if !seen.insert((entry.source.clone(), entry.name.clone())) {
                return Err(CodegenError::ConfigurationConflict {
                    table: entry.source,
                    name: entry.name,
                });
            }
            by_source.entry(entry.source.clone()).or_default().push(entry);
        }

        Ok(Self { by_source })
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    pub fn for_source(&self, table: &str) -> &[ForcedRelationship] {
        self.by_source.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn covers(&self, source: &str, target: &str) -> bool {
        self.for_source(source)
            .iter()
            .any(|forced| forced.target == target)
    }

    /// Apply the overrides to an inferred model.
    ///
    /// A forced relationship replaces the inferred one with the same name on
    /// the same class, or is appended. Entries naming tables without a mapped
    /// class are skipped and reported.
    pub fn apply(
        &self,
        model: &mut ObjectModel<'_>,
        backrefs: &BackrefOptions,
        issues: &mut Vec<GenerationIssue>,
    ) {
        for (source, entries) in &self.by_source {
            for forced in entries {
                if !model.is_entity(source) || !model.is_entity(&forced.target) {
                    report(
                        issues,
                        GenerationIssue::new(
                            "unresolved_forced_relationship",
                            format!(
                                "forced relationship \"{}\" from {} to {} skipped: both tables must be mapped classes",
                                forced.name, source, forced.target
                            ),
                            Some(source),
                        ),
                    );
                    continue;
                }

                let rel = Relationship {
                    source: source.clone(),
                    target: forced.target.clone(),
                    name: forced.name.clone(),
                    cardinality: forced_cardinality(model, source, &forced.target),
                    origin: RelationshipOrigin::Forced,
                    edge: None,
                    association: None,
                    back_populates: None,
                    explicit_join: false,
                    options: forced.options.clone(),
                };

                let Some(entity) = model.entities.get_mut(source) else {
                    continue;
                };
                match entity
                    .relationships
                    .iter_mut()
                    .find(|existing| existing.name == rel.name)
                {
                    Some(existing) => {
                        debug!(event = "relationship_forced", table = %source, name = %rel.name, replaced = true);
                        *existing = rel;
                    }
                    None => {
                        debug!(event = "relationship_forced", table = %source, name = %rel.name, replaced = false);
                        entity.relationships.push(rel);
                    }
                }
            }
        }

        if backrefs.suppress_when_forced {
            for entity in model.entities.values_mut() {
                entity.relationships.retain(|rel| {
                    let covered = rel.origin == RelationshipOrigin::Inferred
                        && !rel.cardinality.is_forward()
                        && rel.cardinality != Cardinality::ManyToMany
                        && self.covers(&rel.target, &rel.source);
                    if covered {
                        debug!(event = "backref_suppressed", table = %rel.source, name = %rel.name);
                    }
                    !covered
                });
            }
        }

        unlink_orphaned_back_populates(model);
    }
}

/// A forced relationship follows whatever foreign key path links the two
/// tables; without one it is treated as a collection.
fn forced_cardinality(model: &ObjectModel<'_>, source: &str, target: &str) -> Cardinality {
    let references = |from: &str, to: &str| {
        model.table(from).is_some_and(|table| {
            table
                .foreign_keys()
                .any(|fk| fk.referenced_schema == model.namespace.name && fk.referenced_table == to)
        })
    };
    let linked_by_association = model.association_tables.iter().any(|name| {
        model.table(name).is_some_and(|table| {
            let targets: BTreeSet<&str> = table
                .foreign_keys()
                .map(|fk| fk.referenced_table.as_str())
                .collect();
            targets.contains(source) && targets.contains(target)
        })
    });

    if references(source, target) {
        Cardinality::ManyToOne
    } else if references(target, source) {
        Cardinality::OneToMany
    } else if linked_by_association {
        Cardinality::ManyToMany
    } else {
        Cardinality::OneToMany
    }
}

/// Keep `back_populates` only where the opposite side still points back.
fn unlink_orphaned_back_populates(model: &mut ObjectModel<'_>) {
    let mut valid: BTreeSet<(String, String)> = BTreeSet::new();
    for entity in model.entities.values() {
        for rel in &entity.relationships {
            let Some(back) = rel.back_populates.as_deref() else {
                continue;
            };
            let reciprocal = model
                .entity(&rel.target)
                .and_then(|target| target.relationship(back))
                .is_some_and(|other| {
                    other.origin == RelationshipOrigin::Inferred
                        && other.target == rel.source
                        && other.back_populates.as_deref() == Some(rel.name.as_str())
                });
            if reciprocal {
                valid.insert((rel.source.clone(), rel.name.clone()));
            }
        }
    }

    for entity in model.entities.values_mut() {
        for rel in &mut entity.relationships {
            if rel.back_populates.is_some()
                && !valid.contains(&(rel.source.clone(), rel.name.clone()))
            {
                rel.back_populates = None;
            }
        }
    }
}
