//! Relationship inference over the foreign key graph of mapped tables.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::inflect::{Inflector, sanitize_identifier, strip_id_suffix};
use crate::model::{
    Association, Cardinality, FkEdge, ObjectModel, RESERVED_ATTRIBUTES, Relationship,
    RelationshipOrigin,
};
use crate::options::BackrefOptions;

struct Draft {
    rel: Relationship,
    /// Index of the opposite side of the same link.
    pair: Option<usize>,
    /// Appended to the name when it collides.
    suffix: String,
}

/// Infer relationships for every entity of the model.
///
/// Association tables yield a many-to-many pair; every other foreign key
/// between two entities yields a many-to-one attribute on the referencing
/// class and, unless disabled, a one-to-many (or one-to-one) back-reference
/// on the referenced class. Edges absorbed by inheritance yield nothing.
pub fn infer_relationships(
    model: &mut ObjectModel<'_>,
    inflector: &Inflector,
    backrefs: &BackrefOptions,
) {
    let mut drafts = Vec::new();
    infer_many_to_many(model, inflector, &mut drafts);
    infer_foreign_keys(model, inflector, backrefs, &mut drafts);
    resolve_collisions(model, &mut drafts);

    let names: Vec<String> = drafts.iter().map(|draft| draft.rel.name.clone()).collect();
    for draft in drafts {
        let mut rel = draft.rel;
        rel.back_populates = draft.pair.map(|pair| names[pair].clone());
        if let Some(entity) = model.entities.get_mut(&rel.source) {
            entity.relationships.push(rel);
        }
    }
}

fn infer_many_to_many(model: &ObjectModel<'_>, inflector: &Inflector, drafts: &mut Vec<Draft>) {
    for table in &model.tables {
        if !model.association_tables.contains(&table.name) {
            continue;
        }
        let edges: Vec<FkEdge> = table
            .foreign_keys()
            .map(|fk| FkEdge::from_foreign_key(&table.name, fk))
            .collect();
        let [first, second] = edges.as_slice() else {
            continue;
        };

        let self_referential = first.referenced_table == second.referenced_table;
        let (first_name, second_name) = if self_referential {
            (
                inflector.plural_attribute(strip_id_suffix(&second.columns.join("_"))),
                inflector.plural_attribute(strip_id_suffix(&first.columns.join("_"))),
            )
        } else {
            (
                inflector.plural_attribute(&second.referenced_table),
                inflector.plural_attribute(&first.referenced_table),
            )
        };

        let side = |source: &FkEdge, target: &FkEdge, name: String| Draft {
            rel: Relationship {
                source: source.referenced_table.clone(),
                target: target.referenced_table.clone(),
                name,
                cardinality: Cardinality::ManyToMany,
                origin: RelationshipOrigin::Inferred,
                edge: None,
                association: Some(Association {
                    table: table.name.clone(),
                    source_edge: source.clone(),
                    target_edge: target.clone(),
                }),
                back_populates: None,
                explicit_join: self_referential,
                options: BTreeMap::new(),
            },
            pair: None,
            suffix: target.columns.join("_"),
        };

        debug!(
            event = "many_to_many_inferred",
            association = %table.name,
            left = %first.referenced_table,
            right = %second.referenced_table
        );
        push_pair(
            drafts,
            side(first, second, first_name),
            Some(side(second, first, second_name)),
        );
    }
}

fn infer_foreign_keys(
    model: &ObjectModel<'_>,
    inflector: &Inflector,
    backrefs: &BackrefOptions,
    drafts: &mut Vec<Draft>,
) {
    for table in &model.tables {
        if !model.is_entity(&table.name) {
            continue;
        }

        let edges: Vec<FkEdge> = table
            .foreign_keys()
            .filter(|fk| {
                fk.referenced_schema == model.namespace.name
                    && model.is_entity(&fk.referenced_table)
            })
            .map(|fk| FkEdge::from_foreign_key(&table.name, fk))
            .collect();

        // Absorbed inheritance edges still count toward parallel keys.
        for edge in edges.iter().filter(|edge| !model.is_inherited_edge(edge)) {
            let parallel = edges
                .iter()
                .filter(|other| other.referenced_table == edge.referenced_table)
                .count();
            let explicit_join = model.foreign_key_paths(&table.name, &edge.referenced_table) > 1;
            let unique = table.is_unique_column_set(&edge.columns);
            let suffix = edge.columns.join("_");

            let forward_name = forward_name(inflector, edge, parallel);
            let forward = Draft {
                rel: Relationship {
                    source: table.name.clone(),
                    target: edge.referenced_table.clone(),
                    name: forward_name.clone(),
                    cardinality: if unique {
                        Cardinality::ManyToOneUnique
                    } else {
                        Cardinality::ManyToOne
                    },
                    origin: RelationshipOrigin::Inferred,
                    edge: Some(edge.clone()),
                    association: None,
                    back_populates: None,
                    explicit_join,
                    options: BTreeMap::new(),
                },
                pair: None,
                suffix: suffix.clone(),
            };

            let backref = (!backrefs.is_disabled(&table.name, &edge.columns)).then(|| Draft {
                rel: Relationship {
                    source: edge.referenced_table.clone(),
                    target: table.name.clone(),
                    name: backref_name(inflector, edge, parallel, &forward_name),
                    cardinality: if unique {
                        Cardinality::OneToOne
                    } else {
                        Cardinality::OneToMany
                    },
                    origin: RelationshipOrigin::Inferred,
                    edge: Some(edge.clone()),
                    association: None,
                    back_populates: None,
                    explicit_join,
                    options: BTreeMap::new(),
                },
                pair: None,
                suffix,
            });

            debug!(
                event = "foreign_key_inferred",
                table = %table.name,
                target = %edge.referenced_table,
                name = %forward_name,
                backref = backref.is_some()
            );
            push_pair(drafts, forward, backref);
        }
    }
}

fn push_pair(drafts: &mut Vec<Draft>, mut first: Draft, second: Option<Draft>) {
    let index = drafts.len();
    match second {
        Some(mut second) => {
            first.pair = Some(index + 1);
            second.pair = Some(index);
            drafts.push(first);
            drafts.push(second);
        }
        None => drafts.push(first),
    }
}

/// `book.author_id -> author` is `author`; several keys to one table are
/// named after their columns; a lone self reference is `parent`.
fn forward_name(inflector: &Inflector, edge: &FkEdge, parallel: usize) -> String {
    let column = edge.columns.join("_");
    let stripped = strip_id_suffix(&column);

    if parallel == 1 {
        return if edge.is_self_referential() {
            "parent".to_string()
        } else {
            inflector.singular_attribute(&edge.referenced_table)
        };
    }

    if stripped != column {
        inflector.singular_attribute(stripped)
    } else if edge.is_self_referential() {
        format!("parent_{}", sanitize_identifier(&column))
    } else {
        format!(
            "{}_{}",
            inflector.singular_attribute(&edge.referenced_table),
            sanitize_identifier(&column)
        )
    }
}

fn backref_name(inflector: &Inflector, edge: &FkEdge, parallel: usize, forward: &str) -> String {
    if parallel == 1 {
        if edge.is_self_referential() {
            "children".to_string()
        } else {
            inflector.plural_attribute(&edge.table)
        }
    } else {
        format!("{forward}_{}", inflector.plural_attribute(&edge.table))
    }
}

/// Suffix colliding names with their referencing columns. Names that still
/// collide are left for the renderer to reject.
fn resolve_collisions(model: &ObjectModel<'_>, drafts: &mut [Draft]) {
    let mut taken: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for draft in drafts.iter_mut() {
        let source = draft.rel.source.clone();
        let names = taken.entry(source.clone()).or_insert_with(|| {
            let mut names = model
                .table(&source)
                .map(|table| model.column_attributes(table))
                .unwrap_or_default();
            names.extend(RESERVED_ATTRIBUTES.iter().map(|name| name.to_string()));
            names
        });

        if names.contains(&draft.rel.name) {
            let candidate = format!("{}_{}", draft.rel.name, sanitize_identifier(&draft.suffix));
            if !names.contains(&candidate) {
                debug!(
                    event = "relationship_renamed",
                    table = %source,
                    from = %draft.rel.name,
                    to = %candidate
                );
                draft.rel.name = candidate;
            }
        }
        names.insert(draft.rel.name.clone());
    }
}
