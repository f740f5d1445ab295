use tracing::debug;

use crate::errors::{GenerationIssue, report};
use crate::model::{FkEdge, InheritanceLink, ObjectModel};

/// Link subclass tables to their parents (joined-table inheritance).
///
/// A mapped table C inherits from a mapped table P when one foreign key of C
/// covers exactly C's primary key and references exactly P's primary key.
/// The first qualifying foreign key wins; links that would close a cycle are
/// skipped and reported.
pub fn detect_inheritance(model: &mut ObjectModel<'_>, issues: &mut Vec<GenerationIssue>) {
    let mut links = Vec::new();

    for table in &model.tables {
        if !model.is_entity(&table.name) {
            continue;
        }
        let pk = table.primary_key_columns();

        let parent = table.foreign_keys().find_map(|fk| {
            if fk.referenced_schema != model.namespace.name
                || fk.referenced_table == table.name
                || !model.is_entity(&fk.referenced_table)
                || !fk.covers_exactly(pk)
            {
                return None;
            }
            let parent = model.table(&fk.referenced_table)?;
            let parent_pk = parent.primary_key_columns();
            let references_parent_pk = parent_pk.len() == pk.len()
                && fk
                    .referenced_columns
                    .iter()
                    .all(|column| parent_pk.contains(column));
            references_parent_pk.then(|| FkEdge::from_foreign_key(&table.name, fk))
        });

        let Some(edge) = parent else {
            continue;
        };

        if closes_cycle(&links, &table.name, &edge.referenced_table) {
            report(
                issues,
                GenerationIssue::new(
                    "inheritance_cycle",
                    format!(
                        "{} would inherit from {} through a cycle; keeping a plain relationship",
                        table.name, edge.referenced_table
                    ),
                    Some(&table.name),
                ),
            );
            continue;
        }

        debug!(event = "inheritance_detected", child = %table.name, parent = %edge.referenced_table);
        links.push(InheritanceLink {
            child: table.name.clone(),
            parent: edge.referenced_table.clone(),
            edge,
        });
    }

    for link in &links {
        if let Some(entity) = model.entities.get_mut(&link.child) {
            entity.parent = Some(link.parent.clone());
        }
    }
    model.inheritance = links;
}

fn closes_cycle(links: &[InheritanceLink], child: &str, parent: &str) -> bool {
    let mut current = parent;
    loop {
        if current == child {
            return true;
        }
        match links.iter().find(|link| link.child == current) {
            Some(link) => current = &link.parent,
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TwoForeignKeyRule;
    use crate::inflect::Inflector;
    use crate::options::GeneratorOptions;
    use crate::testing::{fk, pk, snapshot, table};

    #[test]
    fn shared_primary_key_becomes_inheritance() {
        let schema = snapshot(vec![
            table("person", &["id", "name"], vec![pk(&["id"])]),
            table(
                "employee",
                &["id", "salary"],
                vec![pk(&["id"]), fk(&["id"], "person", &["id"])],
            ),
        ]);
        let options = GeneratorOptions::default();
        let mut model =
            ObjectModel::build(&schema, &options, &TwoForeignKeyRule, &Inflector::new(true))
                .expect("model");
        let mut issues = Vec::new();
        detect_inheritance(&mut model, &mut issues);

        assert!(issues.is_empty());
        assert_eq!(model.inheritance.len(), 1);
        assert_eq!(model.entities["employee"].parent.as_deref(), Some("person"));
        assert!(model.entities["person"].parent.is_none());
    }

    #[test]
    fn foreign_key_outside_primary_key_is_not_inheritance() {
        let schema = snapshot(vec![
            table("person", &["id"], vec![pk(&["id"])]),
            table(
                "employee",
                &["id", "person_id"],
                vec![pk(&["id"]), fk(&["person_id"], "person", &["id"])],
            ),
        ]);
        let options = GeneratorOptions::default();
        let mut model =
            ObjectModel::build(&schema, &options, &TwoForeignKeyRule, &Inflector::new(true))
                .expect("model");
        let mut issues = Vec::new();
        detect_inheritance(&mut model, &mut issues);
        assert!(model.inheritance.is_empty());
    }

    #[test]
    fn mutual_primary_key_references_do_not_loop() {
        let schema = snapshot(vec![
            table("a", &["id"], vec![pk(&["id"]), fk(&["id"], "b", &["id"])]),
            table("b", &["id"], vec![pk(&["id"]), fk(&["id"], "a", &["id"])]),
        ]);
        let options = GeneratorOptions::default();
        let mut model =
            ObjectModel::build(&schema, &options, &TwoForeignKeyRule, &Inflector::new(true))
                .expect("model");
        let mut issues = Vec::new();
        detect_inheritance(&mut model, &mut issues);

        assert_eq!(model.inheritance.len(), 1);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "inheritance_cycle");
        let order: Vec<&str> = model
            .render_order()
            .iter()
            .map(|table| table.name.as_str())
            .collect();
        assert_eq!(order, ["b", "a"]);
    }
}
