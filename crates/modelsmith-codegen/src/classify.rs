use std::collections::BTreeSet;
use std::fmt::Debug;

use modelsmith_core::Table;

/// Decides whether a table only exists to implement a many-to-many link.
///
/// The model builder additionally requires both referenced tables to be
/// mapped classes before a table is treated as an association.
pub trait AssociationRule: Debug + Send + Sync {
    fn is_association(&self, table: &Table) -> bool;
}

/// Exactly two foreign keys to other tables, every column belongs to one of
/// them, and the primary key (if any) is the union of their columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoForeignKeyRule;

impl AssociationRule for TwoForeignKeyRule {
    fn is_association(&self, table: &Table) -> bool {
        let fks: Vec<_> = table.foreign_keys().collect();
        if fks.len() != 2 || fks.iter().any(|fk| fk.referenced_table == table.name) {
            return false;
        }

        let fk_columns: BTreeSet<&str> = fks
            .iter()
            .flat_map(|fk| fk.columns.iter().map(String::as_str))
            .collect();
        if !table
            .columns
            .iter()
            .all(|column| fk_columns.contains(column.name.as_str()))
        {
            return false;
        }

        let pk = table.primary_key_columns();
        pk.is_empty()
            || (pk.len() == fk_columns.len()
                && pk.iter().all(|column| fk_columns.contains(column.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fk, pk, table};

    #[test]
    fn composite_key_of_two_foreign_keys_is_association() {
        let book_tag = table(
            "book_tag",
            &["book_id", "tag_id"],
            vec![
                pk(&["book_id", "tag_id"]),
                fk(&["book_id"], "book", &["id"]),
                fk(&["tag_id"], "tag", &["id"]),
            ],
        );
        assert!(TwoForeignKeyRule.is_association(&book_tag));
    }

    #[test]
    fn key_less_link_table_is_association() {
        let link = table(
            "book_tag",
            &["book_id", "tag_id"],
            vec![fk(&["book_id"], "book", &["id"]), fk(&["tag_id"], "tag", &["id"])],
        );
        assert!(TwoForeignKeyRule.is_association(&link));
    }

    #[test]
    fn extra_payload_column_disqualifies() {
        let enrollment = table(
            "enrollment",
            &["student_id", "course_id", "grade"],
            vec![
                pk(&["student_id", "course_id"]),
                fk(&["student_id"], "student", &["id"]),
                fk(&["course_id"], "course", &["id"]),
            ],
        );
        assert!(!TwoForeignKeyRule.is_association(&enrollment));
    }

    #[test]
    fn surrogate_key_disqualifies() {
        let link = table(
            "book_tag",
            &["id", "book_id", "tag_id"],
            vec![
                pk(&["id"]),
                fk(&["book_id"], "book", &["id"]),
                fk(&["tag_id"], "tag", &["id"]),
            ],
        );
        assert!(!TwoForeignKeyRule.is_association(&link));
    }

    #[test]
    fn both_keys_may_reference_the_same_table() {
        let friendship = table(
            "friendship",
            &["person_id", "friend_id"],
            vec![
                pk(&["person_id", "friend_id"]),
                fk(&["person_id"], "person", &["id"]),
                fk(&["friend_id"], "person", &["id"]),
            ],
        );
        assert!(TwoForeignKeyRule.is_association(&friendship));
    }
}
