#![allow(dead_code)]

use std::collections::BTreeMap;

use modelsmith_core::{
    Column, ColumnType, Constraint, DatabaseSchema, FkAction, FkMatchType, ForeignKey, Index,
    PrimaryKey, Schema, Table, TableKind, UniqueConstraint,
};

pub fn column(name: &str, data_type: &str, udt_name: &str, nullable: bool) -> Column {
    Column {
        ordinal_position: 1,
        name: name.to_string(),
        column_type: ColumnType {
            data_type: data_type.to_string(),
            udt_schema: "pg_catalog".to_string(),
            udt_name: udt_name.to_string(),
            character_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            collation: None,
        },
        is_nullable: nullable,
        default: None,
        identity: None,
        generated: None,
        comment: None,
    }
}

pub fn id(name: &str) -> Column {
    column(name, "integer", "int4", false)
}

pub fn table(name: &str, columns: Vec<Column>, constraints: Vec<Constraint>) -> Table {
    let columns = columns
        .into_iter()
        .enumerate()
        .map(|(position, mut column)| {
            column.ordinal_position = position as i16 + 1;
            column
        })
        .collect();
    Table {
        name: name.to_string(),
        kind: TableKind::Table,
        comment: None,
        columns,
        constraints,
        indexes: Vec::new(),
        dialect_hints: BTreeMap::new(),
    }
}

pub fn pk(columns: &[&str]) -> Constraint {
    Constraint::PrimaryKey(PrimaryKey {
        name: None,
        columns: strings(columns),
    })
}

pub fn fk(columns: &[&str], referenced_table: &str, referenced: &[&str]) -> Constraint {
    fk_with(columns, referenced_table, referenced, FkAction::NoAction)
}

pub fn fk_with(
    columns: &[&str],
    referenced_table: &str,
    referenced: &[&str],
    on_delete: FkAction,
) -> Constraint {
    Constraint::ForeignKey(ForeignKey {
        name: None,
        columns: strings(columns),
        referenced_schema: "public".to_string(),
        referenced_table: referenced_table.to_string(),
        referenced_columns: strings(referenced),
        on_update: FkAction::NoAction,
        on_delete,
        match_type: FkMatchType::Simple,
        is_deferrable: false,
        initially_deferred: false,
    })
}

pub fn unique(columns: &[&str]) -> Constraint {
    Constraint::Unique(UniqueConstraint {
        name: None,
        columns: strings(columns),
        is_deferrable: false,
        initially_deferred: false,
    })
}

pub fn index(name: &str, columns: &[&str], is_unique: bool) -> Index {
    Index {
        name: name.to_string(),
        columns: strings(columns),
        is_unique,
        is_primary: false,
        is_valid: true,
        method: "btree".to_string(),
        definition: format!("CREATE INDEX {name}"),
    }
}

pub fn snapshot(tables: Vec<Table>) -> DatabaseSchema {
    DatabaseSchema {
        schema_version: "0.1".to_string(),
        engine: "postgres".to_string(),
        database: Some("library".to_string()),
        schemas: vec![Schema {
            name: "public".to_string(),
            tables,
        }],
        enums: Vec::new(),
        schema_fingerprint: None,
    }
}

/// `author(id, name)` and `book(id, title, author_id -> author.id)`.
pub fn library() -> DatabaseSchema {
    let mut name = column("name", "character varying(100)", "varchar", false);
    name.column_type.character_max_length = Some(100);
    snapshot(vec![
        table("author", vec![id("id"), name], vec![pk(&["id"])]),
        table(
            "book",
            vec![
                id("id"),
                column("title", "text", "text", true),
                column("author_id", "integer", "int4", true),
            ],
            vec![
                pk(&["id"]),
                fk_with(&["author_id"], "author", &["id"], FkAction::Cascade),
            ],
        ),
    ])
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
