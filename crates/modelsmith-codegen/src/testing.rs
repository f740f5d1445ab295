//! Snapshot fixtures shared by unit tests.

use std::collections::BTreeMap;

use modelsmith_core::{
    Column, ColumnType, Constraint, DatabaseSchema, FkAction, FkMatchType, ForeignKey, PrimaryKey,
    Schema, Table, TableKind, UniqueConstraint,
};

pub fn column(name: &str) -> Column {
    Column {
        ordinal_position: 1,
        name: name.to_string(),
        column_type: ColumnType {
            data_type: "integer".to_string(),
            udt_schema: "pg_catalog".to_string(),
            udt_name: "int4".to_string(),
            character_max_length: None,
            numeric_precision: Some(32),
            numeric_scale: Some(0),
            collation: None,
        },
        is_nullable: false,
        default: None,
        identity: None,
        generated: None,
        comment: None,
    }
}

pub fn table(name: &str, columns: &[&str], constraints: Vec<Constraint>) -> Table {
    Table {
        name: name.to_string(),
        kind: TableKind::Table,
        comment: None,
        columns: columns.iter().map(|name| column(name)).collect(),
        constraints,
        indexes: Vec::new(),
        dialect_hints: BTreeMap::new(),
    }
}

pub fn pk(columns: &[&str]) -> Constraint {
    Constraint::PrimaryKey(PrimaryKey {
        name: None,
        columns: columns.iter().map(|c| c.to_string()).collect(),
    })
}

pub fn fk(columns: &[&str], referenced_table: &str, referenced: &[&str]) -> Constraint {
    Constraint::ForeignKey(ForeignKey {
        name: None,
        columns: columns.iter().map(|c| c.to_string()).collect(),
        referenced_schema: "public".to_string(),
        referenced_table: referenced_table.to_string(),
        referenced_columns: referenced.iter().map(|c| c.to_string()).collect(),
        on_update: FkAction::NoAction,
        on_delete: FkAction::NoAction,
        match_type: FkMatchType::Simple,
        is_deferrable: false,
        initially_deferred: false,
    })
}

pub fn unique(columns: &[&str]) -> Constraint {
    Constraint::Unique(UniqueConstraint {
        name: None,
        columns: columns.iter().map(|c| c.to_string()).collect(),
        is_deferrable: false,
        initially_deferred: false,
    })
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
