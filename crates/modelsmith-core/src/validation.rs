use std::collections::{BTreeMap, BTreeSet};

use crate::constraints::Constraint;
use crate::error::{Error, Result};
use crate::schema::DatabaseSchema;
use crate::SCHEMA_VERSION;

/// Validate internal consistency of a schema snapshot.
///
/// This checks:
/// - the snapshot contract version is one this crate understands
/// - duplicate schemas/tables/columns
/// - at most one primary key per table, and its columns exist
/// - foreign key arity, columns and referenced targets exist
/// - unique constraint and index columns exist
pub fn validate_schema(schema: &DatabaseSchema) -> Result<()> {
    if schema.schema_version != SCHEMA_VERSION {
        return Err(Error::Unsupported(format!(
            "schema_version {} (expected {SCHEMA_VERSION})",
            schema.schema_version
        )));
    }

    let mut catalog: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();

    for db_schema in &schema.schemas {
        if catalog.contains_key(&db_schema.name) {
            return Err(Error::InvalidSchema(format!(
                "duplicate schema name: {}",
                db_schema.name
            )));
        }

        let mut tables = BTreeMap::new();
        for table in &db_schema.tables {
            if tables.contains_key(&table.name) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate table name: {}.{}",
                    db_schema.name, table.name
                )));
            }

            let mut columns = BTreeSet::new();
            for column in &table.columns {
                if !columns.insert(column.name.clone()) {
                    return Err(Error::InvalidSchema(format!(
                        "duplicate column name: {}.{}.{}",
                        db_schema.name, table.name, column.name
                    )));
                }
            }

            tables.insert(table.name.clone(), columns);
        }

        catalog.insert(db_schema.name.clone(), tables);
    }

    for db_schema in &schema.schemas {
        for table in &db_schema.tables {
            let columns = catalog
                .get(&db_schema.name)
                .and_then(|tables| tables.get(&table.name))
                .ok_or_else(|| {
                    Error::InvalidSchema(format!(
                        "missing table in catalog: {}.{}",
                        db_schema.name, table.name
                    ))
                })?;
            let check_column = |column: &String, what: &str| -> Result<()> {
                if columns.contains(column) {
                    Ok(())
                } else {
                    Err(Error::InvalidSchema(format!(
                        "{what} column not found: {}.{}.{}",
                        db_schema.name, table.name, column
                    )))
                }
            };

            let primary_keys = table
                .constraints
                .iter()
                .filter(|constraint| matches!(constraint, Constraint::PrimaryKey(_)))
                .count();
            if primary_keys > 1 {
                return Err(Error::InvalidSchema(format!(
                    "multiple primary keys: {}.{}",
                    db_schema.name, table.name
                )));
            }

            for constraint in &table.constraints {
                match constraint {
                    Constraint::PrimaryKey(pk) => {
                        for column in &pk.columns {
                            check_column(column, "primary key")?;
                        }
                    }
                    Constraint::ForeignKey(fk) => {
                        if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len()
                        {
                            return Err(Error::InvalidSchema(format!(
                                "foreign key arity mismatch: {}.{} -> {}.{}",
                                db_schema.name, table.name, fk.referenced_schema, fk.referenced_table
                            )));
                        }
                        for column in &fk.columns {
                            check_column(column, "foreign key")?;
                        }

                        let ref_columns = catalog
                            .get(&fk.referenced_schema)
                            .and_then(|tables| tables.get(&fk.referenced_table))
                            .ok_or_else(|| {
                                Error::InvalidSchema(format!(
                                    "referenced table not found: {}.{}",
                                    fk.referenced_schema, fk.referenced_table
                                ))
                            })?;

                        for column in &fk.referenced_columns {
                            if !ref_columns.contains(column) {
                                return Err(Error::InvalidSchema(format!(
                                    "referenced column not found: {}.{}.{}",
                                    fk.referenced_schema, fk.referenced_table, column
                                )));
                            }
                        }
                    }
                    Constraint::Unique(unique) => {
                        for column in &unique.columns {
                            check_column(column, "unique")?;
                        }
                    }
                    Constraint::Check(_) => {}
                }
            }

            for index in &table.indexes {
                for column in &index.columns {
                    check_column(column, "index")?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::constraints::{FkAction, FkMatchType, ForeignKey, PrimaryKey};
    use crate::schema::{Column, Schema, Table, TableKind};
    use crate::types::ColumnType;

    fn column(name: &str) -> Column {
        Column {
            ordinal_position: 1,
            name: name.to_string(),
            column_type: ColumnType {
                data_type: "integer".to_string(),
                udt_schema: "pg_catalog".to_string(),
                udt_name: "int4".to_string(),
                character_max_length: None,
                numeric_precision: None,
                numeric_scale: None,
                collation: None,
            },
            is_nullable: false,
            default: None,
            identity: None,
            generated: None,
            comment: None,
        }
    }

    fn table(name: &str, columns: &[&str], constraints: Vec<Constraint>) -> Table {
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

    fn fk(columns: &[&str], table: &str, referenced: &[&str]) -> Constraint {
        Constraint::ForeignKey(ForeignKey {
            name: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referenced_schema: "public".to_string(),
            referenced_table: table.to_string(),
            referenced_columns: referenced.iter().map(|c| c.to_string()).collect(),
            on_update: FkAction::NoAction,
            on_delete: FkAction::NoAction,
            match_type: FkMatchType::Simple,
            is_deferrable: false,
            initially_deferred: false,
        })
    }

    fn snapshot(tables: Vec<Table>) -> DatabaseSchema {
        DatabaseSchema {
            schema_version: "0.1".to_string(),
            engine: "postgres".to_string(),
            database: None,
            schemas: vec![Schema {
                name: "public".to_string(),
                tables,
            }],
            enums: Vec::new(),
            schema_fingerprint: None,
        }
    }

    #[test]
    fn accepts_consistent_snapshot() {
        let schema = snapshot(vec![
            table(
                "author",
                &["id"],
                vec![Constraint::PrimaryKey(PrimaryKey {
                    name: None,
                    columns: vec!["id".to_string()],
                })],
            ),
            table("book", &["id", "author_id"], vec![fk(&["author_id"], "author", &["id"])]),
        ]);
        assert!(validate_schema(&schema).is_ok());
    }

    #[test]
    fn rejects_dangling_foreign_key() {
        let schema = snapshot(vec![table(
            "book",
            &["id", "author_id"],
            vec![fk(&["author_id"], "author", &["id"])],
        )]);
        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("referenced table not found"));
    }

    #[test]
    fn rejects_foreign_key_arity_mismatch() {
        let schema = snapshot(vec![
            table("author", &["id"], Vec::new()),
            table("book", &["id", "author_id"], vec![fk(&["author_id"], "author", &[])]),
        ]);
        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("arity mismatch"));
    }

    #[test]
    fn rejects_unknown_contract_version() {
        let mut schema = snapshot(Vec::new());
        schema.schema_version = "2.0".to_string();
        let err = validate_schema(&schema).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
