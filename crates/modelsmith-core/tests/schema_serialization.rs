use modelsmith_core::{Constraint, DatabaseSchema, Schema, TableKind, snapshot_json_schema};

#[test]
fn serializes_schema_deterministically() {
    let schema = DatabaseSchema {
        schema_version: "0.1".to_string(),
        engine: "postgres".to_string(),
        database: Some("db".to_string()),
        schemas: vec![Schema {
            name: "public".to_string(),
            tables: Vec::new(),
        }],
        enums: Vec::new(),
        schema_fingerprint: None,
    };

    let json = serde_json::to_string_pretty(&schema).expect("serialize schema");
    let expected = r#"{
  "schema_version": "0.1",
  "engine": "postgres",
  "database": "db",
  "schemas": [
    {
      "name": "public",
      "tables": []
    }
  ],
  "enums": [],
  "schema_fingerprint": null
}"#;
    assert_eq!(json, expected);
}

#[test]
fn loads_minimal_provider_snapshot() {
    let json = r#"{
      "schema_version": "0.1",
      "engine": "postgres",
      "database": null,
      "schemas": [{
        "name": "public",
        "tables": [{
          "name": "book",
          "kind": "table",
          "columns": [{
            "ordinal_position": 1,
            "name": "id",
            "column_type": {
              "data_type": "integer", "udt_schema": "pg_catalog", "udt_name": "int4",
              "character_max_length": null, "numeric_precision": 32,
              "numeric_scale": 0, "collation": null
            },
            "is_nullable": false
          }],
          "constraints": [{"kind": "primary_key", "name": "book_pkey", "columns": ["id"]}],
          "indexes": [{"name": "book_pkey", "columns": ["id"], "is_unique": true, "is_primary": true}],
          "dialect_hints": {"tablespace": "fast_ssd", "unknown": "ignored"}
        }]
      }]
    }"#;

    let schema: DatabaseSchema = serde_json::from_str(json).expect("parse snapshot");
    let table = schema
        .schema("public")
        .and_then(|schema| schema.table("book"))
        .expect("book table");
    assert_eq!(table.kind, TableKind::Table);
    assert_eq!(table.primary_key_columns(), ["id".to_string()]);
    assert!(matches!(table.constraints[0], Constraint::PrimaryKey(_)));
    assert!(table.indexes[0].is_valid);
    assert_eq!(table.dialect_hints.len(), 2);
}

#[test]
fn json_schema_describes_snapshot_contract() {
    let generated = snapshot_json_schema();
    let json = serde_json::to_value(&generated).expect("serialize generated schema");
    let properties = json["properties"].as_object().expect("object properties");
    assert!(properties.contains_key("schemas"));
    assert!(properties.contains_key("schema_version"));
}
