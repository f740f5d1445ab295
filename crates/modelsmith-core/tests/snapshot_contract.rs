use std::fs;
use std::path::Path;

use jsonschema::JSONSchema;
use modelsmith_core::{DatabaseSchema, snapshot_json_schema, validate_schema};

#[test]
fn demo_snapshot_satisfies_contract() {
    let contract =
        serde_json::to_value(snapshot_json_schema()).expect("serialize generated schema");
    let compiled = JSONSchema::compile(&contract).expect("compile contract");

    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/library.schema.json");
    let raw = fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("missing snapshot at {}", path.display()));
    let instance: serde_json::Value = serde_json::from_str(&raw).expect("parse snapshot");

    if let Err(errors) = compiled.validate(&instance) {
        let messages: Vec<String> = errors.map(|error| error.to_string()).collect();
        panic!("snapshot violates contract: {messages:?}");
    }

    let schema: DatabaseSchema = serde_json::from_value(instance).expect("decode snapshot");
    validate_schema(&schema).expect("consistent snapshot");
}

#[test]
fn contract_rejects_unknown_constraint_kind() {
    let contract =
        serde_json::to_value(snapshot_json_schema()).expect("serialize generated schema");
    let compiled = JSONSchema::compile(&contract).expect("compile contract");

    let instance = serde_json::json!({
        "schema_version": "0.1",
        "engine": "postgres",
        "database": null,
        "schemas": [{
            "name": "public",
            "tables": [{
                "name": "t",
                "kind": "table",
                "columns": [],
                "constraints": [{ "kind": "exclusion", "columns": ["id"] }]
            }]
        }]
    });
    assert!(!compiled.is_valid(&instance));
}
