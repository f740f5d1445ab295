use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::schema::DatabaseSchema;

/// Emit the JSON Schema for `schema.json` snapshots.
pub fn snapshot_json_schema() -> RootSchema {
    schema_for!(DatabaseSchema)
}
