use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Fatal errors: a run that returns one of these produces no output at all.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Two forced relationships on one source table share an attribute name.
    #[error(
        "tried to create a forced relationship \"{name}\" within {table}, but another forced relationship exists in {table} with the same name"
    )]
    ConfigurationConflict { table: String, name: String },
    /// Two attributes of one generated class ended up with the same name.
    #[error("naming collision in {entity}: attribute \"{name}\" is declared more than once")]
    NamingCollision { entity: String, name: String },
    /// A foreign key points at a table or column the snapshot does not contain.
    #[error("malformed foreign key on {table}: {detail}")]
    MalformedForeignKey { table: String, detail: String },
    /// The requested namespace is not part of the snapshot.
    #[error("schema not found in snapshot: {0}")]
    UnknownSchema(String),
}

/// Recoverable condition reported next to otherwise complete output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl GenerationIssue {
    pub fn new(code: impl Into<String>, message: impl Into<String>, table: Option<&str>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            table: table.map(str::to_string),
        }
    }
}

/// Log a recoverable issue and keep it for the caller.
pub(crate) fn report(issues: &mut Vec<GenerationIssue>, issue: GenerationIssue) {
    warn!(
        event = "generation_issue",
        code = %issue.code,
        table = issue.table.as_deref().unwrap_or(""),
        "{}",
        issue.message
    );
    issues.push(issue);
}
