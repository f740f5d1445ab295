use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{GenerationIssue, report};
use crate::model::ObjectModel;
use crate::options::GeneratorOptions;

/// Capabilities a mapped class can opt into through an extra base class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    LoginUser,
    LoginRole,
}

/// Rendering contract of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySpec {
    pub module: &'static str,
    pub mixin: &'static str,
    /// Column the mixin expects on the class.
    pub required_column: &'static str,
}

const CAPABILITIES: &[(Capability, CapabilitySpec)] = &[
    (
        Capability::LoginUser,
        CapabilitySpec {
            module: "flask_login",
            mixin: "UserMixin",
            required_column: "password",
        },
    ),
    (
        Capability::LoginRole,
        CapabilitySpec {
            module: "flask_security",
            mixin: "RoleMixin",
            required_column: "name",
        },
    ),
];

impl Capability {
    pub fn spec(self) -> CapabilitySpec {
        CAPABILITIES
            .iter()
            .find(|(capability, _)| *capability == self)
            .map(|(_, spec)| *spec)
            .unwrap_or(CAPABILITIES[0].1)
    }

    pub fn option_name(self) -> &'static str {
        match self {
            Capability::LoginUser => "login_user",
            Capability::LoginRole => "login_role",
        }
    }
}

/// Mark audited classes and attach capability mixins.
///
/// Names that do not resolve to a mapped class are reported and skipped.
pub fn annotate(
    model: &mut ObjectModel<'_>,
    options: &GeneratorOptions,
    issues: &mut Vec<GenerationIssue>,
) {
    for table in &options.audited {
        if !model.is_entity(table) {
            report(
                issues,
                GenerationIssue::new(
                    "unresolved_audit_target",
                    format!("audited table {table} has no mapped class"),
                    Some(table),
                ),
            );
        }
    }
    for entity in model.entities.values_mut() {
        entity.audited = options.audit_all || options.audited.contains(&entity.table);
    }

    let requested = [
        (Capability::LoginUser, options.login_user.as_deref()),
        (Capability::LoginRole, options.login_role.as_deref()),
    ];
    for (capability, table) in requested {
        let Some(table) = table else {
            continue;
        };
        let spec = capability.spec();

        let Some(entity) = model.entities.get_mut(table) else {
            report(
                issues,
                GenerationIssue::new(
                    "unresolved_mixin_target",
                    format!(
                        "{} names {table}, which has no mapped class; {} skipped",
                        capability.option_name(),
                        spec.mixin
                    ),
                    Some(table),
                ),
            );
            continue;
        };
        debug!(event = "capability_attached", table = %table, mixin = spec.mixin);
        entity.capabilities.push(capability);

        let has_column = model
            .table(table)
            .is_some_and(|table| table.column(spec.required_column).is_some());
        if !has_column {
            report(
                issues,
                GenerationIssue::new(
                    "missing_capability_column",
                    format!(
                        "{} on {table} expects a {} column",
                        spec.mixin, spec.required_column
                    ),
                    Some(table),
                ),
            );
        }
    }
}
