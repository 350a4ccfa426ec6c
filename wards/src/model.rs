//! Policy records and the per-family rules they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PolicyError;
use crate::ids::{OrganizationId, PolicyId};

/// Category of configurable behavior that shares the hierarchical
/// assignment shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyFamily {
    ChangePolicy,
    WorkCategorySet,
    VacationPolicy,
    WorkSchedule,
    HolidayPreset,
    SurchargeModel,
}

impl fmt::Display for PolicyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyFamily::ChangePolicy => "changePolicy",
            PolicyFamily::WorkCategorySet => "workCategorySet",
            PolicyFamily::VacationPolicy => "vacationPolicy",
            PolicyFamily::WorkSchedule => "workSchedule",
            PolicyFamily::HolidayPreset => "holidayPreset",
            PolicyFamily::SurchargeModel => "surchargeModel",
        };
        f.write_str(name)
    }
}

/// Family-specific configuration stored on a [`Policy`].
///
/// `Input` is the raw, unvalidated shape an admin submits; `Patch` is the
/// partial-update shape. Both are checked before anything is written.
pub trait PolicyRules: Clone + fmt::Debug + Send + Sync + 'static {
    const FAMILY: PolicyFamily;
    type Input;
    type Patch;

    fn from_input(input: Self::Input) -> Result<Self, PolicyError>;

    /// Returns the rules with `patch` applied, leaving `self` untouched.
    fn patched(&self, patch: Self::Patch) -> Result<Self, PolicyError>;
}

pub(crate) fn active() -> bool {
    true
}

/// A named configuration owned by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy<R> {
    pub id: PolicyId,
    pub organization_id: OrganizationId,
    pub name: String,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub rules: R,
}

impl<R: PolicyRules> Policy<R> {
    pub fn family(&self) -> PolicyFamily {
        R::FAMILY
    }
}

/// Admin input for creating a policy of any family.
#[derive(Debug, Clone)]
pub struct NewPolicy<I> {
    pub name: String,
    pub rules: I,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct PolicyPatch<P> {
    pub name: Option<String>,
    pub rules: P,
}

/// Trims and checks a policy name.
pub fn validate_name(name: &str) -> Result<String, PolicyError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PolicyError::validation("name must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Edit-window rules for time entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePolicyRules {
    pub self_service_days: u32,
    pub approval_days: u32,
    #[serde(default)]
    pub no_approval_required: bool,
    #[serde(default)]
    pub notify_all_managers: bool,
}

pub type ChangePolicy = Policy<ChangePolicyRules>;

/// Day counts are signed here so that negative input reaches validation
/// instead of failing to deserialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePolicyInput {
    pub self_service_days: i64,
    pub approval_days: i64,
    #[serde(default)]
    pub no_approval_required: bool,
    #[serde(default)]
    pub notify_all_managers: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePolicyPatch {
    pub self_service_days: Option<i64>,
    pub approval_days: Option<i64>,
    pub no_approval_required: Option<bool>,
    pub notify_all_managers: Option<bool>,
}

fn day_count(field: &str, value: i64) -> Result<u32, PolicyError> {
    u32::try_from(value).map_err(|_| {
        PolicyError::validation(format!(
            "{field} must be a non-negative number of days, got {value}"
        ))
    })
}

impl PolicyRules for ChangePolicyRules {
    const FAMILY: PolicyFamily = PolicyFamily::ChangePolicy;
    type Input = ChangePolicyInput;
    type Patch = ChangePolicyPatch;

    fn from_input(input: ChangePolicyInput) -> Result<Self, PolicyError> {
        Ok(Self {
            self_service_days: day_count("selfServiceDays", input.self_service_days)?,
            approval_days: day_count("approvalDays", input.approval_days)?,
            no_approval_required: input.no_approval_required,
            notify_all_managers: input.notify_all_managers,
        })
    }

    fn patched(&self, patch: ChangePolicyPatch) -> Result<Self, PolicyError> {
        let mut next = *self;
        if let Some(days) = patch.self_service_days {
            next.self_service_days = day_count("selfServiceDays", days)?;
        }
        if let Some(days) = patch.approval_days {
            next.approval_days = day_count("approvalDays", days)?;
        }
        if let Some(flag) = patch.no_approval_required {
            next.no_approval_required = flag;
        }
        if let Some(flag) = patch.notify_all_managers {
            next.notify_all_managers = flag;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_days_are_rejected() {
        let err = ChangePolicyRules::from_input(ChangePolicyInput {
            self_service_days: -1,
            approval_days: 3,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, PolicyError::Validation { .. }));
        assert!(err.to_string().contains("selfServiceDays"));
    }

    #[test]
    fn patch_keeps_absent_fields() {
        let rules = ChangePolicyRules {
            self_service_days: 3,
            approval_days: 4,
            no_approval_required: false,
            notify_all_managers: true,
        };
        let next = rules
            .patched(ChangePolicyPatch {
                approval_days: Some(10),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(next.self_service_days, 3);
        assert_eq!(next.approval_days, 10);
        assert!(next.notify_all_managers);

        assert!(rules
            .patched(ChangePolicyPatch {
                self_service_days: Some(-5),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(validate_name("  Strict  ").unwrap(), "Strict");
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn policy_rules_flatten_into_the_record() {
        let yaml = serde_json::json!({
            "id": "pol-1",
            "organizationId": "org-1",
            "name": "Default",
            "selfServiceDays": 2,
            "approvalDays": 5
        });
        let policy: ChangePolicy = serde_json::from_value(yaml).unwrap();
        assert!(policy.is_active);
        assert_eq!(policy.rules.approval_days, 5);
        assert_eq!(policy.family(), PolicyFamily::ChangePolicy);
    }
}
