//! Bindings of a policy to an organization, team or employee scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PolicyError;
use crate::ids::{AssignmentId, EmployeeId, OrganizationId, PolicyId, TeamId};
use crate::model::active;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Organization,
    Team,
    Employee,
}

impl ScopeType {
    /// Specificity rank; a more specific scope always outranks a broader one.
    pub fn priority(self) -> u8 {
        match self {
            ScopeType::Organization => 0,
            ScopeType::Team => 1,
            ScopeType::Employee => 2,
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeType::Organization => "organization",
            ScopeType::Team => "team",
            ScopeType::Employee => "employee",
        })
    }
}

/// Where an assignment applies. The organization scope carries no id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ScopeRecord", into = "ScopeRecord")]
pub enum Scope {
    Organization,
    Team(TeamId),
    Employee(EmployeeId),
}

impl Scope {
    /// Validates a raw `(scopeType, scopeId)` pair.
    pub fn from_parts(scope_type: ScopeType, scope_id: Option<&str>) -> Result<Self, PolicyError> {
        let scope_id = scope_id.map(str::trim);
        match (scope_type, scope_id) {
            (ScopeType::Organization, None) => Ok(Scope::Organization),
            (ScopeType::Organization, Some(_)) => Err(PolicyError::validation(
                "organization scope must not carry a scope id",
            )),
            (_, None) | (_, Some("")) => Err(PolicyError::validation(format!(
                "{scope_type} scope requires a scope id"
            ))),
            (ScopeType::Team, Some(id)) => Ok(Scope::Team(TeamId::from(id))),
            (ScopeType::Employee, Some(id)) => Ok(Scope::Employee(EmployeeId::from(id))),
        }
    }

    pub fn scope_type(&self) -> ScopeType {
        match self {
            Scope::Organization => ScopeType::Organization,
            Scope::Team(_) => ScopeType::Team,
            Scope::Employee(_) => ScopeType::Employee,
        }
    }

    pub fn scope_id(&self) -> Option<&str> {
        match self {
            Scope::Organization => None,
            Scope::Team(id) => Some(id.as_str()),
            Scope::Employee(id) => Some(id.as_str()),
        }
    }

    pub fn priority(&self) -> u8 {
        self.scope_type().priority()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScopeRecord {
    #[serde(rename = "type")]
    scope_type: ScopeType,
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    scope_id: Option<String>,
}

impl TryFrom<ScopeRecord> for Scope {
    type Error = PolicyError;

    fn try_from(record: ScopeRecord) -> Result<Self, Self::Error> {
        Scope::from_parts(record.scope_type, record.scope_id.as_deref())
    }
}

impl From<Scope> for ScopeRecord {
    fn from(scope: Scope) -> Self {
        ScopeRecord {
            scope_type: scope.scope_type(),
            scope_id: scope.scope_id().map(str::to_string),
        }
    }
}

/// The employee a policy is being resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub organization_id: OrganizationId,
    pub employee_id: EmployeeId,
    pub team_id: Option<TeamId>,
}

impl Subject {
    pub fn new(
        organization_id: OrganizationId,
        employee_id: EmployeeId,
        team_id: Option<TeamId>,
    ) -> Self {
        Self {
            organization_id,
            employee_id,
            team_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    pub policy_id: PolicyId,
    pub organization_id: OrganizationId,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_until: Option<DateTime<Utc>>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Assignment {
    pub fn priority(&self) -> u8 {
        self.scope.priority()
    }

    /// Soft-delete and effective-window filter. Both bounds are inclusive.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.effective_from.map_or(true, |from| from <= now)
            && self.effective_until.map_or(true, |until| until >= now)
    }

    /// Whether this assignment's scope covers `subject`.
    pub fn applies_to(&self, subject: &Subject) -> bool {
        if self.organization_id != subject.organization_id {
            return false;
        }
        match &self.scope {
            Scope::Organization => true,
            Scope::Team(team) => subject.team_id.as_ref() == Some(team),
            Scope::Employee(employee) => *employee == subject.employee_id,
        }
    }

    /// True when both assignments occupy the same uniqueness slot.
    pub fn same_slot(&self, other: &Assignment) -> bool {
        self.organization_id == other.organization_id && self.scope == other.scope
    }
}

/// Admin input for creating an assignment. Priority is not an input; it
/// follows from the scope.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub policy_id: PolicyId,
    pub scope_type: ScopeType,
    pub scope_id: Option<String>,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
}

impl NewAssignment {
    pub fn new(policy_id: PolicyId, scope_type: ScopeType, scope_id: Option<&str>) -> Self {
        Self {
            policy_id,
            scope_type,
            scope_id: scope_id.map(str::to_string),
            effective_from: None,
            effective_until: None,
        }
    }

    pub fn effective(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.effective_from = from;
        self.effective_until = until;
        self
    }
}
