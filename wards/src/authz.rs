//! Single authorization seam for every mutation and for edits past the
//! change windows.

use std::fmt;

use crate::directory::{Employee, Role};
use crate::error::PolicyError;
use crate::ids::{EmployeeId, OrganizationId, TeamId};

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: EmployeeId,
    pub organization_id: OrganizationId,
    pub role: Role,
    pub team_id: Option<TeamId>,
}

impl From<&Employee> for Actor {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id.clone(),
            organization_id: employee.organization_id.clone(),
            role: employee.role,
            team_id: employee.team_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    Policies {
        organization_id: &'a OrganizationId,
    },
    Assignments {
        organization_id: &'a OrganizationId,
    },
    /// Time entries of an employee on `team_id`.
    TimeEntries {
        organization_id: &'a OrganizationId,
        team_id: Option<&'a TeamId>,
    },
}

impl Resource<'_> {
    fn organization_id(&self) -> &OrganizationId {
        match self {
            Resource::Policies { organization_id }
            | Resource::Assignments { organization_id }
            | Resource::TimeEntries {
                organization_id, ..
            } => organization_id,
        }
    }
}

impl fmt::Display for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Policies { organization_id } => {
                write!(f, "policies of organization {organization_id}")
            }
            Resource::Assignments { organization_id } => {
                write!(f, "assignments of organization {organization_id}")
            }
            Resource::TimeEntries {
                organization_id,
                team_id: Some(team_id),
            } => write!(f, "time entries of team {team_id} in organization {organization_id}"),
            Resource::TimeEntries {
                organization_id,
                team_id: None,
            } => write!(f, "time entries in organization {organization_id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Deactivate,
    /// Edit a time entry outside its self-service window without approval.
    Override,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Deactivate => "deactivate",
            Action::Override => "override the edit window on",
        })
    }
}

pub trait Authorizer: Send + Sync {
    fn authorize(&self, actor: &Actor, resource: &Resource<'_>, action: Action)
        -> Result<(), PolicyError>;
}

/// Role table: admins manage policies and assignments; admins and the lead of
/// the owning team may override edit windows; any member may read.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn authorize(
        &self,
        actor: &Actor,
        resource: &Resource<'_>,
        action: Action,
    ) -> Result<(), PolicyError> {
        if &actor.organization_id != resource.organization_id() {
            return Err(PolicyError::unauthorized(format!(
                "{} is not a member of organization {}",
                actor.id,
                resource.organization_id()
            )));
        }
        let allowed = match (resource, action) {
            (_, Action::Read) => true,
            (Resource::Policies { .. } | Resource::Assignments { .. }, _) => {
                actor.role == Role::Admin
            }
            (Resource::TimeEntries { team_id, .. }, Action::Override) => match actor.role {
                Role::Admin => true,
                Role::TeamLead => team_id.is_some() && actor.team_id.as_ref() == *team_id,
                _ => false,
            },
            (Resource::TimeEntries { .. }, _) => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(PolicyError::unauthorized(format!(
                "{} ({}) may not {} {}",
                actor.id, actor.role, action, resource
            )))
        }
    }
}
