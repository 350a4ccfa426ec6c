//! Employee and team lookups. The engine reads these records but never owns
//! them.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::ids::{EmployeeId, OrganizationId, TeamId};
use crate::model::active;
use crate::routing::ManagerLink;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    TeamLead,
    Manager,
    Employee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::TeamLead => "team lead",
            Role::Manager => "manager",
            Role::Employee => "employee",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub organization_id: OrganizationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    pub role: Role,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managers: Vec<ManagerLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "active")]
    pub is_active: bool,
}

pub trait Directory: Send + Sync {
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, StoreError>;

    fn team(&self, id: &TeamId) -> Result<Option<Team>, StoreError>;
}

#[derive(Default)]
pub struct MemoryDirectory {
    employees: RwLock<HashMap<EmployeeId, Employee>>,
    teams: RwLock<HashMap<TeamId, Team>>,
}

impl MemoryDirectory {
    pub fn new(teams: Vec<Team>, employees: Vec<Employee>) -> Self {
        Self {
            employees: RwLock::new(employees.into_iter().map(|e| (e.id.clone(), e)).collect()),
            teams: RwLock::new(teams.into_iter().map(|t| (t.id.clone(), t)).collect()),
        }
    }

    pub fn upsert_employee(&self, employee: Employee) -> Result<(), StoreError> {
        self.employees
            .write()
            .map_err(|_| StoreError::Backend("directory lock poisoned".to_string()))?
            .insert(employee.id.clone(), employee);
        Ok(())
    }

    pub fn upsert_team(&self, team: Team) -> Result<(), StoreError> {
        self.teams
            .write()
            .map_err(|_| StoreError::Backend("directory lock poisoned".to_string()))?
            .insert(team.id.clone(), team);
        Ok(())
    }
}

impl Directory for MemoryDirectory {
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .employees
            .read()
            .map_err(|_| StoreError::Backend("directory lock poisoned".to_string()))?
            .get(id)
            .cloned())
    }

    fn team(&self, id: &TeamId) -> Result<Option<Team>, StoreError> {
        Ok(self
            .teams
            .read()
            .map_err(|_| StoreError::Backend("directory lock poisoned".to_string()))?
            .get(id)
            .cloned())
    }
}
