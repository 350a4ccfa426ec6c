//! A complete data set for one policy family: the directory records plus the
//! policies and assignments bound to them. Used for fixtures, imports and the
//! `wardsctl` CLI.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::assignment::{Assignment, Scope};
use crate::directory::{Employee, MemoryDirectory, Team};
use crate::ids::{EmployeeId, PolicyId, TeamId};
use crate::model::{Policy, PolicyRules};
use crate::store::MemoryStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<R> {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub policies: Vec<Policy<R>>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl<R> Default for Snapshot<R> {
    fn default() -> Self {
        Self {
            teams: Vec::new(),
            employees: Vec::new(),
            policies: Vec::new(),
            assignments: Vec::new(),
        }
    }
}

impl<R: PolicyRules> Snapshot<R> {
    /// Every invariant violation in the data set, in a stable order. Empty
    /// means the snapshot is consistent.
    pub fn check(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let teams: HashMap<&TeamId, &Team> = self.teams.iter().map(|t| (&t.id, t)).collect();
        let employees: HashMap<&EmployeeId, &Employee> =
            self.employees.iter().map(|e| (&e.id, e)).collect();
        let policies: HashMap<&PolicyId, &Policy<R>> =
            self.policies.iter().map(|p| (&p.id, p)).collect();

        let mut seen_policies = HashSet::new();
        for policy in &self.policies {
            if !seen_policies.insert(&policy.id) {
                issues.push(format!("policy {} is defined more than once", policy.id));
            }
            if policy.name.trim().is_empty() {
                issues.push(format!("policy {} has an empty name", policy.id));
            }
        }

        for employee in &self.employees {
            if let Some(team_id) = &employee.team_id {
                match teams.get(team_id) {
                    None => issues.push(format!(
                        "employee {} references unknown team {}",
                        employee.id, team_id
                    )),
                    Some(team) if team.organization_id != employee.organization_id => {
                        issues.push(format!(
                            "employee {} belongs to team {} of another organization",
                            employee.id, team_id
                        ))
                    }
                    Some(_) => {}
                }
            }
            if employee.managers.iter().filter(|m| m.is_primary).count() > 1 {
                issues.push(format!(
                    "employee {} has more than one primary manager",
                    employee.id
                ));
            }
        }

        let mut seen_assignments = HashSet::new();
        for (idx, assignment) in self.assignments.iter().enumerate() {
            let id = &assignment.id;
            if !seen_assignments.insert(id) {
                issues.push(format!("assignment {id} is defined more than once"));
            }

            match policies.get(&assignment.policy_id) {
                None => issues.push(format!(
                    "assignment {id} references unknown policy {}",
                    assignment.policy_id
                )),
                Some(policy) if policy.organization_id != assignment.organization_id => issues
                    .push(format!(
                        "assignment {id} references policy {} of another organization",
                        policy.id
                    )),
                Some(_) => {}
            }

            match &assignment.scope {
                Scope::Organization => {}
                Scope::Team(team_id) => match teams.get(team_id) {
                    Some(team) if team.organization_id != assignment.organization_id => issues
                        .push(format!(
                            "assignment {id} targets team {team_id} outside its organization"
                        )),
                    Some(team) if assignment.is_active && !team.is_active => issues.push(
                        format!("active assignment {id} targets inactive team {team_id}"),
                    ),
                    Some(_) => {}
                    None => issues.push(format!(
                        "assignment {id} targets team {team_id} outside its organization"
                    )),
                },
                Scope::Employee(employee_id) => match employees.get(employee_id) {
                    Some(e) if e.organization_id != assignment.organization_id => issues.push(
                        format!(
                            "assignment {id} targets employee {employee_id} outside its organization"
                        ),
                    ),
                    Some(e) if assignment.is_active && !e.is_active => issues.push(format!(
                        "active assignment {id} targets inactive employee {employee_id}"
                    )),
                    Some(_) => {}
                    None => issues.push(format!(
                        "assignment {id} targets employee {employee_id} outside its organization"
                    )),
                },
            }

            if let (Some(from), Some(until)) = (assignment.effective_from, assignment.effective_until)
            {
                if from > until {
                    issues.push(format!(
                        "assignment {id} has effectiveFrom after effectiveUntil"
                    ));
                }
            }

            if assignment.is_active {
                let duplicate = self.assignments[..idx]
                    .iter()
                    .find(|other| other.is_active && other.same_slot(assignment));
                if let Some(other) = duplicate {
                    issues.push(format!(
                        "assignments {} and {id} are both active for {} scope{}",
                        other.id,
                        assignment.scope.scope_type(),
                        assignment
                            .scope
                            .scope_id()
                            .map(|s| format!(" {s}"))
                            .unwrap_or_default()
                    ));
                }
            }
        }

        issues
    }

    /// Splits the snapshot into the in-memory collaborators.
    pub fn into_parts(self) -> (MemoryStore<R>, MemoryDirectory) {
        (
            MemoryStore::with_records(self.policies, self.assignments),
            MemoryDirectory::new(self.teams, self.employees),
        )
    }
}
