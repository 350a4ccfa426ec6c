//! Repository seam for policies and assignments.
//!
//! A SQL backend would implement [`PolicyStore`] over the policy and assignment
//! tables, enforcing the active-scope uniqueness with a partial unique index
//! on `(family, organization_id, scope_type, scope_id) WHERE is_active`.
//! [`MemoryStore`] provides the same guarantee with a single write lock.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::debug;

use crate::assignment::Assignment;
use crate::ids::{AssignmentId, OrganizationId, PolicyId};
use crate::model::{Policy, PolicyRules};

/// Uniform error type for storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {message}")]
    Conflict { message: String },
    #[error("backend error: {0}")]
    Backend(String),
}

/// Storage for one policy family. The family is fixed by `R`, so every
/// uniqueness check below is implicitly scoped to `R::FAMILY`.
pub trait PolicyStore<R: PolicyRules>: Send + Sync {
    fn policy(&self, id: &PolicyId) -> Result<Option<Policy<R>>, StoreError>;

    fn policies(&self, organization_id: &OrganizationId) -> Result<Vec<Policy<R>>, StoreError>;

    fn insert_policy(&self, policy: Policy<R>) -> Result<(), StoreError>;

    /// Replaces an existing policy record by id.
    fn update_policy(&self, policy: Policy<R>) -> Result<(), StoreError>;

    fn assignment(&self, id: &AssignmentId) -> Result<Option<Assignment>, StoreError>;

    /// Every assignment of the organization, inactive ones included.
    fn assignments(&self, organization_id: &OrganizationId)
        -> Result<Vec<Assignment>, StoreError>;

    /// Inserts `assignment` unless an active assignment already occupies the
    /// same organization and scope. The check and the insert are one atomic
    /// step.
    fn insert_assignment(&self, assignment: Assignment) -> Result<(), StoreError>;

    fn deactivate_assignment(&self, id: &AssignmentId) -> Result<(), StoreError>;

    /// Stores an already deactivated policy record and deactivates every
    /// active assignment bound to it, in one atomic step. Returns the ids of
    /// the assignments it deactivated.
    fn retire_policy(&self, policy: Policy<R>) -> Result<Vec<AssignmentId>, StoreError>;
}

struct Tables<R> {
    policies: HashMap<PolicyId, Policy<R>>,
    assignments: HashMap<AssignmentId, Assignment>,
}

/// In-memory store, safe to share across request threads.
pub struct MemoryStore<R> {
    tables: RwLock<Tables<R>>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self {
            tables: RwLock::new(Tables {
                policies: HashMap::new(),
                assignments: HashMap::new(),
            }),
        }
    }
}

impl<R: PolicyRules> MemoryStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads existing records as-is, without the duplicate-scope check. Use
    /// for fixtures and snapshots that were checked separately.
    pub fn with_records(policies: Vec<Policy<R>>, assignments: Vec<Assignment>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                policies: policies.into_iter().map(|p| (p.id.clone(), p)).collect(),
                assignments: assignments
                    .into_iter()
                    .map(|a| (a.id.clone(), a))
                    .collect(),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables<R>>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables<R>>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

impl<R: PolicyRules> PolicyStore<R> for MemoryStore<R> {
    fn policy(&self, id: &PolicyId) -> Result<Option<Policy<R>>, StoreError> {
        Ok(self.read()?.policies.get(id).cloned())
    }

    fn policies(&self, organization_id: &OrganizationId) -> Result<Vec<Policy<R>>, StoreError> {
        Ok(self
            .read()?
            .policies
            .values()
            .filter(|p| &p.organization_id == organization_id)
            .cloned()
            .collect())
    }

    fn insert_policy(&self, policy: Policy<R>) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.policies.contains_key(&policy.id) {
            return Err(StoreError::Conflict {
                message: format!("policy {} already exists", policy.id),
            });
        }
        tables.policies.insert(policy.id.clone(), policy);
        Ok(())
    }

    fn update_policy(&self, policy: Policy<R>) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        match tables.policies.get_mut(&policy.id) {
            Some(slot) => {
                *slot = policy;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "policy",
                id: policy.id.to_string(),
            }),
        }
    }

    fn assignment(&self, id: &AssignmentId) -> Result<Option<Assignment>, StoreError> {
        Ok(self.read()?.assignments.get(id).cloned())
    }

    fn assignments(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Assignment>, StoreError> {
        Ok(self
            .read()?
            .assignments
            .values()
            .filter(|a| &a.organization_id == organization_id)
            .cloned()
            .collect())
    }

    fn insert_assignment(&self, assignment: Assignment) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if let Some(existing) = tables
            .assignments
            .values()
            .find(|a| a.is_active && a.same_slot(&assignment))
        {
            debug!(
                existing = %existing.id,
                family = %R::FAMILY,
                "rejecting duplicate active assignment"
            );
            return Err(StoreError::Conflict {
                message: format!(
                    "an active {} assignment already exists for {} scope{} (assignment {})",
                    R::FAMILY,
                    assignment.scope.scope_type(),
                    assignment
                        .scope
                        .scope_id()
                        .map(|id| format!(" {id}"))
                        .unwrap_or_default(),
                    existing.id
                ),
            });
        }
        tables
            .assignments
            .insert(assignment.id.clone(), assignment);
        Ok(())
    }

    fn deactivate_assignment(&self, id: &AssignmentId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        match tables.assignments.get_mut(id) {
            Some(assignment) => {
                assignment.is_active = false;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "assignment",
                id: id.to_string(),
            }),
        }
    }

    fn retire_policy(&self, policy: Policy<R>) -> Result<Vec<AssignmentId>, StoreError> {
        let mut tables = self.write()?;
        if !tables.policies.contains_key(&policy.id) {
            return Err(StoreError::NotFound {
                entity: "policy",
                id: policy.id.to_string(),
            });
        }
        let mut retired = Vec::new();
        for assignment in tables.assignments.values_mut() {
            if assignment.is_active && assignment.policy_id == policy.id {
                assignment.is_active = false;
                retired.push(assignment.id.clone());
            }
        }
        retired.sort();
        tables.policies.insert(policy.id.clone(), policy);
        Ok(retired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::Scope;
    use crate::model::ChangePolicyRules;
    use chrono::Utc;
    use std::sync::Arc;

    fn org_assignment(id: &str) -> Assignment {
        Assignment {
            id: AssignmentId::from(id),
            policy_id: PolicyId::from("p-1"),
            organization_id: OrganizationId::from("org"),
            scope: Scope::Organization,
            effective_from: None,
            effective_until: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_active_scope_is_a_conflict() {
        let store = MemoryStore::<ChangePolicyRules>::new();
        store.insert_assignment(org_assignment("a-1")).unwrap();
        let err = store.insert_assignment(org_assignment("a-2")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        store.deactivate_assignment(&AssignmentId::from("a-1")).unwrap();
        store.insert_assignment(org_assignment("a-2")).unwrap();
    }

    #[test]
    fn concurrent_inserts_admit_exactly_one() {
        let store = Arc::new(MemoryStore::<ChangePolicyRules>::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.insert_assignment(org_assignment(&format!("a-{i}"))))
            })
            .collect();
        let ok = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(ok, 1);
        let org = OrganizationId::from("org");
        assert_eq!(store.assignments(&org).unwrap().len(), 1);
    }

    #[test]
    fn deactivating_unknown_assignment_is_not_found() {
        let store = MemoryStore::<ChangePolicyRules>::new();
        let err = store
            .deactivate_assignment(&AssignmentId::from("missing"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
