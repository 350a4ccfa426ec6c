//! Admin operations and the read path, wired to the repository, directory and
//! authorization collaborators.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::approvals::{ApprovalBook, Verdict};
use crate::assignment::{Assignment, NewAssignment, Scope, Subject};
use crate::authz::{Action, Actor, Authorizer, Resource, RoleAuthorizer};
use crate::clock::{Clock, SystemClock};
use crate::config::TimezonePolicy;
use crate::directory::{Directory, Employee};
use crate::error::PolicyError;
use crate::ids::{AssignmentId, EmployeeId, OrganizationId, PolicyId, TimeEntryId};
use crate::model::{validate_name, ChangePolicyRules, NewPolicy, Policy, PolicyPatch, PolicyRules};
use crate::resolver::{precedence, AssignmentResolver};
use crate::routing::route_approval;
use crate::store::PolicyStore;
use crate::window::{PermissionClass, WindowClassifier};

/// Outcome of an edit check on a time entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum EditDecision {
    Allowed { class: PermissionClass },
    NeedsApproval { approvers: Vec<EmployeeId> },
    Denied,
}

pub struct PolicyService<R: PolicyRules> {
    store: Arc<dyn PolicyStore<R>>,
    directory: Arc<dyn Directory>,
    authorizer: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
    timezones: TimezonePolicy,
}

impl<R: PolicyRules> PolicyService<R> {
    pub fn new(store: Arc<dyn PolicyStore<R>>, directory: Arc<dyn Directory>) -> Self {
        Self {
            store,
            directory,
            authorizer: Arc::new(RoleAuthorizer),
            clock: Arc::new(SystemClock),
            timezones: TimezonePolicy::default(),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_timezones(mut self, timezones: TimezonePolicy) -> Self {
        self.timezones = timezones;
        self
    }

    fn authorize(
        &self,
        actor: &Actor,
        resource: Resource<'_>,
        action: Action,
    ) -> Result<(), PolicyError> {
        self.authorizer
            .authorize(actor, &resource, action)
            .map_err(|e| {
                warn!(actor = %actor.id, error = %e, "authorization denied");
                e
            })
    }

    /// Loads a policy of this organization, hiding other organizations'
    /// records behind NotFound.
    fn owned_policy(
        &self,
        organization_id: &OrganizationId,
        policy_id: &PolicyId,
    ) -> Result<Policy<R>, PolicyError> {
        match self.store.policy(policy_id)? {
            Some(policy) if &policy.organization_id == organization_id => Ok(policy),
            _ => Err(PolicyError::not_found("policy", policy_id)),
        }
    }

    fn member(
        &self,
        organization_id: &OrganizationId,
        employee_id: &EmployeeId,
    ) -> Result<Employee, PolicyError> {
        match self.directory.employee(employee_id)? {
            Some(e) if &e.organization_id == organization_id => Ok(e),
            _ => Err(PolicyError::not_found("employee", employee_id)),
        }
    }

    #[instrument(skip(self, actor, input), fields(family = %R::FAMILY, actor = %actor.id))]
    pub fn create_policy(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        input: NewPolicy<R::Input>,
    ) -> Result<PolicyId, PolicyError> {
        self.authorize(actor, Resource::Policies { organization_id }, Action::Create)?;
        let name = validate_name(&input.name)?;
        let rules = R::from_input(input.rules)?;

        let now = self.clock.now();
        let policy = Policy {
            id: PolicyId::generate(),
            organization_id: organization_id.clone(),
            name,
            is_active: true,
            created_at: now,
            updated_at: now,
            rules,
        };
        let id = policy.id.clone();
        self.store.insert_policy(policy)?;
        info!(policy = %id, "created policy");
        Ok(id)
    }

    /// Applies a partial update. Deactivated policies are read-only.
    #[instrument(skip(self, actor, patch), fields(family = %R::FAMILY, actor = %actor.id))]
    pub fn update_policy(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        policy_id: &PolicyId,
        patch: PolicyPatch<R::Patch>,
    ) -> Result<(), PolicyError> {
        self.authorize(actor, Resource::Policies { organization_id }, Action::Update)?;
        let mut policy = self.owned_policy(organization_id, policy_id)?;
        if !policy.is_active {
            return Err(PolicyError::not_found("policy", policy_id));
        }

        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let rules = policy.rules.patched(patch.rules)?;

        if let Some(name) = name {
            policy.name = name;
        }
        policy.rules = rules;
        policy.updated_at = self.clock.now();
        self.store.update_policy(policy)?;
        info!(policy = %policy_id, "updated policy");
        Ok(())
    }

    /// Soft delete. Assignments bound to the policy are deactivated with it,
    /// freeing their scopes. Repeating it on an inactive policy is a no-op.
    #[instrument(skip(self, actor), fields(family = %R::FAMILY, actor = %actor.id))]
    pub fn deactivate_policy(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        policy_id: &PolicyId,
    ) -> Result<(), PolicyError> {
        self.authorize(
            actor,
            Resource::Policies { organization_id },
            Action::Deactivate,
        )?;
        let mut policy = self.owned_policy(organization_id, policy_id)?;
        if !policy.is_active {
            return Ok(());
        }
        policy.is_active = false;
        policy.updated_at = self.clock.now();
        let retired = self.store.retire_policy(policy)?;
        info!(
            policy = %policy_id,
            assignments = retired.len(),
            "deactivated policy"
        );
        Ok(())
    }

    #[instrument(skip(self, actor, input), fields(family = %R::FAMILY, actor = %actor.id))]
    pub fn create_assignment(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        input: NewAssignment,
    ) -> Result<AssignmentId, PolicyError> {
        self.authorize(
            actor,
            Resource::Assignments { organization_id },
            Action::Create,
        )?;
        let scope = Scope::from_parts(input.scope_type, input.scope_id.as_deref())?;
        if let (Some(from), Some(until)) = (input.effective_from, input.effective_until) {
            if from > until {
                return Err(PolicyError::validation(
                    "effectiveFrom must not be after effectiveUntil",
                ));
            }
        }

        let policy = self.owned_policy(organization_id, &input.policy_id)?;
        if !policy.is_active {
            return Err(PolicyError::not_found("policy", &input.policy_id));
        }

        match &scope {
            Scope::Organization => {}
            Scope::Team(team_id) => match self.directory.team(team_id)? {
                Some(team) if &team.organization_id == organization_id && team.is_active => {}
                _ => return Err(PolicyError::not_found("team", team_id)),
            },
            Scope::Employee(employee_id) => match self.directory.employee(employee_id)? {
                Some(e) if &e.organization_id == organization_id && e.is_active => {}
                _ => return Err(PolicyError::not_found("employee", employee_id)),
            },
        }

        let assignment = Assignment {
            id: AssignmentId::generate(),
            policy_id: policy.id,
            organization_id: organization_id.clone(),
            scope,
            effective_from: input.effective_from,
            effective_until: input.effective_until,
            is_active: true,
            created_at: self.clock.now(),
        };
        let id = assignment.id.clone();
        let scope_type = assignment.scope.scope_type();
        self.store.insert_assignment(assignment)?;
        info!(assignment = %id, scope = %scope_type, "created assignment");
        Ok(id)
    }

    /// Soft delete; the assignment is never resolved again.
    #[instrument(skip(self, actor), fields(family = %R::FAMILY, actor = %actor.id))]
    pub fn deactivate_assignment(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        assignment_id: &AssignmentId,
    ) -> Result<(), PolicyError> {
        self.authorize(
            actor,
            Resource::Assignments { organization_id },
            Action::Deactivate,
        )?;
        match self.store.assignment(assignment_id)? {
            Some(a) if &a.organization_id == organization_id => {}
            _ => return Err(PolicyError::not_found("assignment", assignment_id)),
        }
        self.store.deactivate_assignment(assignment_id)?;
        info!(assignment = %assignment_id, "deactivated assignment");
        Ok(())
    }

    /// Active assignments in the order resolution considers them.
    pub fn list_assignments(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Assignment>, PolicyError> {
        let mut assignments: Vec<Assignment> = self
            .store
            .assignments(organization_id)?
            .into_iter()
            .filter(|a| a.is_active)
            .collect();
        assignments.sort_by(precedence);
        Ok(assignments)
    }

    /// Effective policy for `subject` at `now`.
    pub fn resolve_subject_at(
        &self,
        subject: &Subject,
        now: DateTime<Utc>,
    ) -> Result<Option<Policy<R>>, PolicyError> {
        let policies = self.store.policies(&subject.organization_id)?;
        let assignments = self.store.assignments(&subject.organization_id)?;
        Ok(AssignmentResolver::new(&policies, &assignments)
            .resolve(subject, now)
            .cloned())
    }

    /// Effective policy for an employee right now, using their current team.
    pub fn resolve(
        &self,
        organization_id: &OrganizationId,
        employee_id: &EmployeeId,
    ) -> Result<Option<Policy<R>>, PolicyError> {
        let employee = self.member(organization_id, employee_id)?;
        let subject = Subject::new(organization_id.clone(), employee.id, employee.team_id);
        self.resolve_subject_at(&subject, self.clock.now())
    }
}

impl PolicyService<ChangePolicyRules> {
    pub fn classifier(&self, organization_id: &OrganizationId) -> WindowClassifier {
        WindowClassifier::new(self.timezones.for_organization(organization_id))
    }

    /// Permission class of an entry dated `entry_date` for this employee.
    pub fn classify(
        &self,
        organization_id: &OrganizationId,
        employee_id: &EmployeeId,
        entry_date: NaiveDate,
    ) -> Result<PermissionClass, PolicyError> {
        let policy = self.resolve(organization_id, employee_id)?;
        Ok(self
            .classifier(organization_id)
            .classify(policy.as_ref(), entry_date, self.clock.now()))
    }

    /// Decides whether `actor` may edit `employee_id`'s entry dated
    /// `entry_date`, and who must approve if approval is needed.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub fn check_edit(
        &self,
        actor: &Actor,
        organization_id: &OrganizationId,
        employee_id: &EmployeeId,
        entry_date: NaiveDate,
    ) -> Result<EditDecision, PolicyError> {
        let employee = self.member(organization_id, employee_id)?;
        let resource = Resource::TimeEntries {
            organization_id,
            team_id: employee.team_id.as_ref(),
        };
        let elevated = self
            .authorizer
            .authorize(actor, &resource, Action::Override)
            .is_ok();
        let own_entry = &actor.id == employee_id && &actor.organization_id == organization_id;
        if !own_entry && !elevated {
            return Err(PolicyError::unauthorized(format!(
                "{} may not edit entries of {}",
                actor.id, employee_id
            )));
        }

        let now = self.clock.now();
        let subject = Subject::new(
            organization_id.clone(),
            employee.id.clone(),
            employee.team_id.clone(),
        );
        let policy = self.resolve_subject_at(&subject, now)?;
        let class = self
            .classifier(organization_id)
            .classify(policy.as_ref(), entry_date, now);

        let decision = match (class, policy) {
            (PermissionClass::SelfService, _) => EditDecision::Allowed { class },
            (_, _) if elevated => EditDecision::Allowed { class },
            (PermissionClass::ApprovalRequired, Some(policy)) => EditDecision::NeedsApproval {
                approvers: route_approval(&policy.rules, &employee.managers),
            },
            _ => EditDecision::Denied,
        };
        info!(employee = %employee_id, ?class, ?decision, "checked edit");
        Ok(decision)
    }

    /// Grants or denies an open approval request as an elevated actor (an
    /// admin, or the lead of the requester's team), whether or not the actor
    /// was routed the request. This is the only way to resolve a request whose
    /// requester has no managers.
    #[instrument(skip(self, book, actor), fields(actor = %actor.id))]
    pub fn override_approval(
        &self,
        book: &mut ApprovalBook,
        actor: &Actor,
        organization_id: &OrganizationId,
        entry: &TimeEntryId,
        verdict: Verdict,
        note: Option<&str>,
    ) -> Result<bool, PolicyError> {
        let requester = match book.get(entry) {
            Some(request) => request.requester.clone(),
            None => return Err(PolicyError::not_found("approval request", entry)),
        };
        let employee = self.member(organization_id, &requester)?;
        self.authorize(
            actor,
            Resource::TimeEntries {
                organization_id,
                team_id: employee.team_id.as_ref(),
            },
            Action::Override,
        )?;
        let resolved = book.resolve_unrouted(entry, &actor.id, note, verdict);
        info!(entry = %entry, ?verdict, resolved, "override approval");
        Ok(resolved)
    }
}
