//! Picks the single effective policy for an employee.
//!
//! Resolution is a pure function over a snapshot of one family's policies and
//! assignments:
//!
//! 1. keep assignments that are active and whose effective window contains
//!    `now` ([`Assignment::is_live_at`]);
//! 2. keep those whose scope covers the employee ([`Assignment::applies_to`]);
//! 3. order by [`precedence`] (priority desc, then `createdAt` desc) and take
//!    the first whose policy is present and active.
//!
//! No applicable assignment yields `None`.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::assignment::{Assignment, Subject};
use crate::ids::PolicyId;
use crate::model::{Policy, PolicyRules};

/// Total order used by resolution and by assignment listings: more specific
/// scope first, then newest first. Equal timestamps fall back to the id so the
/// order is stable across runs.
pub fn precedence(a: &Assignment, b: &Assignment) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// A resolved policy together with the assignment that selected it.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a, R> {
    pub assignment: &'a Assignment,
    pub policy: &'a Policy<R>,
}

pub struct AssignmentResolver<'a, R> {
    policies: HashMap<&'a PolicyId, &'a Policy<R>>,
    assignments: &'a [Assignment],
}

impl<'a, R: PolicyRules> AssignmentResolver<'a, R> {
    pub fn new(policies: &'a [Policy<R>], assignments: &'a [Assignment]) -> Self {
        Self {
            policies: policies.iter().map(|p| (&p.id, p)).collect(),
            assignments,
        }
    }

    /// Live assignments covering `subject`, best first.
    pub fn candidates(&self, subject: &Subject, now: DateTime<Utc>) -> Vec<&'a Assignment> {
        let mut candidates: Vec<&'a Assignment> = self
            .assignments
            .iter()
            .filter(|a| a.is_live_at(now) && a.applies_to(subject))
            .collect();
        candidates.sort_by(|a, b| precedence(a, b));
        candidates
    }

    pub fn resolve_with_source(
        &self,
        subject: &Subject,
        now: DateTime<Utc>,
    ) -> Option<Resolution<'a, R>> {
        for assignment in self.candidates(subject, now) {
            match self.policies.get(&assignment.policy_id) {
                Some(policy) if policy.is_active => {
                    debug!(
                        employee = %subject.employee_id,
                        family = %R::FAMILY,
                        assignment = %assignment.id,
                        policy = %policy.id,
                        scope = %assignment.scope.scope_type(),
                        "resolved policy"
                    );
                    return Some(Resolution {
                        assignment,
                        policy: *policy,
                    });
                }
                Some(_) => debug!(
                    assignment = %assignment.id,
                    policy = %assignment.policy_id,
                    "skipping assignment of deactivated policy"
                ),
                None => debug!(
                    assignment = %assignment.id,
                    policy = %assignment.policy_id,
                    "skipping assignment of unknown policy"
                ),
            }
        }
        debug!(employee = %subject.employee_id, family = %R::FAMILY, "no policy applies");
        None
    }

    pub fn resolve(&self, subject: &Subject, now: DateTime<Utc>) -> Option<&'a Policy<R>> {
        self.resolve_with_source(subject, now).map(|r| r.policy)
    }
}

/// Convenience wrapper for one-off resolution over slices.
pub fn resolve<'a, R: PolicyRules>(
    policies: &'a [Policy<R>],
    assignments: &'a [Assignment],
    subject: &Subject,
    now: DateTime<Utc>,
) -> Option<&'a Policy<R>> {
    AssignmentResolver::new(policies, assignments).resolve(subject, now)
}
