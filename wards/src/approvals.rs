use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{EmployeeId, TimeEntryId};

/// Resolution state for an approval request on a single time entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestState {
    Requested,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Grant,
    Deny,
}

impl Verdict {
    fn state(self) -> RequestState {
        match self {
            Verdict::Grant => RequestState::Granted,
            Verdict::Deny => RequestState::Denied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub requester: EmployeeId,
    pub approvers: Vec<EmployeeId>,
    pub state: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<EmployeeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// In-memory approval requests keyed by time entry
#[derive(Default)]
pub struct ApprovalBook {
    requests: HashMap<TimeEntryId, ApprovalRequest>,
}

impl ApprovalBook {
    pub fn new() -> Self {
        Self {
            requests: HashMap::new(),
        }
    }

    /// Open a request routed to `approvers`; returns true only on the first
    /// request per entry.
    pub fn request(
        &mut self,
        entry: &TimeEntryId,
        requester: &EmployeeId,
        approvers: Vec<EmployeeId>,
    ) -> bool {
        if self.requests.contains_key(entry) {
            return false; // duplicate requests are no-ops
        }
        self.requests.insert(
            entry.clone(),
            ApprovalRequest {
                requester: requester.clone(),
                approvers,
                state: RequestState::Requested,
                resolved_by: None,
                note: None,
            },
        );
        true
    }

    /// Grant; first writer wins. Returns true only if transitioning from
    /// Requested and `approver` was routed the request.
    pub fn grant(&mut self, entry: &TimeEntryId, approver: &EmployeeId, note: Option<&str>) -> bool {
        self.resolve(entry, approver, note, Verdict::Grant, true)
    }

    /// Deny; same rules as [`ApprovalBook::grant`].
    pub fn deny(&mut self, entry: &TimeEntryId, approver: &EmployeeId, reason: &str) -> bool {
        self.resolve(entry, approver, Some(reason), Verdict::Deny, true)
    }

    /// Resolves an open request on behalf of someone outside the routed
    /// approvers. Callers must have checked the override permission; see
    /// `PolicyService::override_approval`.
    pub(crate) fn resolve_unrouted(
        &mut self,
        entry: &TimeEntryId,
        resolver: &EmployeeId,
        note: Option<&str>,
        verdict: Verdict,
    ) -> bool {
        self.resolve(entry, resolver, note, verdict, false)
    }

    fn resolve(
        &mut self,
        entry: &TimeEntryId,
        approver: &EmployeeId,
        note: Option<&str>,
        verdict: Verdict,
        routed_only: bool,
    ) -> bool {
        match self.requests.get_mut(entry) {
            Some(request)
                if request.state == RequestState::Requested
                    && (!routed_only || request.approvers.contains(approver)) =>
            {
                request.state = verdict.state();
                request.resolved_by = Some(approver.clone());
                request.note = note.map(str::to_string);
                true
            }
            _ => false, // already resolved, never requested, or not routed to this approver
        }
    }

    pub fn state(&self, entry: &TimeEntryId) -> Option<RequestState> {
        self.requests.get(entry).map(|r| r.state)
    }

    pub fn get(&self, entry: &TimeEntryId) -> Option<&ApprovalRequest> {
        self.requests.get(entry)
    }

    /// Open requests routed to `approver`.
    pub fn pending_for<'a>(
        &'a self,
        approver: &'a EmployeeId,
    ) -> impl Iterator<Item = (&'a TimeEntryId, &'a ApprovalRequest)> + 'a {
        self.requests.iter().filter(move |(_, r)| {
            r.state == RequestState::Requested && r.approvers.contains(approver)
        })
    }
}
