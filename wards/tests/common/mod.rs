#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use policy_wards::authz::Actor;
use policy_wards::clock::FixedClock;
use policy_wards::directory::{Employee, MemoryDirectory, Role, Team};
use policy_wards::ids::{EmployeeId, OrganizationId, TeamId};
use policy_wards::routing::ManagerLink;
use policy_wards::store::MemoryStore;
use policy_wards::{ChangePolicyInput, ChangePolicyRules, NewPolicy, PolicyService};

pub const ORG: &str = "org-acme";

pub fn org() -> OrganizationId {
    OrganizationId::from(ORG)
}

/// Monday 2024-06-10 10:00 UTC
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 0).unwrap()
}

pub fn employee(id: &str, team: Option<&str>, role: Role) -> Employee {
    Employee {
        id: EmployeeId::from(id),
        organization_id: org(),
        team_id: team.map(TeamId::from),
        role,
        is_active: true,
        managers: Vec::new(),
    }
}

pub fn team(id: &str) -> Team {
    Team {
        id: TeamId::from(id),
        organization_id: org(),
        name: id.to_string(),
        is_active: true,
    }
}

pub fn actor(employee: &Employee) -> Actor {
    Actor::from(employee)
}

pub fn admin() -> Employee {
    employee("admin", None, Role::Admin)
}

pub fn change_input(self_service: i64, approval: i64) -> NewPolicy<ChangePolicyInput> {
    NewPolicy {
        name: format!("{self_service}+{approval}"),
        rules: ChangePolicyInput {
            self_service_days: self_service,
            approval_days: approval,
            no_approval_required: false,
            notify_all_managers: false,
        },
    }
}

pub struct Fixture {
    pub service: PolicyService<ChangePolicyRules>,
    pub store: Arc<MemoryStore<ChangePolicyRules>>,
    pub directory: Arc<MemoryDirectory>,
    pub clock: Arc<FixedClock>,
}

/// Directory: team-a with alice (managers m-primary, m-second) and lead-a,
/// bob without a team, plus an admin and an inactive team-gone.
pub fn fixture() -> Fixture {
    let mut alice = employee("alice", Some("team-a"), Role::Employee);
    alice.managers = vec![
        ManagerLink {
            manager_id: EmployeeId::from("m-primary"),
            is_primary: true,
        },
        ManagerLink {
            manager_id: EmployeeId::from("m-second"),
            is_primary: false,
        },
    ];
    let mut gone = team("team-gone");
    gone.is_active = false;

    let directory = Arc::new(MemoryDirectory::new(
        vec![team("team-a"), gone],
        vec![
            admin(),
            alice,
            employee("bob", None, Role::Employee),
            employee("lead-a", Some("team-a"), Role::TeamLead),
            employee("lead-b", Some("team-b"), Role::TeamLead),
        ],
    ));
    let store: Arc<MemoryStore<ChangePolicyRules>> = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(t0()));
    let service = PolicyService::new(store.clone(), directory.clone()).with_clock(clock.clone());
    Fixture {
        service,
        store,
        directory,
        clock,
    }
}
