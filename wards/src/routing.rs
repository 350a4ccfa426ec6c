use serde::{Deserialize, Serialize};

use crate::ids::EmployeeId;
use crate::model::ChangePolicyRules;

/// A manager relation of an employee. At most one per employee is primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerLink {
    pub manager_id: EmployeeId,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Fanout {
    AllManagers,
    PrimaryOnly,
}

impl From<&ChangePolicyRules> for Fanout {
    fn from(rules: &ChangePolicyRules) -> Self {
        if rules.notify_all_managers {
            Fanout::AllManagers
        } else {
            Fanout::PrimaryOnly
        }
    }
}

/// Approvers for an edit that needs approval, in the order the manager links
/// were given.
///
/// With `PrimaryOnly` and no primary link, every manager is returned so the
/// request still reaches someone.
pub fn route_approval(rules: &ChangePolicyRules, managers: &[ManagerLink]) -> Vec<EmployeeId> {
    let chosen: Vec<&ManagerLink> = match Fanout::from(rules) {
        Fanout::AllManagers => managers.iter().collect(),
        Fanout::PrimaryOnly => match managers.iter().find(|m| m.is_primary) {
            Some(primary) => vec![primary],
            None => managers.iter().collect(),
        },
    };

    let mut approvers: Vec<EmployeeId> = Vec::with_capacity(chosen.len());
    for link in chosen {
        if !approvers.contains(&link.manager_id) {
            approvers.push(link.manager_id.clone());
        }
    }
    approvers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: &str, primary: bool) -> ManagerLink {
        ManagerLink {
            manager_id: EmployeeId::from(id),
            is_primary: primary,
        }
    }

    fn rules(all: bool) -> ChangePolicyRules {
        ChangePolicyRules {
            self_service_days: 1,
            approval_days: 5,
            no_approval_required: false,
            notify_all_managers: all,
        }
    }

    #[test]
    fn all_managers_when_flag_set() {
        let managers = [link("m1", false), link("m2", true), link("m1", false)];
        let routed = route_approval(&rules(true), &managers);
        assert_eq!(routed, vec![EmployeeId::from("m1"), EmployeeId::from("m2")]);
    }

    #[test]
    fn primary_only_otherwise() {
        let managers = [link("m1", false), link("m2", true)];
        assert_eq!(
            route_approval(&rules(false), &managers),
            vec![EmployeeId::from("m2")]
        );
    }

    #[test]
    fn missing_primary_falls_back_to_all() {
        let managers = [link("m1", false), link("m3", false)];
        assert_eq!(route_approval(&rules(false), &managers).len(), 2);
        assert!(route_approval(&rules(false), &[]).is_empty());
    }
}
