use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::model::{ChangePolicy, ChangePolicyRules};

/// Edit permission for a time entry on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionClass {
    SelfService,
    ApprovalRequired,
    /// Both windows elapsed; only elevated roles may still edit.
    Locked,
}

/// Whole calendar days from `target` to today, where today is `now` seen in
/// `tz`. Entries dated in the future count as age zero.
pub fn age_in_days(target: NaiveDate, now: DateTime<Utc>, tz: Tz) -> u32 {
    let today = now.with_timezone(&tz).date_naive();
    let days = today.signed_duration_since(target).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// Window math for an already computed age. Both thresholds are inclusive.
pub fn classify_age(rules: &ChangePolicyRules, age_days: u32) -> PermissionClass {
    if rules.no_approval_required {
        return PermissionClass::SelfService;
    }
    if age_days <= rules.self_service_days {
        PermissionClass::SelfService
    } else if age_days <= rules.self_service_days.saturating_add(rules.approval_days) {
        PermissionClass::ApprovalRequired
    } else {
        PermissionClass::Locked
    }
}

/// Classifies entry dates against a resolved change policy. Ages are counted
/// in the classifier's timezone.
#[derive(Debug, Clone, Copy)]
pub struct WindowClassifier {
    timezone: Tz,
}

impl Default for WindowClassifier {
    fn default() -> Self {
        Self { timezone: Tz::UTC }
    }
}

impl WindowClassifier {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// `None` means no policy is assigned, which leaves edits unrestricted.
    pub fn classify(
        &self,
        policy: Option<&ChangePolicy>,
        target: NaiveDate,
        now: DateTime<Utc>,
    ) -> PermissionClass {
        match policy {
            None => PermissionClass::SelfService,
            Some(policy) => {
                classify_age(&policy.rules, age_in_days(target, now, self.timezone))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rules(self_service: u32, approval: u32) -> ChangePolicyRules {
        ChangePolicyRules {
            self_service_days: self_service,
            approval_days: approval,
            no_approval_required: false,
            notify_all_managers: false,
        }
    }

    #[test]
    fn thresholds_are_inclusive() {
        let r = rules(3, 4);
        assert_eq!(classify_age(&r, 0), PermissionClass::SelfService);
        assert_eq!(classify_age(&r, 3), PermissionClass::SelfService);
        assert_eq!(classify_age(&r, 4), PermissionClass::ApprovalRequired);
        assert_eq!(classify_age(&r, 7), PermissionClass::ApprovalRequired);
        assert_eq!(classify_age(&r, 8), PermissionClass::Locked);
    }

    #[test]
    fn zero_windows_allow_same_day_only() {
        let r = rules(0, 0);
        assert_eq!(classify_age(&r, 0), PermissionClass::SelfService);
        assert_eq!(classify_age(&r, 1), PermissionClass::Locked);
    }

    #[test]
    fn huge_windows_do_not_overflow() {
        let r = rules(u32::MAX, u32::MAX);
        assert_eq!(classify_age(&r, u32::MAX), PermissionClass::SelfService);
    }

    #[test]
    fn future_dates_clamp_to_zero() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();
        assert_eq!(age_in_days(tomorrow, now, Tz::UTC), 0);
    }

    #[test]
    fn age_depends_on_timezone() {
        // 23:30 UTC on June 10th is already June 11th in Berlin.
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 23, 30, 0).unwrap();
        let entry = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(age_in_days(entry, now, Tz::UTC), 0);
        assert_eq!(age_in_days(entry, now, chrono_tz::Europe::Berlin), 1);
        // and still June 10th in Los Angeles
        assert_eq!(age_in_days(entry, now, chrono_tz::America::Los_Angeles), 0);
    }
}
