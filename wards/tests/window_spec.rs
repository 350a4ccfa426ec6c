use chrono::{Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use policy_wards::ids::{OrganizationId, PolicyId};
use policy_wards::window::classify_age;
use policy_wards::{ChangePolicy, ChangePolicyRules, PermissionClass, WindowClassifier};

fn policy(self_service: u32, approval: u32, trust: bool) -> ChangePolicy {
    ChangePolicy {
        id: PolicyId::from("p"),
        organization_id: OrganizationId::from("org"),
        name: "p".into(),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        rules: ChangePolicyRules {
            self_service_days: self_service,
            approval_days: approval,
            no_approval_required: trust,
            notify_all_managers: false,
        },
    }
}

fn days_ago(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap() - Duration::days(n)
}

fn classify(p: Option<&ChangePolicy>, age: i64) -> PermissionClass {
    let now = Utc.with_ymd_and_hms(2024, 6, 10, 15, 0, 0).unwrap();
    WindowClassifier::default().classify(p, days_ago(age), now)
}

#[test]
fn boundaries_are_inclusive() {
    let p = policy(3, 4, false);
    assert_eq!(classify(Some(&p), 3), PermissionClass::SelfService);
    assert_eq!(classify(Some(&p), 4), PermissionClass::ApprovalRequired);
    assert_eq!(classify(Some(&p), 7), PermissionClass::ApprovalRequired);
    assert_eq!(classify(Some(&p), 8), PermissionClass::Locked);
}

#[test]
fn zero_zero_is_strictest_but_same_day_is_free() {
    let p = policy(0, 0, false);
    assert_eq!(classify(Some(&p), 0), PermissionClass::SelfService);
    assert_eq!(classify(Some(&p), 1), PermissionClass::Locked);
}

#[test]
fn zero_self_service_with_approval_band() {
    let p = policy(0, 2, false);
    assert_eq!(classify(Some(&p), 0), PermissionClass::SelfService);
    assert_eq!(classify(Some(&p), 1), PermissionClass::ApprovalRequired);
    assert_eq!(classify(Some(&p), 2), PermissionClass::ApprovalRequired);
    assert_eq!(classify(Some(&p), 3), PermissionClass::Locked);
}

#[test]
fn trust_mode_ignores_every_window() {
    for (self_service, approval) in [(0, 0), (3, 4), (0, 30)] {
        let p = policy(self_service, approval, true);
        for age in [0, 1, 5, 31, 365, 10_000] {
            assert_eq!(classify(Some(&p), age), PermissionClass::SelfService);
            assert_eq!(
                classify_age(&p.rules, age as u32),
                PermissionClass::SelfService
            );
        }
    }
}

#[test]
fn missing_policy_is_unrestricted() {
    for age in [0, 1, 400] {
        assert_eq!(classify(None, age), PermissionClass::SelfService);
    }
}

#[test]
fn future_entries_count_as_today() {
    let p = policy(0, 0, false);
    assert_eq!(classify(Some(&p), -3), PermissionClass::SelfService);
}

#[test]
fn organization_timezone_moves_the_day_boundary() {
    let p = policy(0, 0, false);
    // 2024-06-10 23:30 UTC is already 2024-06-11 in Berlin
    let now = Utc.with_ymd_and_hms(2024, 6, 10, 23, 30, 0).unwrap();
    let entry = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    assert_eq!(
        WindowClassifier::new(Tz::UTC).classify(Some(&p), entry, now),
        PermissionClass::SelfService
    );
    assert_eq!(
        WindowClassifier::new(chrono_tz::Europe::Berlin).classify(Some(&p), entry, now),
        PermissionClass::Locked
    );
}
