mod common;

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use common::*;
use policy_wards::clock::FixedClock;
use policy_wards::config::{load_from_env, ConfigError};
use policy_wards::directory::Role;
use policy_wards::ids::OrganizationId;
use policy_wards::{NewAssignment, PermissionClass, ScopeType};
use serial_test::serial;

fn clear_env() {
    std::env::remove_var("WARDS_TIMEZONE");
    std::env::remove_var("WARDS_ORG_TIMEZONES");
}

#[test]
#[serial]
fn defaults_to_utc_without_env() {
    clear_env();
    let cfg = load_from_env().unwrap();
    assert_eq!(cfg.timezones.default, chrono_tz::Tz::UTC);
    assert!(cfg.timezones.organizations.is_empty());
}

#[test]
#[serial]
fn reads_default_and_organization_zones() {
    clear_env();
    std::env::set_var("WARDS_TIMEZONE", " Europe/London ");
    std::env::set_var(
        "WARDS_ORG_TIMEZONES",
        "org-acme=Europe/Berlin,org-west=America/Los_Angeles",
    );

    let cfg = load_from_env().unwrap();
    let zones = &cfg.timezones;
    assert_eq!(zones.default, chrono_tz::Europe::London);
    assert_eq!(zones.for_organization(&org()), chrono_tz::Europe::Berlin);
    assert_eq!(
        zones.for_organization(&OrganizationId::from("org-west")),
        chrono_tz::America::Los_Angeles
    );
    assert_eq!(
        zones.for_organization(&OrganizationId::from("org-none")),
        chrono_tz::Europe::London
    );

    clear_env();
}

#[test]
#[serial]
fn invalid_timezone_is_reported_not_ignored() {
    clear_env();
    std::env::set_var("WARDS_TIMEZONE", "Mars/Olympus");
    let err = load_from_env().unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidTimezone {
            var: "WARDS_TIMEZONE",
            value: "Mars/Olympus".into(),
        }
    );
    assert!(err.to_string().contains("Mars/Olympus"));

    clear_env();
    std::env::set_var("WARDS_ORG_TIMEZONES", "org-acme");
    assert!(matches!(
        load_from_env(),
        Err(ConfigError::MalformedEntry { index: 1, .. })
    ));

    clear_env();
}

#[test]
#[serial]
fn organization_zone_shifts_entry_age() {
    clear_env();
    std::env::set_var("WARDS_ORG_TIMEZONES", r#"{"org-acme": "Pacific/Auckland"}"#);
    let cfg = load_from_env().unwrap();
    clear_env();

    let f = fixture();
    let admin = actor(&admin());
    let policy = f
        .service
        .create_policy(&admin, &org(), change_input(0, 0))
        .unwrap();
    f.service
        .create_assignment(&admin, &org(), NewAssignment::new(policy, ScopeType::Organization, None))
        .unwrap();

    // 2024-06-10 13:00 UTC is already 2024-06-11 01:00 in Auckland
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 10, 13, 0, 0).unwrap(),
    ));
    let utc_service = policy_wards::PolicyService::new(f.store.clone(), f.directory.clone())
        .with_clock(clock.clone());
    let local_service = policy_wards::PolicyService::new(f.store.clone(), f.directory.clone())
        .with_clock(clock)
        .with_timezones(cfg.timezones);

    let alice = employee("alice", Some("team-a"), Role::Employee);
    let entry = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    assert_eq!(
        utc_service.classify(&org(), &alice.id, entry).unwrap(),
        PermissionClass::SelfService
    );
    assert_eq!(
        local_service.classify(&org(), &alice.id, entry).unwrap(),
        PermissionClass::Locked
    );
}
