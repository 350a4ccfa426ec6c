use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use policy_wards::assignment::Assignment;
use policy_wards::clock::FixedClock;
use policy_wards::config::{self, TimezonePolicy};
use policy_wards::ids::{EmployeeId, OrganizationId, PolicyId};
use policy_wards::snapshot::Snapshot;
use policy_wards::window::age_in_days;
use policy_wards::{ChangePolicyRules, PermissionClass, PolicyService};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::schema::SnapshotSchema;

type ChangeSnapshot = Snapshot<ChangePolicyRules>;

/// Reads a snapshot file as a JSON value. `.json` files are parsed as JSON,
/// anything else as YAML.
pub fn read_document(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let value = if is_json {
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON snapshot {}", path.display()))?
    } else {
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse YAML snapshot {}", path.display()))?
    };
    Ok(value)
}

fn load_snapshot(path: &Path) -> Result<ChangeSnapshot> {
    let document = read_document(path)?;
    let snapshot: ChangeSnapshot = serde_json::from_value(document)
        .with_context(|| format!("Snapshot {} does not match the model", path.display()))?;
    debug!(
        policies = snapshot.policies.len(),
        assignments = snapshot.assignments.len(),
        employees = snapshot.employees.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

fn service_at(
    path: &Path,
    at: Option<DateTime<Utc>>,
    timezones: TimezonePolicy,
) -> Result<PolicyService<ChangePolicyRules>> {
    let (store, directory) = load_snapshot(path)?.into_parts();
    let clock = FixedClock::new(at.unwrap_or_else(Utc::now));
    Ok(PolicyService::new(Arc::new(store), Arc::new(directory))
        .with_clock(Arc::new(clock))
        .with_timezones(timezones))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn resolve(
    path: &Path,
    org: &str,
    employee: &str,
    at: Option<DateTime<Utc>>,
) -> Result<()> {
    let service = service_at(path, at, TimezonePolicy::default())?;
    let policy = service.resolve(&OrganizationId::from(org), &EmployeeId::from(employee))?;
    info!(
        employee,
        policy = policy.as_ref().map(|p| p.id.as_str()).unwrap_or("none"),
        "resolved"
    );
    print_json(&policy)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Classification {
    class: PermissionClass,
    policy_id: Option<PolicyId>,
    age_days: u32,
    timezone: String,
}

pub fn classify(
    path: &Path,
    org: &str,
    employee: &str,
    date: NaiveDate,
    at: Option<DateTime<Utc>>,
    timezone: Option<&str>,
) -> Result<()> {
    let timezones = match timezone {
        Some(raw) => {
            let tz: Tz = raw
                .parse()
                .map_err(|e| anyhow!("Invalid timezone '{}': {}", raw, e))?;
            TimezonePolicy::fixed(tz)
        }
        None => config::load_from_env()?.timezones,
    };
    let org = OrganizationId::from(org);
    let now = at.unwrap_or_else(Utc::now);
    let service = service_at(path, Some(now), timezones)?;
    let policy = service.resolve(&org, &EmployeeId::from(employee))?;
    let classifier = service.classifier(&org);

    print_json(&Classification {
        class: classifier.classify(policy.as_ref(), date, now),
        policy_id: policy.map(|p| p.id),
        age_days: age_in_days(date, now, classifier.timezone()),
        timezone: classifier.timezone().name().to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentRow {
    priority: u8,
    #[serde(flatten)]
    assignment: Assignment,
}

pub fn assignments(path: &Path, org: &str) -> Result<()> {
    let service = service_at(path, None, TimezonePolicy::default())?;
    let rows: Vec<AssignmentRow> = service
        .list_assignments(&OrganizationId::from(org))?
        .into_iter()
        .map(|assignment| AssignmentRow {
            priority: assignment.priority(),
            assignment,
        })
        .collect();
    print_json(&rows)
}

/// Schema violations first, then model invariants. Returns false when the
/// snapshot has any problem.
pub fn validate(path: &Path) -> Result<bool> {
    let document = read_document(path)?;
    let mut problems = SnapshotSchema::new()?.violations(&document);

    if problems.is_empty() {
        match serde_json::from_value::<ChangeSnapshot>(document) {
            Ok(snapshot) => problems.extend(snapshot.check()),
            Err(e) => problems.push(format!("snapshot does not match the model: {}", e)),
        }
    }

    if problems.is_empty() {
        println!("✓ Valid snapshot: {}", path.display());
        return Ok(true);
    }
    eprintln!("✗ Invalid snapshot: {}", path.display());
    for problem in &problems {
        eprintln!("  - {}", problem);
    }
    Ok(false)
}
