use std::collections::HashMap;

use chrono_tz::Tz;
use thiserror::Error;
use tracing::debug;

use crate::ids::OrganizationId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid timezone '{value}' in {var}")]
    InvalidTimezone { var: &'static str, value: String },

    #[error("{var} entry #{index} is malformed: {message}")]
    MalformedEntry {
        var: &'static str,
        index: usize,
        message: String,
    },

    #[error("{var} JSON is malformed: {message}")]
    MalformedJson { var: &'static str, message: String },
}

/// Which timezone "today" is measured in when computing entry ages.
///
/// Lookup order: the organization's own zone, then the default zone.
#[derive(Debug, Clone, PartialEq)]
pub struct TimezonePolicy {
    pub default: Tz,
    pub organizations: HashMap<OrganizationId, Tz>,
}

impl Default for TimezonePolicy {
    fn default() -> Self {
        Self {
            default: Tz::UTC,
            organizations: HashMap::new(),
        }
    }
}

impl TimezonePolicy {
    pub fn fixed(tz: Tz) -> Self {
        Self {
            default: tz,
            organizations: HashMap::new(),
        }
    }

    pub fn for_organization(&self, organization_id: &OrganizationId) -> Tz {
        self.organizations
            .get(organization_id)
            .copied()
            .unwrap_or(self.default)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WardsConfig {
    pub timezones: TimezonePolicy,
}

const TIMEZONE_VAR: &str = "WARDS_TIMEZONE";
const ORG_TIMEZONES_VAR: &str = "WARDS_ORG_TIMEZONES";

pub fn load_from_env() -> Result<WardsConfig, ConfigError> {
    let default = match std::env::var(TIMEZONE_VAR) {
        Ok(raw) if !raw.trim().is_empty() => parse_tz(TIMEZONE_VAR, raw.trim())?,
        _ => Tz::UTC,
    };
    let organizations = match std::env::var(ORG_TIMEZONES_VAR) {
        Ok(raw) => parse_org_timezones(&raw)?,
        Err(_) => HashMap::new(),
    };
    debug!(
        default = %default,
        organizations = organizations.len(),
        "loaded timezone policy"
    );
    Ok(WardsConfig {
        timezones: TimezonePolicy {
            default,
            organizations,
        },
    })
}

fn parse_tz(var: &'static str, value: &str) -> Result<Tz, ConfigError> {
    value.parse::<Tz>().map_err(|_| ConfigError::InvalidTimezone {
        var,
        value: value.to_string(),
    })
}

/// Accepts either a JSON object (`{"org-a": "Europe/Berlin"}`) or the compact
/// form `org-a=Europe/Berlin,org-b=UTC`.
pub fn parse_org_timezones(raw: &str) -> Result<HashMap<OrganizationId, Tz>, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(HashMap::new());
    }

    if raw.starts_with('{') {
        let map: HashMap<String, String> =
            serde_json::from_str(raw).map_err(|e| ConfigError::MalformedJson {
                var: ORG_TIMEZONES_VAR,
                message: e.to_string(),
            })?;
        return map
            .into_iter()
            .map(|(org, tz)| Ok((OrganizationId::from(org), parse_tz(ORG_TIMEZONES_VAR, tz.trim())?)))
            .collect();
    }

    let mut zones = HashMap::new();
    for (idx, entry) in raw.split(',').enumerate() {
        let e = entry.trim();
        if e.is_empty() {
            continue;
        }
        let malformed = |message: &str| ConfigError::MalformedEntry {
            var: ORG_TIMEZONES_VAR,
            index: idx + 1,
            message: message.to_string(),
        };
        let mut parts = e.split('=');
        let org = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("missing organization before '='"))?;
        let tz = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("missing timezone after '='"))?;
        if parts.next().is_some() {
            return Err(malformed("has extra '=' characters"));
        }
        zones.insert(OrganizationId::from(org), parse_tz(ORG_TIMEZONES_VAR, tz)?);
    }
    Ok(zones)
}
