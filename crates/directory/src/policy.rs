//! Domain password policy retrieval, conversion, and per-session caching.

use chrono::{DateTime, Utc};
use ldap3::Scope;
use tracing::{debug, warn};

use crate::codec::{decode_flags, first_attr};
use crate::error::Result;
use crate::session::DirectorySession;

/// 100-nanosecond intervals per day.
const INTERVALS_PER_DAY: i64 = 864_000_000_000;
/// 100-nanosecond intervals per minute.
const INTERVALS_PER_MINUTE: i64 = 600_000_000;

const POLICY_ATTRS: &[&str] = &[
    "maxPwdAge",
    "minPwdAge",
    "minPwdLength",
    "pwdHistoryLength",
    "pwdProperties",
    "lockoutThreshold",
    "lockoutDuration",
    "lockOutObservationWindow",
];

/// `pwdProperties` bit for DOMAIN_PASSWORD_COMPLEX.
const PWD_PROPERTIES_COMPLEX: u32 = 0x1;

/// Domain-wide password and lockout rules, retrieved once per session.
///
/// An invalid policy (see [`is_valid`](Self::is_valid)) means "unknown, use
/// safe defaults" — never "no policy".
#[derive(Debug, Clone)]
pub struct DomainPasswordPolicy {
    pub domain_name: String,
    pub domain_controller: String,
    pub retrieved_at: DateTime<Utc>,
    pub max_password_age_days: i64,
    pub min_password_age_days: i64,
    pub min_password_length: u32,
    pub password_history_length: u32,
    pub complexity_required: bool,
    pub lockout_threshold: u32,
    pub lockout_duration_minutes: i64,
    pub lockout_observation_window_minutes: i64,
}

impl DomainPasswordPolicy {
    /// A policy with only identity fields populated, used when retrieval
    /// fails so callers always receive something usable.
    pub fn degraded(domain_name: &str, domain_controller: &str, now: DateTime<Utc>) -> Self {
        Self {
            domain_name: domain_name.to_string(),
            domain_controller: domain_controller.to_string(),
            retrieved_at: now,
            max_password_age_days: 0,
            min_password_age_days: 0,
            min_password_length: 0,
            password_history_length: 0,
            complexity_required: false,
            lockout_threshold: 0,
            lockout_duration_minutes: 0,
            lockout_observation_window_minutes: 0,
        }
    }

    /// At least one meaningful signal was retrieved.
    pub fn is_valid(&self) -> bool {
        self.max_password_age_days > 0 || self.min_password_length > 0
    }
}

/// Convert a stored 100ns duration attribute to whole days.
///
/// The directory stores these as negative intervals; a non-negative value
/// means no limit is enforced and converts to 0.
pub fn interval_to_days(raw: &str) -> i64 {
    interval_to_unit(raw, INTERVALS_PER_DAY)
}

/// Convert a stored 100ns duration attribute to whole minutes.
pub fn interval_to_minutes(raw: &str) -> i64 {
    interval_to_unit(raw, INTERVALS_PER_MINUTE)
}

fn interval_to_unit(raw: &str, unit: i64) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(v) if v < 0 => v.saturating_abs() / unit,
        _ => 0,
    }
}

impl DirectorySession {
    /// The domain password policy, retrieved on first call and cached for
    /// the lifetime of the session. Retrieval failure degrades to identity
    /// fields only — it never propagates.
    pub async fn policy(&mut self) -> Result<DomainPasswordPolicy> {
        self.ensure_connected()?;
        if let Some(cached) = &self.policy_cache {
            return Ok(cached.clone());
        }

        let domain = self.credential.domain.clone();
        let server = self.server_name.clone();
        let base = self.base_dn.clone();
        let now = Utc::now();

        let policy = match self
            .backend
            .search(
                &base,
                Scope::Base,
                "(objectClass=*)",
                POLICY_ATTRS.iter().map(|s| s.to_string()).collect(),
            )
            .await
        {
            Ok(entries) => match entries.into_iter().next() {
                Some(entry) => {
                    let policy = DomainPasswordPolicy {
                        domain_name: domain,
                        domain_controller: server,
                        retrieved_at: now,
                        max_password_age_days: interval_to_days(&first_attr(&entry, "maxPwdAge")),
                        min_password_age_days: interval_to_days(&first_attr(&entry, "minPwdAge")),
                        min_password_length: decode_flags(&first_attr(&entry, "minPwdLength")),
                        password_history_length: decode_flags(&first_attr(
                            &entry,
                            "pwdHistoryLength",
                        )),
                        complexity_required: decode_flags(&first_attr(&entry, "pwdProperties"))
                            & PWD_PROPERTIES_COMPLEX
                            != 0,
                        lockout_threshold: decode_flags(&first_attr(&entry, "lockoutThreshold")),
                        lockout_duration_minutes: interval_to_minutes(&first_attr(
                            &entry,
                            "lockoutDuration",
                        )),
                        lockout_observation_window_minutes: interval_to_minutes(&first_attr(
                            &entry,
                            "lockOutObservationWindow",
                        )),
                    };
                    debug!(
                        max_age_days = policy.max_password_age_days,
                        min_length = policy.min_password_length,
                        "domain password policy retrieved"
                    );
                    policy
                }
                None => {
                    warn!("domain root returned no policy entry; using degraded policy");
                    DomainPasswordPolicy::degraded(&domain, &server, now)
                }
            },
            Err(e) => {
                warn!(error = %e, "policy retrieval failed; using degraded policy");
                DomainPasswordPolicy::degraded(&domain, &server, now)
            }
        };

        self.policy_cache = Some(policy.clone());
        Ok(policy)
    }

    /// Drop the cached policy so the next [`policy`](Self::policy) call
    /// re-queries the directory.
    pub fn invalidate_policy(&mut self) {
        self.policy_cache = None;
    }
}
