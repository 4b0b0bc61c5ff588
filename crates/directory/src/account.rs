//! Account snapshot construction and the password-expiry state machine.
//!
//! Four independent directory signals can disagree about a password's
//! state: the `DONT_EXPIRE_PASSWORD` flag, the `pwdLastSet` sentinels, the
//! directory-computed expiry attribute, and the domain policy ages. The
//! resolution order below is strict; the first matching state wins.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::codec::{
    decode_account_expires, decode_filetime, decode_flags, first_attr, multi_values, optional_attr,
};
use crate::error::Result;
use crate::models::{AccountSnapshot, PasswordState};
use crate::policy::DomainPasswordPolicy;
use crate::session::{DirectorySession, RawAccount};
use crate::{codec, uac};

/// Resolve a raw query result into a full snapshot.
///
/// Total: unexpected attribute content degrades to
/// [`PasswordState::Unknown`] rather than failing. `now` is injected so
/// resolution is deterministic under test.
pub fn resolve_snapshot(
    raw: &RawAccount,
    policy: &DomainPasswordPolicy,
    now: DateTime<Utc>,
) -> AccountSnapshot {
    let entry = &raw.entry;
    let control = decode_flags(&first_attr(entry, "userAccountControl"));
    let lockout_time = decode_filetime(&first_attr(entry, "lockoutTime"));

    let pwd_last_set_raw = optional_attr(entry, "pwdLastSet");
    let password_last_set = pwd_last_set_raw.as_deref().and_then(decode_filetime);
    let computed_expiry = optional_attr(entry, "msDS-UserPasswordExpiryTimeComputed")
        .as_deref()
        .and_then(decode_account_expires);

    let (state, expiry, can_change, must_change, expired) = resolve_password_state(
        control,
        pwd_last_set_raw.as_deref(),
        password_last_set,
        computed_expiry,
        policy,
        now,
    );

    let mut groups: Vec<String> = multi_values(entry, "memberOf")
        .iter()
        .filter_map(|dn| codec::cn_from_dn(dn))
        .collect();
    groups.sort();
    groups.dedup();

    AccountSnapshot {
        user_id: first_attr(entry, "sAMAccountName"),
        display_name: first_attr(entry, "displayName"),
        distinguished_name: entry.dn.clone(),
        email: optional_attr(entry, "mail"),
        user_account_control: control,
        enabled: uac::is_enabled(control),
        locked: lockout_time.is_some(),
        lockout_time,
        bad_password_count: decode_flags(&first_attr(entry, "badPwdCount")),
        logon_count: decode_flags(&first_attr(entry, "logonCount")),
        password_last_set,
        password_state: state,
        password_expiry_date: expiry,
        password_can_change_date: can_change,
        must_change_at_next_logon: must_change,
        password_expired: expired,
        password_never_expires: uac::password_never_expires(control),
        account_expires: optional_attr(entry, "accountExpires")
            .as_deref()
            .and_then(decode_account_expires),
        group_memberships: groups,
    }
}

type StateTuple = (
    PasswordState,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    bool,
    bool,
);

fn resolve_password_state(
    control: u32,
    pwd_last_set_raw: Option<&str>,
    password_last_set: Option<DateTime<Utc>>,
    computed_expiry: Option<DateTime<Utc>>,
    policy: &DomainPasswordPolicy,
    now: DateTime<Utc>,
) -> StateTuple {
    let raw = pwd_last_set_raw.map(str::trim);

    // 1. The account-level flag overrides everything else.
    if uac::password_never_expires(control) {
        let can_change = password_last_set.map(|t| change_eligible_from(t, policy));
        return (PasswordState::NeverExpires, None, can_change, false, false);
    }

    // 2. pwdLastSet == 0: an administrator forced a change. The expiry
    // date is "now" for display only; the password is not treated as
    // having truly expired.
    if raw == Some("0") {
        return (
            PasswordState::MustChangeAtNextLogon,
            Some(now),
            Some(now),
            true,
            false,
        );
    }

    // 3. pwdLastSet == -1: expiry disabled for this account specifically.
    if raw == Some("-1") {
        return (
            PasswordState::NeverExpiresBySentinel,
            None,
            Some(now),
            false,
            false,
        );
    }

    // 4. A directory-computed expiry is authoritative when present.
    if let Some(expiry) = computed_expiry {
        let can_change = password_last_set.map(|t| change_eligible_from(t, policy));
        return (
            PasswordState::ComputedExpiry,
            Some(expiry),
            can_change,
            false,
            expiry <= now,
        );
    }

    // 5. Derive from pwdLastSet plus the domain maximum age.
    if let Some(set_at) = password_last_set {
        if policy.max_password_age_days > 0 {
            let expiry = set_at + Duration::days(policy.max_password_age_days);
            return (
                PasswordState::PolicyDerivedExpiry,
                Some(expiry),
                Some(change_eligible_from(set_at, policy)),
                false,
                expiry <= now,
            );
        }
    }

    // 6. No usable signal.
    if pwd_last_set_raw.is_some() && password_last_set.is_none() {
        warn!(raw = ?pwd_last_set_raw, "undecodable pwdLastSet; password state unknown");
    }
    (PasswordState::Unknown, None, None, false, false)
}

/// When the user becomes eligible to change the password. A zero minimum
/// age means eligible exactly at `password_last_set`, not at a recomputed
/// equivalent.
fn change_eligible_from(set_at: DateTime<Utc>, policy: &DomainPasswordPolicy) -> DateTime<Utc> {
    if policy.min_password_age_days == 0 {
        set_at
    } else {
        set_at + Duration::days(policy.min_password_age_days)
    }
}

/// Whether full resolution of this account needs the domain policy.
///
/// The sentinel states and the no-signal state never consult policy, so a
/// caller can skip the policy lookup for them.
pub(crate) fn needs_policy(raw: &RawAccount) -> bool {
    let pls = raw.pwd_last_set_raw();
    match pls.as_deref().map(str::trim) {
        Some("0") | Some("-1") => false,
        Some(other) => decode_filetime(other).is_some(),
        None => false,
    }
}

impl DirectorySession {
    /// Query one user and resolve the full snapshot, consulting the cached
    /// domain policy only for the states that need it.
    pub async fn account(&mut self, user_id: &str) -> Result<Option<AccountSnapshot>> {
        let Some(raw) = self.find_user(user_id).await? else {
            return Ok(None);
        };
        let now = Utc::now();
        let policy = if needs_policy(&raw) {
            self.policy().await?
        } else {
            DomainPasswordPolicy::degraded(&self.credential.domain, &self.server_name, now)
        };
        Ok(Some(resolve_snapshot(&raw, &policy, now)))
    }
}
