//! Typed result models produced by the directory engine.

use chrono::{DateTime, Utc};

/// Resolved password state of an account, in strict priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordState {
    /// `DONT_EXPIRE_PASSWORD` is set on the account.
    NeverExpires,
    /// `pwdLastSet` is the literal sentinel `0`: an administrator forced a
    /// change at next logon.
    MustChangeAtNextLogon,
    /// `pwdLastSet` is the literal sentinel `-1`: expiry disabled for this
    /// account specifically.
    NeverExpiresBySentinel,
    /// The directory supplied a pre-computed expiry timestamp.
    ComputedExpiry,
    /// Expiry derived from `pwdLastSet` plus the domain maximum age.
    PolicyDerivedExpiry,
    /// No usable signal at all.
    Unknown,
}

/// Fully resolved snapshot of one account. Built fresh on every query and
/// never cached; re-query to observe changes.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub user_id: String,
    pub display_name: String,
    pub distinguished_name: String,
    pub email: Option<String>,
    /// Raw `userAccountControl` bit-flags.
    pub user_account_control: u32,
    pub enabled: bool,
    pub locked: bool,
    pub lockout_time: Option<DateTime<Utc>>,
    pub bad_password_count: u32,
    pub logon_count: u32,
    pub password_last_set: Option<DateTime<Utc>>,
    pub password_state: PasswordState,
    pub password_expiry_date: Option<DateTime<Utc>>,
    pub password_can_change_date: Option<DateTime<Utc>>,
    pub must_change_at_next_logon: bool,
    pub password_expired: bool,
    pub password_never_expires: bool,
    pub account_expires: Option<DateTime<Utc>>,
    /// Group names from `memberOf`, sorted and de-duplicated.
    pub group_memberships: Vec<String>,
}

/// One row of a user search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub account_name: String,
    pub display_name: String,
    pub email: Option<String>,
    pub distinguished_name: String,
    pub enabled: bool,
}

/// Classification of a group member by its runtime object class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    User,
    Group,
    Other,
}

/// One direct member of a group. Nested groups are not flattened.
#[derive(Debug, Clone)]
pub struct GroupMember {
    pub display_name: String,
    pub account_name: String,
    pub kind: MemberKind,
    pub email: Option<String>,
    /// Only meaningful for user members; `None` otherwise.
    pub enabled: Option<bool>,
    pub distinguished_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_kind_is_comparable() {
        assert_eq!(MemberKind::User, MemberKind::User);
        assert_ne!(MemberKind::User, MemberKind::Group);
    }

    #[test]
    fn snapshot_is_cloneable_and_debuggable() {
        let snap = AccountSnapshot {
            user_id: "jdoe".into(),
            display_name: "John Doe".into(),
            distinguished_name: "CN=John Doe,OU=Staff,DC=example,DC=com".into(),
            email: None,
            user_account_control: 512,
            enabled: true,
            locked: false,
            lockout_time: None,
            bad_password_count: 0,
            logon_count: 41,
            password_last_set: None,
            password_state: PasswordState::Unknown,
            password_expiry_date: None,
            password_can_change_date: None,
            must_change_at_next_logon: false,
            password_expired: false,
            password_never_expires: false,
            account_expires: None,
            group_memberships: vec!["Staff".into()],
        };
        let cloned = snap.clone();
        assert_eq!(cloned.user_id, "jdoe");
        assert!(format!("{snap:?}").contains("John Doe"));
    }
}
