//! `userAccountControl` bit-flag decoding.
//!
//! A single integer where each bit encodes an independent account setting.
//! The named table below is fixed; bits outside it are reported as custom
//! settings rather than guessed at.

/// Logon script runs.
pub const SCRIPT: u32 = 0x0001;
/// Account is disabled.
pub const ACCOUNT_DISABLE: u32 = 0x0002;
/// Home directory is required.
pub const HOMEDIR_REQUIRED: u32 = 0x0008;
/// Account is locked out.
pub const LOCKOUT: u32 = 0x0010;
/// No password is required.
pub const PASSWD_NOTREQD: u32 = 0x0020;
/// The user cannot change the password.
pub const PASSWD_CANT_CHANGE: u32 = 0x0040;
/// Reversibly encrypted password storage is allowed.
pub const ENCRYPTED_TEXT_PWD_ALLOWED: u32 = 0x0080;
/// Duplicate (local user) account.
pub const TEMP_DUPLICATE_ACCOUNT: u32 = 0x0100;
/// Default account type for a user.
pub const NORMAL_ACCOUNT: u32 = 0x0200;
/// Trust account for a domain trust.
pub const INTERDOMAIN_TRUST_ACCOUNT: u32 = 0x0800;
/// Computer account for a workstation or member server.
pub const WORKSTATION_TRUST_ACCOUNT: u32 = 0x1000;
/// Computer account for a domain controller.
pub const SERVER_TRUST_ACCOUNT: u32 = 0x2000;
/// The password never expires.
pub const DONT_EXPIRE_PASSWORD: u32 = 0x1_0000;
/// MNS logon account.
pub const MNS_LOGON_ACCOUNT: u32 = 0x2_0000;
/// A smart card is required for logon.
pub const SMARTCARD_REQUIRED: u32 = 0x4_0000;
/// Service account trusted for Kerberos delegation.
pub const TRUSTED_FOR_DELEGATION: u32 = 0x8_0000;
/// Security context is never delegated.
pub const NOT_DELEGATED: u32 = 0x10_0000;
/// Restricted to DES encryption keys.
pub const USE_DES_KEY_ONLY: u32 = 0x20_0000;
/// Kerberos pre-authentication is not required.
pub const DONT_REQ_PREAUTH: u32 = 0x40_0000;
/// The password has expired.
pub const PASSWORD_EXPIRED: u32 = 0x80_0000;
/// Trusted to authenticate for delegation (protocol transition).
pub const TRUSTED_TO_AUTH_FOR_DELEGATION: u32 = 0x100_0000;
/// Read-only domain controller (partial secrets) account.
pub const PARTIAL_SECRETS_ACCOUNT: u32 = 0x400_0000;

/// The fixed name ↔ bit table, ascending by bit value.
pub const FLAGS: &[(&str, u32)] = &[
    ("SCRIPT", SCRIPT),
    ("ACCOUNTDISABLE", ACCOUNT_DISABLE),
    ("HOMEDIR_REQUIRED", HOMEDIR_REQUIRED),
    ("LOCKOUT", LOCKOUT),
    ("PASSWD_NOTREQD", PASSWD_NOTREQD),
    ("PASSWD_CANT_CHANGE", PASSWD_CANT_CHANGE),
    ("ENCRYPTED_TEXT_PWD_ALLOWED", ENCRYPTED_TEXT_PWD_ALLOWED),
    ("TEMP_DUPLICATE_ACCOUNT", TEMP_DUPLICATE_ACCOUNT),
    ("NORMAL_ACCOUNT", NORMAL_ACCOUNT),
    ("INTERDOMAIN_TRUST_ACCOUNT", INTERDOMAIN_TRUST_ACCOUNT),
    ("WORKSTATION_TRUST_ACCOUNT", WORKSTATION_TRUST_ACCOUNT),
    ("SERVER_TRUST_ACCOUNT", SERVER_TRUST_ACCOUNT),
    ("DONT_EXPIRE_PASSWORD", DONT_EXPIRE_PASSWORD),
    ("MNS_LOGON_ACCOUNT", MNS_LOGON_ACCOUNT),
    ("SMARTCARD_REQUIRED", SMARTCARD_REQUIRED),
    ("TRUSTED_FOR_DELEGATION", TRUSTED_FOR_DELEGATION),
    ("NOT_DELEGATED", NOT_DELEGATED),
    ("USE_DES_KEY_ONLY", USE_DES_KEY_ONLY),
    ("DONT_REQ_PREAUTH", DONT_REQ_PREAUTH),
    ("PASSWORD_EXPIRED", PASSWORD_EXPIRED),
    (
        "TRUSTED_TO_AUTH_FOR_DELEGATION",
        TRUSTED_TO_AUTH_FOR_DELEGATION,
    ),
    ("PARTIAL_SECRETS_ACCOUNT", PARTIAL_SECRETS_ACCOUNT),
];

/// One set bit, rendered for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagBreakdown {
    pub name: &'static str,
    pub bit: u32,
}

impl FlagBreakdown {
    /// Hex + decimal rendering, e.g. `DONT_EXPIRE_PASSWORD (0x10000 / 65536)`.
    pub fn render(&self) -> String {
        format!("{} (0x{:X} / {})", self.name, self.bit, self.bit)
    }
}

/// Names of the known bits set in `value`, in table order.
pub fn active_flags(value: u32) -> Vec<&'static str> {
    FLAGS
        .iter()
        .filter(|(_, bit)| value & bit != 0)
        .map(|(name, _)| *name)
        .collect()
}

/// Per-flag breakdown of the known bits set in `value`.
pub fn breakdown(value: u32) -> Vec<FlagBreakdown> {
    FLAGS
        .iter()
        .filter(|(_, bit)| value & bit != 0)
        .map(|(name, bit)| FlagBreakdown { name, bit: *bit })
        .collect()
}

/// The subset of `value` covered by the named table.
pub fn mapped_bits(value: u32) -> u32 {
    FLAGS.iter().fold(0, |acc, (_, bit)| acc | (value & bit))
}

/// Human-readable one-line description of a `userAccountControl` value.
pub fn describe(value: u32) -> String {
    if value == 0 {
        return "no settings".to_string();
    }
    let names = active_flags(value);
    if names.is_empty() {
        return format!("custom settings (value={value})");
    }
    let unmapped = value & !mapped_bits(value);
    if unmapped != 0 {
        format!("{} +unmapped(0x{unmapped:X})", names.join(", "))
    } else {
        names.join(", ")
    }
}

pub fn is_enabled(value: u32) -> bool {
    value & ACCOUNT_DISABLE == 0
}

pub fn password_never_expires(value: u32) -> bool {
    value & DONT_EXPIRE_PASSWORD != 0
}

pub fn cannot_change_password(value: u32) -> bool {
    value & PASSWD_CANT_CHANGE != 0
}

pub fn smartcard_required(value: u32) -> bool {
    value & SMARTCARD_REQUIRED != 0
}
