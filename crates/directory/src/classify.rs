//! Mapping of native LDAP failures onto the stable error taxonomy.
//!
//! Classification order: explicit result-code table first (including the AD
//! bind sub-codes embedded in the diagnostic message), then case-insensitive
//! keyword scanning of the innermost cause, then `Unknown` with the original
//! message preserved verbatim.

use ldap3::LdapError;

use crate::error::{DirectoryError, ErrorKind};

/// Classify any LDAP client failure into the taxonomy.
pub fn classify(err: &LdapError) -> DirectoryError {
    let detail = err.to_string();
    let root = root_cause_message(err);

    if let LdapError::LdapResult { result } = err {
        if let Some(kind) = classify_rc(result.rc, &result.text) {
            return DirectoryError::with_detail(kind, detail).native_code(result.rc);
        }
        if let Some(kind) = classify_keywords(&result.text) {
            return DirectoryError::with_detail(kind, detail).native_code(result.rc);
        }
        return DirectoryError::with_detail(ErrorKind::Unknown, detail).native_code(result.rc);
    }

    match classify_keywords(&root) {
        Some(kind) => DirectoryError::with_detail(kind, detail),
        None => DirectoryError::with_detail(ErrorKind::Unknown, detail),
    }
}

/// Classify a failure observed while establishing a session. Anything the
/// table cannot pin down more precisely becomes `ConnectionFailed` so the
/// caller can still tell bind failure from a later query failure.
pub fn classify_connect(err: &LdapError) -> DirectoryError {
    let classified = classify(err);
    match classified.kind {
        ErrorKind::Unknown | ErrorKind::QueryFailed => DirectoryError {
            kind: ErrorKind::ConnectionFailed,
            ..classified
        },
        _ => classified,
    }
}

/// Classify a failure on an established session's read path.
pub fn classify_query(err: &LdapError) -> DirectoryError {
    let classified = classify(err);
    match classified.kind {
        ErrorKind::Unknown => DirectoryError {
            kind: ErrorKind::QueryFailed,
            ..classified
        },
        _ => classified,
    }
}

/// Re-map a classified failure for the management operations, which report
/// only `AccessDenied` / `DirectoryUnavailable` / `PasswordPolicyViolation`
/// / `OperationFailed` to their callers.
pub fn map_operation_failure(err: &LdapError) -> DirectoryError {
    let classified = classify(err);
    let kind = match classified.kind {
        ErrorKind::AccessDenied | ErrorKind::InvalidCredentials => ErrorKind::AccessDenied,
        ErrorKind::ServerUnavailable
        | ErrorKind::NetworkUnreachable
        | ErrorKind::Timeout
        | ErrorKind::DomainNotFound => ErrorKind::DirectoryUnavailable,
        ErrorKind::PasswordPolicyViolation => ErrorKind::PasswordPolicyViolation,
        _ => ErrorKind::OperationFailed,
    };
    DirectoryError { kind, ..classified }
}

/// Explicit result-code table. `text` is the server's diagnostic message,
/// which for AD binds carries a `data <sub-code>` marker.
fn classify_rc(rc: u32, text: &str) -> Option<ErrorKind> {
    match rc {
        // invalidCredentials: AD distinguishes the real cause in a sub-code
        49 => Some(classify_bind_subcode(text)),
        // constraintViolation: in this engine's mutation paths this is the
        // server rejecting a password against policy
        19 => Some(ErrorKind::PasswordPolicyViolation),
        32 => Some(ErrorKind::ObjectNotFound),
        50 => Some(ErrorKind::AccessDenied),
        51 | 52 | 81 => Some(ErrorKind::ServerUnavailable),
        // unwillingToPerform: policy rejection when the AD password-policy
        // status code is present, otherwise left for the keyword pass
        53 if text.contains("0000052D") || text.contains("0000052d") => {
            Some(ErrorKind::PasswordPolicyViolation)
        }
        85 => Some(ErrorKind::Timeout),
        _ => None,
    }
}

fn classify_bind_subcode(text: &str) -> ErrorKind {
    let lower = text.to_lowercase();
    for (marker, kind) in [
        ("525", ErrorKind::UserNotFound),
        ("52e", ErrorKind::InvalidCredentials),
        ("530", ErrorKind::AccessDenied),
        ("531", ErrorKind::AccessDenied),
        ("532", ErrorKind::PasswordExpired),
        ("533", ErrorKind::AccountDisabled),
        ("701", ErrorKind::AccountDisabled),
        ("773", ErrorKind::PasswordExpired),
        ("775", ErrorKind::AccountLockedOut),
    ] {
        if lower.contains(&format!("data {marker}")) {
            return kind;
        }
    }
    ErrorKind::InvalidCredentials
}

/// Keyword fallback over the deepest cause message.
fn classify_keywords(message: &str) -> Option<ErrorKind> {
    let m = message.to_lowercase();

    let password_context = m.contains("password") || m.contains("pwd");
    if password_context
        && (m.contains("policy")
            || m.contains("complexity")
            || m.contains("history")
            || m.contains("too short")
            || m.contains("constraint"))
    {
        return Some(ErrorKind::PasswordPolicyViolation);
    }

    if m.contains("invalid credentials") {
        return Some(ErrorKind::InvalidCredentials);
    }
    if m.contains("access denied")
        || m.contains("access is denied")
        || m.contains("insufficient")
        || m.contains("permission")
        || m.contains("privilege")
        || m.contains("not authorized")
    {
        return Some(ErrorKind::AccessDenied);
    }
    if m.contains("timed out") || m.contains("timeout") {
        return Some(ErrorKind::Timeout);
    }
    if m.contains("unreachable") || m.contains("no route to host") {
        return Some(ErrorKind::NetworkUnreachable);
    }
    if m.contains("connection refused")
        || m.contains("connection reset")
        || m.contains("server down")
        || m.contains("cannot contact")
        || m.contains("rpc server")
        || m.contains("broken pipe")
    {
        return Some(ErrorKind::ServerUnavailable);
    }
    if m.contains("no such domain")
        || m.contains("domain does not exist")
        || m.contains("name resolution")
        || m.contains("failed to lookup address")
        || m.contains("dns")
    {
        return Some(ErrorKind::DomainNotFound);
    }
    if m.contains("locked out") {
        return Some(ErrorKind::AccountLockedOut);
    }
    if m.contains("account is disabled") || m.contains("account disabled") {
        return Some(ErrorKind::AccountDisabled);
    }
    if m.contains("no such object") {
        return Some(ErrorKind::ObjectNotFound);
    }

    None
}

/// Walk the cause chain to the innermost error and return its message, so a
/// generic outer wrapper never shadows a specific root cause.
fn root_cause_message(err: &LdapError) -> String {
    let mut cause: &dyn std::error::Error = err;
    while let Some(inner) = cause.source() {
        cause = inner;
    }
    cause.to_string()
}
