//! The closed error taxonomy surfaced by the directory engine.

use thiserror::Error;

/// Stable classification of every failure the engine can report.
///
/// Callers branch on the kind; they never need to inspect native LDAP
/// result codes directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotConnected,
    ConnectionFailed,
    QueryFailed,
    UserNotFound,
    AccountDisabled,
    AccountLockedOut,
    AccessDenied,
    InvalidCredentials,
    PasswordExpired,
    PasswordPolicyViolation,
    PasswordChangeForbidden,
    ObjectNotFound,
    ServerUnavailable,
    NetworkUnreachable,
    Timeout,
    DomainNotFound,
    DirectoryUnavailable,
    OperationInProgress,
    OperationFailed,
    Unknown,
}

impl ErrorKind {
    /// One stable, non-technical message per kind. A UI shows this line
    /// and offers the technical detail behind an affordance.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::NotConnected => "not connected to the directory",
            Self::ConnectionFailed => "could not connect to the directory",
            Self::QueryFailed => "the directory query failed",
            Self::UserNotFound => "no account matches that user",
            Self::AccountDisabled => "the account is disabled",
            Self::AccountLockedOut => "the account is locked out",
            Self::AccessDenied => "you do not have permission for this operation",
            Self::InvalidCredentials => "the supplied credentials were rejected",
            Self::PasswordExpired => "the password has expired",
            Self::PasswordPolicyViolation => "the new password does not meet the domain policy",
            Self::PasswordChangeForbidden => "this account is not allowed to change its password",
            Self::ObjectNotFound => "the directory object was not found",
            Self::ServerUnavailable => "the directory server is unavailable",
            Self::NetworkUnreachable => "the directory server could not be reached",
            Self::Timeout => "the directory did not respond in time",
            Self::DomainNotFound => "the domain could not be located",
            Self::DirectoryUnavailable => "the directory is currently unavailable",
            Self::OperationInProgress => "another management operation is already running",
            Self::OperationFailed => "the management operation failed",
            Self::Unknown => "an unexpected directory error occurred",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.summary())
    }
}

/// An engine failure: a taxonomy kind plus optional technical detail and
/// the native result code when one was observed.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct DirectoryError {
    pub kind: ErrorKind,
    pub detail: Option<String>,
    pub native_code: Option<u32>,
}

impl DirectoryError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            detail: None,
            native_code: None,
        }
    }

    pub fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
            native_code: None,
        }
    }

    pub fn native_code(mut self, code: u32) -> Self {
        self.native_code = Some(code);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A convenience Result alias that defaults to [`DirectoryError`].
pub type Result<T> = std::result::Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_stable_summary() {
        let err = DirectoryError::with_detail(ErrorKind::AccessDenied, "rc=50 insufficient rights");
        assert_eq!(
            err.to_string(),
            "you do not have permission for this operation"
        );
        assert_eq!(err.detail.as_deref(), Some("rc=50 insufficient rights"));
    }

    #[test]
    fn native_code_is_preserved() {
        let err = DirectoryError::new(ErrorKind::AccessDenied).native_code(50);
        assert_eq!(err.native_code, Some(50));
    }

    #[test]
    fn every_kind_has_a_nonempty_summary() {
        let kinds = [
            ErrorKind::NotConnected,
            ErrorKind::ConnectionFailed,
            ErrorKind::QueryFailed,
            ErrorKind::UserNotFound,
            ErrorKind::AccountDisabled,
            ErrorKind::AccountLockedOut,
            ErrorKind::AccessDenied,
            ErrorKind::InvalidCredentials,
            ErrorKind::PasswordExpired,
            ErrorKind::PasswordPolicyViolation,
            ErrorKind::PasswordChangeForbidden,
            ErrorKind::ObjectNotFound,
            ErrorKind::ServerUnavailable,
            ErrorKind::NetworkUnreachable,
            ErrorKind::Timeout,
            ErrorKind::DomainNotFound,
            ErrorKind::DirectoryUnavailable,
            ErrorKind::OperationInProgress,
            ErrorKind::OperationFailed,
            ErrorKind::Unknown,
        ];
        for kind in kinds {
            assert!(!kind.summary().is_empty());
        }
    }
}
