//! Bind credential for a directory session.

use chrono::{DateTime, Utc};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{DirectoryError, ErrorKind, Result};

/// A bind secret that zeroizes its memory on drop and never appears in
/// `Debug` output or logs.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret for the bind call itself.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Overwrite the secret in place.
    pub fn wipe(&mut self) {
        self.0.zeroize();
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(****)")
    }
}

/// Connection identity and parameters for one directory session.
///
/// The session is the only mutator of the status fields; it records bind
/// success or failure and wipes the secret on teardown.
#[derive(Debug, Clone)]
pub struct Credential {
    pub domain: String,
    pub username: String,
    pub secret: Secret,
    pub use_tls: bool,
    pub port: u16,
    pub authenticated: bool,
    pub last_auth_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Credential {
    pub fn new(
        domain: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
        use_tls: bool,
        port: u16,
    ) -> Self {
        Self {
            domain: domain.into(),
            username: username.into(),
            secret: Secret::new(secret),
            use_tls,
            port,
            authenticated: false,
            last_auth_time: None,
            last_error: None,
        }
    }

    /// Check the credential is well-formed before any connection attempt.
    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(DirectoryError::with_detail(
                ErrorKind::InvalidCredentials,
                "domain must not be empty",
            ));
        }
        if self.username.trim().is_empty() {
            return Err(DirectoryError::with_detail(
                ErrorKind::InvalidCredentials,
                "username must not be empty",
            ));
        }
        Ok(())
    }

    /// The identity string handed to the bind call. Usernames already in
    /// UPN or `DOMAIN\user` form are used verbatim; otherwise dotted
    /// domains produce a UPN and flat domains the legacy form.
    pub fn bind_principal(&self) -> String {
        if self.username.contains('@') || self.username.contains('\\') {
            self.username.clone()
        } else if self.domain.contains('.') {
            format!("{}@{}", self.username, self.domain)
        } else {
            format!("{}\\{}", self.domain, self.username)
        }
    }

    /// True when the domain is expressed as a bare IP address.
    pub fn domain_is_ip(&self) -> bool {
        self.domain.parse::<std::net::IpAddr>().is_ok()
    }
}
