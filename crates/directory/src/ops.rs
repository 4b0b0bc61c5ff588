//! Management operations: account unlock and password reset.
//!
//! These are the only write paths in the crate. A session runs at most one
//! management operation at a time; refusal checks run before the first
//! native write so a refused operation leaves the directory untouched.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ldap3::Mod;
use tracing::{info, warn};

use crate::classify;
use crate::error::{DirectoryError, ErrorKind, Result};
use crate::session::{DirectorySession, RawAccount};
use crate::uac;

/// How a successful password change was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Password replaced; the account was not locked.
    Changed,
    /// The account was locked out and was unlocked before the password
    /// was replaced.
    ChangedAndUnlocked,
}

impl fmt::Display for ChangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed => write!(f, "password changed"),
            Self::ChangedAndUnlocked => write!(f, "account unlocked and password changed"),
        }
    }
}

/// Releases the in-flight slot when the operation ends, on any path.
#[derive(Debug)]
pub(crate) struct OpGuard(Arc<AtomicBool>);

impl Drop for OpGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// AD rejects `unicodePwd` writes that are not the UTF-16LE bytes of the
/// quoted password.
fn encode_password(password: &str) -> Vec<u8> {
    format!("\"{password}\"")
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

fn replace(attr: &str, value: &[u8]) -> Mod<Vec<u8>> {
    Mod::Replace(attr.as_bytes().to_vec(), HashSet::from([value.to_vec()]))
}

impl DirectorySession {
    pub(crate) fn begin_operation(&self) -> Result<OpGuard> {
        match self
            .op_in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
        {
            Ok(_) => Ok(OpGuard(Arc::clone(&self.op_in_flight))),
            Err(_) => Err(DirectoryError::new(ErrorKind::OperationInProgress)),
        }
    }

    async fn require_user(&mut self, user_id: &str) -> Result<RawAccount> {
        self.find_user(user_id).await?.ok_or_else(|| {
            DirectoryError::with_detail(ErrorKind::UserNotFound, format!("no account '{user_id}'"))
        })
    }

    /// Clear an account lockout.
    ///
    /// Returns `Ok(false)` without writing when the account is not locked.
    /// A disabled account is refused; unlocking it would only invite
    /// another failed logon.
    pub async fn unlock(&mut self, user_id: &str) -> Result<bool> {
        self.ensure_connected()?;
        let _guard = self.begin_operation()?;

        let raw = self.require_user(user_id).await?;
        if !raw.is_enabled() {
            return Err(DirectoryError::with_detail(
                ErrorKind::AccountDisabled,
                format!("account '{user_id}' is disabled"),
            ));
        }
        if !raw.is_locked() {
            info!(user = user_id, "account is not locked; nothing to do");
            return Ok(false);
        }

        let dn = raw.dn().to_string();
        self.write_unlock(&dn).await?;
        info!(user = user_id, dn = %dn, "account unlocked");
        Ok(true)
    }

    /// Replace an account's password.
    ///
    /// A locked account is unlocked first; if that write fails the password
    /// write is not attempted. `force_change` additionally expires the new
    /// password so the user must change it at next logon.
    pub async fn change_password(
        &mut self,
        user_id: &str,
        new_password: &str,
        force_change: bool,
    ) -> Result<ChangeOutcome> {
        self.ensure_connected()?;
        let _guard = self.begin_operation()?;

        let raw = self.require_user(user_id).await?;
        if !raw.is_enabled() {
            return Err(DirectoryError::with_detail(
                ErrorKind::AccountDisabled,
                format!("account '{user_id}' is disabled"),
            ));
        }
        if uac::cannot_change_password(raw.uac()) {
            return Err(DirectoryError::with_detail(
                ErrorKind::PasswordChangeForbidden,
                format!("account '{user_id}' has PASSWD_CANT_CHANGE set"),
            ));
        }
        if !self.credential.use_tls {
            return Err(DirectoryError::with_detail(
                ErrorKind::OperationFailed,
                "password changes require an LDAPS connection",
            ));
        }

        let dn = raw.dn().to_string();
        let was_locked = raw.is_locked();
        if was_locked {
            self.write_unlock(&dn).await?;
            info!(user = user_id, "cleared lockout before password change");
        }

        let mut mods = vec![replace("unicodePwd", &encode_password(new_password))];
        if force_change {
            mods.push(replace("pwdLastSet", b"0"));
        }
        if let Err(e) = self.backend.modify(&dn, mods).await {
            let err = classify::map_operation_failure(&e);
            warn!(user = user_id, error = %err, "password change failed");
            self.record_failure(&err);
            return Err(err);
        }

        info!(user = user_id, forced = force_change, "password changed");
        Ok(if was_locked {
            ChangeOutcome::ChangedAndUnlocked
        } else {
            ChangeOutcome::Changed
        })
    }

    /// Whether [`unlock`](Self::unlock) would pass its refusal checks.
    /// Optimistic: the mutating call remains the real authority. An
    /// unresolvable user probes `false` rather than erroring.
    pub async fn can_unlock(&mut self, user_id: &str) -> Result<bool> {
        match self.find_user(user_id).await? {
            Some(raw) => Ok(raw.is_enabled()),
            None => Ok(false),
        }
    }

    /// Whether a password change would pass the refusal checks.
    pub async fn can_change_password(&mut self, user_id: &str) -> Result<bool> {
        match self.find_user(user_id).await? {
            Some(raw) => Ok(raw.is_enabled() && !uac::cannot_change_password(raw.uac())),
            None => Ok(false),
        }
    }

    async fn write_unlock(&mut self, dn: &str) -> Result<()> {
        if let Err(e) = self.backend.modify(dn, vec![replace("lockoutTime", b"0")]).await {
            let err = classify::map_operation_failure(&e);
            warn!(dn = %dn, error = %err, "lockout clear failed");
            self.record_failure(&err);
            return Err(err);
        }
        Ok(())
    }
}
