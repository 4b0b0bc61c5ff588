//! Warden Directory — account state and policy resolution against Active Directory.
//!
//! This crate owns the authenticated LDAP session, decodes raw directory
//! attributes into a typed account model, resolves effective password-expiry
//! dates from domain policy, and performs unlock / password-reset operations
//! with a closed error taxonomy.

pub mod account;
pub mod backend;
pub mod classify;
pub mod codec;
pub mod credential;
pub mod error;
pub mod models;
pub mod ops;
pub mod policy;
pub mod session;
pub mod uac;

pub use credential::Credential;
pub use error::{DirectoryError, ErrorKind};
pub use models::{AccountSnapshot, GroupMember, MemberKind, PasswordState, UserSummary};
pub use ops::ChangeOutcome;
pub use policy::DomainPasswordPolicy;
pub use session::DirectorySession;
