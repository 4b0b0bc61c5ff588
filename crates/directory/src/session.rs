//! Authenticated directory session: connect, resolve, query, disconnect.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ldap3::{ldap_escape, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, info, warn};
use warden_core::config::DirectoryConfig;

use crate::backend::{DirectoryBackend, LdapBackend};
use crate::classify;
use crate::codec::{cn_from_dn, decode_filetime, decode_flags, first_attr, optional_attr};
use crate::credential::Credential;
use crate::error::{DirectoryError, ErrorKind, Result};
use crate::models::{GroupMember, MemberKind, UserSummary};
use crate::policy::DomainPasswordPolicy;
use crate::uac;

/// Attribute projection loaded for a single-user lookup. Kept explicit so a
/// schema change cannot silently widen what the console reads.
pub const USER_ATTRS: &[&str] = &[
    "sAMAccountName",
    "displayName",
    "distinguishedName",
    "mail",
    "userAccountControl",
    "pwdLastSet",
    "lockoutTime",
    "badPwdCount",
    "logonCount",
    "accountExpires",
    "msDS-UserPasswordExpiryTimeComputed",
    "memberOf",
    "whenCreated",
    "whenChanged",
    "lastLogonTimestamp",
];

const SEARCH_ATTRS: &[&str] = &[
    "sAMAccountName",
    "displayName",
    "mail",
    "distinguishedName",
    "userAccountControl",
];

const MEMBER_ATTRS: &[&str] = &[
    "sAMAccountName",
    "displayName",
    "mail",
    "objectClass",
    "userAccountControl",
];

const ROOTDSE_ATTRS: &[&str] = &["defaultNamingContext", "dnsHostName", "serverName"];

/// Raw result of a single-user query, before state resolution.
#[derive(Debug, Clone)]
pub struct RawAccount {
    pub entry: SearchEntry,
}

impl RawAccount {
    pub fn account_name(&self) -> String {
        first_attr(&self.entry, "sAMAccountName")
    }

    pub fn dn(&self) -> &str {
        &self.entry.dn
    }

    pub fn uac(&self) -> u32 {
        decode_flags(&first_attr(&self.entry, "userAccountControl"))
    }

    pub fn is_enabled(&self) -> bool {
        uac::is_enabled(self.uac())
    }

    /// Locked means a real (nonzero) lockoutTime is present.
    pub fn is_locked(&self) -> bool {
        decode_filetime(&first_attr(&self.entry, "lockoutTime")).is_some()
    }

    pub fn pwd_last_set_raw(&self) -> Option<String> {
        optional_attr(&self.entry, "pwdLastSet")
    }
}

/// One authenticated connection to a directory server.
///
/// Owns the bind exclusively; queries and management operations are only
/// valid while connected. Management operations additionally take the
/// single in-flight guard (see [`DirectorySession::begin_operation`]).
pub struct DirectorySession {
    pub(crate) backend: Box<dyn DirectoryBackend>,
    pub(crate) credential: Credential,
    pub(crate) base_dn: String,
    pub(crate) server_name: String,
    pub(crate) connected: bool,
    pub(crate) policy_cache: Option<DomainPasswordPolicy>,
    pub(crate) op_in_flight: Arc<AtomicBool>,
}

impl DirectorySession {
    /// Bind to the directory and eagerly validate the connection.
    ///
    /// The rootDSE read immediately after the bind forces connection and
    /// credential errors to surface here instead of on the first query; it
    /// also supplies the naming context and the responding server's name.
    pub async fn connect(mut credential: Credential, config: &DirectoryConfig) -> Result<Self> {
        credential.validate()?;

        let host = config
            .server
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| credential.domain.clone());
        let scheme = if credential.use_tls { "ldaps" } else { "ldap" };
        let url = format!("{scheme}://{host}:{}", credential.port);

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.timeout_secs))
            .set_no_tls_verify(!config.tls_verify);

        debug!(url = %url, "connecting to directory");
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| classify::classify_connect(&e))?;
        ldap3::drive!(conn);

        let principal = credential.bind_principal();
        ldap.simple_bind(&principal, credential.secret.expose())
            .await
            .and_then(|r| r.success())
            .map_err(|e| classify::classify_connect(&e))?;

        let mut backend = LdapBackend::new(ldap);
        let rootdse = backend
            .search(
                "",
                Scope::Base,
                "(objectClass=*)",
                ROOTDSE_ATTRS.iter().map(|s| s.to_string()).collect(),
            )
            .await
            .map_err(|e| classify::classify_connect(&e))?;
        let rootdse = rootdse.into_iter().next();

        let base_dn = rootdse
            .as_ref()
            .and_then(|e| optional_attr(e, "defaultNamingContext"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| domain_to_base_dn(&credential.domain));

        let server_name = resolve_server_name(
            rootdse.as_ref(),
            &host,
            credential.domain_is_ip(),
            std::env::var("LOGONSERVER").ok(),
            &credential.domain,
        );

        credential.authenticated = true;
        credential.last_auth_time = Some(Utc::now());
        credential.last_error = None;

        info!(server = %server_name, base_dn = %base_dn, user = %credential.username, "directory session established");

        Ok(Self {
            backend: Box::new(backend),
            credential,
            base_dn,
            server_name,
            connected: true,
            policy_cache: None,
            op_in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Release the bind. Idempotent; safe on a session that already
    /// disconnected. The credential secret is wiped here rather than
    /// waiting for drop.
    pub async fn disconnect(&mut self) {
        if self.connected {
            if let Err(e) = self.backend.unbind().await {
                debug!(error = %e, "unbind failed during disconnect");
            }
            self.connected = false;
        }
        self.credential.authenticated = false;
        self.credential.secret.wipe();
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Network name of the server that actually answered the bind, or the
    /// domain name when every resolution heuristic came up empty.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(DirectoryError::new(ErrorKind::NotConnected))
        }
    }

    pub(crate) fn record_failure(&mut self, err: &DirectoryError) {
        self.credential.last_error = Some(
            err.detail
                .clone()
                .unwrap_or_else(|| err.kind.summary().to_string()),
        );
    }

    /// Exact single-user lookup by account name. Zero matches is `None`,
    /// not an error.
    pub async fn find_user(&mut self, user_id: &str) -> Result<Option<RawAccount>> {
        self.ensure_connected()?;
        let filter = format!(
            "(&(objectClass=person)(objectClass=user)(sAMAccountName={}))",
            ldap_escape(user_id)
        );
        let base = self.base_dn.clone();
        let entries = self
            .search_logged(&base, Scope::Subtree, &filter, USER_ATTRS)
            .await?;
        Ok(entries.into_iter().next().map(|entry| RawAccount { entry }))
    }

    /// Substring search across account name, display name, mail, and CN.
    /// Results are capped at `max_results` and ordered by account name for
    /// determinism.
    pub async fn find_users(&mut self, term: &str, max_results: usize) -> Result<Vec<UserSummary>> {
        self.ensure_connected()?;
        let e = ldap_escape(term);
        let filter = format!(
            "(&(objectClass=person)(objectClass=user)(|(sAMAccountName=*{e}*)(displayName=*{e}*)(mail=*{e}*)(cn=*{e}*)))"
        );
        let base = self.base_dn.clone();
        let entries = self
            .search_logged(&base, Scope::Subtree, &filter, SEARCH_ATTRS)
            .await?;

        let mut users: Vec<UserSummary> = entries
            .iter()
            .map(|entry| UserSummary {
                account_name: first_attr(entry, "sAMAccountName"),
                display_name: first_attr(entry, "displayName"),
                email: optional_attr(entry, "mail"),
                distinguished_name: entry.dn.clone(),
                enabled: uac::is_enabled(decode_flags(&first_attr(entry, "userAccountControl"))),
            })
            .collect();
        users.sort_by(|a, b| a.account_name.cmp(&b.account_name));
        users.truncate(max_results);
        Ok(users)
    }

    /// Enumerate the direct members of a group.
    ///
    /// The group is resolved through three identity strategies in order —
    /// exact CN, account-name form, synthesized DN — stopping at the first
    /// hit. An unresolvable group yields an empty list, not an error, the
    /// same way a missing user yields `None`.
    pub async fn find_group_members(&mut self, group_name: &str) -> Result<Vec<GroupMember>> {
        self.ensure_connected()?;
        let base = self.base_dn.clone();
        let e = ldap_escape(group_name);

        let mut group: Option<SearchEntry> = None;
        for filter in [
            format!("(&(objectClass=group)(cn={e}))"),
            format!("(&(objectClass=group)(sAMAccountName={e}))"),
        ] {
            let entries = self
                .search_logged(&base, Scope::Subtree, &filter, &["member", "cn"])
                .await?;
            if let Some(entry) = entries.into_iter().next() {
                group = Some(entry);
                break;
            }
        }

        if group.is_none() {
            let dn = format!("CN={},{}", ldap3::dn_escape(group_name), base);
            match self
                .search_logged(&dn, Scope::Base, "(objectClass=group)", &["member", "cn"])
                .await
            {
                Ok(entries) => group = entries.into_iter().next(),
                // A nonexistent DN is reported as noSuchObject; that's the
                // strategy failing, not the query.
                Err(err) if err.kind == ErrorKind::ObjectNotFound => {}
                Err(err) => return Err(err),
            }
        }

        let Some(group) = group else {
            warn!(group = group_name, "group did not resolve under any identity form");
            return Ok(vec![]);
        };

        let member_dns = group.attrs.get("member").cloned().unwrap_or_default();
        let mut members = Vec::with_capacity(member_dns.len());
        for dn in &member_dns {
            match self
                .search_logged(dn, Scope::Base, "(objectClass=*)", MEMBER_ATTRS)
                .await
            {
                Ok(entries) => {
                    if let Some(entry) = entries.into_iter().next() {
                        members.push(member_from_entry(entry));
                    }
                }
                Err(err) => {
                    // One unreadable member must not hide the rest.
                    warn!(member = %dn, error = %err, "skipping unreadable group member");
                }
            }
        }
        Ok(members)
    }

    async fn search_logged(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<SearchEntry>> {
        let result = self
            .backend
            .search(
                base,
                scope,
                filter,
                attrs.iter().map(|s| s.to_string()).collect(),
            )
            .await
            .map_err(|e| classify::classify_query(&e));
        if let Err(ref err) = result {
            self.record_failure(err);
        }
        result
    }

    #[cfg(test)]
    pub(crate) fn for_tests(backend: crate::backend::testutil::ScriptedBackend) -> Self {
        Self {
            backend: Box::new(backend),
            credential: Credential::new("example.com", "admin", "secret", true, 636),
            base_dn: "DC=example,DC=com".into(),
            server_name: "dc01.example.com".into(),
            connected: true,
            policy_cache: None,
            op_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }
}

fn member_from_entry(entry: SearchEntry) -> GroupMember {
    let classes = entry
        .attrs
        .get("objectClass")
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|c| c.to_lowercase())
        .collect::<Vec<_>>();

    let kind = if classes.iter().any(|c| c == "group") {
        MemberKind::Group
    } else if classes.iter().any(|c| c == "user" || c == "person") {
        MemberKind::User
    } else {
        MemberKind::Other
    };

    let enabled = match kind {
        MemberKind::User => Some(uac::is_enabled(decode_flags(&first_attr(
            &entry,
            "userAccountControl",
        )))),
        _ => None,
    };

    let display_name = {
        let name = first_attr(&entry, "displayName");
        if name.is_empty() {
            cn_from_dn(&entry.dn).unwrap_or_default()
        } else {
            name
        }
    };

    GroupMember {
        display_name,
        account_name: first_attr(&entry, "sAMAccountName"),
        kind,
        email: optional_attr(&entry, "mail"),
        enabled,
        distinguished_name: entry.dn,
    }
}

/// Derive a `DC=`-joined base DN from a DNS or flat domain name. Used only
/// when the rootDSE did not supply a naming context.
pub fn domain_to_base_dn(domain: &str) -> String {
    domain
        .split('.')
        .filter(|p| !p.is_empty())
        .map(|p| format!("DC={p}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Resolve the responding server's network name.
///
/// Heuristics are tried strictly in order and each one only when the
/// previous produced nothing; exhausting all of them degrades to the domain
/// name and is never a failure.
fn resolve_server_name(
    rootdse: Option<&SearchEntry>,
    dialed_host: &str,
    domain_is_ip: bool,
    logon_server_env: Option<String>,
    domain: &str,
) -> String {
    if let Some(entry) = rootdse {
        if let Some(host) = optional_attr(entry, "dnsHostName").filter(|s| !s.is_empty()) {
            return host;
        }
        if let Some(name) = optional_attr(entry, "serverName")
            .as_deref()
            .and_then(cn_from_dn)
            .filter(|s| !s.is_empty())
        {
            return name;
        }
    }
    if !dialed_host.is_empty() {
        return dialed_host.to_string();
    }
    if !domain_is_ip {
        if let Some(name) = logon_server_env
            .map(|s| s.trim_start_matches('\\').to_string())
            .filter(|s| !s.is_empty())
        {
            return name;
        }
    }
    domain.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testutil::{entry, ScriptedBackend};

    fn user_entry(sam: &str, uac: &str) -> SearchEntry {
        entry(
            &format!("CN={sam},OU=Staff,DC=example,DC=com"),
            vec![
                ("sAMAccountName", vec![sam]),
                ("displayName", vec![sam]),
                ("userAccountControl", vec![uac]),
            ],
        )
    }

    #[test]
    fn base_dn_from_domain() {
        assert_eq!(domain_to_base_dn("example.com"), "DC=example,DC=com");
        assert_eq!(
            domain_to_base_dn("corp.example.co.uk"),
            "DC=corp,DC=example,DC=co,DC=uk"
        );
        assert_eq!(domain_to_base_dn("EXAMPLE"), "DC=EXAMPLE");
    }

    #[test]
    fn server_resolution_prefers_dns_host_name() {
        let dse = entry(
            "",
            vec![
                ("dnsHostName", vec!["dc01.example.com"]),
                ("serverName", vec!["CN=DC02,CN=Servers,CN=Site,DC=example,DC=com"]),
            ],
        );
        let name = resolve_server_name(Some(&dse), "example.com", false, None, "example.com");
        assert_eq!(name, "dc01.example.com");
    }

    #[test]
    fn server_resolution_falls_back_to_server_name_rdn() {
        let dse = entry(
            "",
            vec![("serverName", vec!["CN=DC02,CN=Servers,CN=Site,DC=example,DC=com"])],
        );
        let name = resolve_server_name(Some(&dse), "example.com", false, None, "example.com");
        assert_eq!(name, "DC02");
    }

    #[test]
    fn server_resolution_uses_dialed_host_then_env() {
        let name = resolve_server_name(None, "10.0.0.5", false, None, "example.com");
        assert_eq!(name, "10.0.0.5");

        let name = resolve_server_name(None, "", false, Some("\\\\DC03".into()), "example.com");
        assert_eq!(name, "DC03");
    }

    #[test]
    fn server_resolution_skips_env_for_ip_domain() {
        let name = resolve_server_name(None, "", true, Some("\\\\DC03".into()), "192.168.1.10");
        assert_eq!(name, "192.168.1.10");
    }

    #[test]
    fn server_resolution_degrades_to_domain() {
        let name = resolve_server_name(None, "", false, None, "example.com");
        assert_eq!(name, "example.com");
    }

    #[tokio::test]
    async fn find_user_none_on_zero_matches() {
        let mut session = DirectorySession::for_tests(ScriptedBackend::answering(vec![Ok(vec![])]));
        let result = session.find_user("ghost").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn find_user_builds_exact_escaped_filter() {
        let backend = ScriptedBackend::default();
        let mut session = DirectorySession::for_tests(backend.clone());
        session.find_user("j*doe").await.unwrap();
        let log = backend.log();
        let (base, filter) = &log.searches[0];
        assert_eq!(base, "DC=example,DC=com");
        assert_eq!(
            filter,
            "(&(objectClass=person)(objectClass=user)(sAMAccountName=j\\2adoe))"
        );
    }

    #[tokio::test]
    async fn queries_require_connection() {
        let mut session = DirectorySession::for_tests(ScriptedBackend::default());
        session.connected = false;
        let err = session.find_user("jdoe").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotConnected);
        let err = session.find_users("j", 10).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotConnected);
        let err = session.find_group_members("Staff").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn find_users_sorts_and_caps() {
        let backend = ScriptedBackend::answering(vec![Ok(vec![
            user_entry("zora", "512"),
            user_entry("adam", "514"),
            user_entry("mike", "512"),
        ])]);
        let mut session = DirectorySession::for_tests(backend);
        let users = session.find_users("a", 2).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].account_name, "adam");
        assert!(!users[0].enabled);
        assert_eq!(users[1].account_name, "mike");
    }

    #[tokio::test]
    async fn group_resolution_falls_through_to_dn_form() {
        let group = entry(
            "CN=Helpdesk,DC=example,DC=com",
            vec![
                ("cn", vec!["Helpdesk"]),
                (
                    "member",
                    vec![
                        "CN=John Doe,OU=Staff,DC=example,DC=com",
                        "CN=Ops,OU=Groups,DC=example,DC=com",
                    ],
                ),
            ],
        );
        let john = entry(
            "CN=John Doe,OU=Staff,DC=example,DC=com",
            vec![
                ("sAMAccountName", vec!["jdoe"]),
                ("displayName", vec!["John Doe"]),
                ("objectClass", vec!["top", "person", "user"]),
                ("userAccountControl", vec!["512"]),
            ],
        );
        let ops = entry(
            "CN=Ops,OU=Groups,DC=example,DC=com",
            vec![
                ("sAMAccountName", vec!["ops"]),
                ("objectClass", vec!["top", "group"]),
            ],
        );

        // cn strategy: empty; sAMAccountName strategy: empty; DN strategy hits
        let backend = ScriptedBackend::answering(vec![
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![group]),
            Ok(vec![john]),
            Ok(vec![ops]),
        ]);
        let mut session = DirectorySession::for_tests(backend.clone());
        let members = session.find_group_members("Helpdesk").await.unwrap();

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].account_name, "jdoe");
        assert_eq!(members[0].kind, MemberKind::User);
        assert_eq!(members[0].enabled, Some(true));
        assert_eq!(members[1].kind, MemberKind::Group);
        assert_eq!(members[1].enabled, None);

        let log = backend.log();
        assert_eq!(log.searches[0].1, "(&(objectClass=group)(cn=Helpdesk))");
        assert_eq!(
            log.searches[1].1,
            "(&(objectClass=group)(sAMAccountName=Helpdesk))"
        );
        assert_eq!(log.searches[2].0, "CN=Helpdesk,DC=example,DC=com");
    }

    #[tokio::test]
    async fn unresolvable_group_is_empty_not_error() {
        let backend = ScriptedBackend::answering(vec![Ok(vec![]), Ok(vec![]), Ok(vec![])]);
        let mut session = DirectorySession::for_tests(backend);
        let members = session.find_group_members("Ghosts").await.unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn unreadable_member_is_skipped() {
        let group = entry(
            "CN=Helpdesk,DC=example,DC=com",
            vec![(
                "member",
                vec![
                    "CN=Broken,DC=example,DC=com",
                    "CN=John Doe,OU=Staff,DC=example,DC=com",
                ],
            )],
        );
        let john = entry(
            "CN=John Doe,OU=Staff,DC=example,DC=com",
            vec![
                ("sAMAccountName", vec!["jdoe"]),
                ("objectClass", vec!["user"]),
            ],
        );
        let backend = ScriptedBackend::answering(vec![
            Ok(vec![group]),
            Err(ldap3::LdapError::from(std::io::Error::other(
                "weird transport hiccup",
            ))),
            Ok(vec![john]),
        ]);
        let mut session = DirectorySession::for_tests(backend);
        let members = session.find_group_members("Helpdesk").await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].account_name, "jdoe");
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_wipes_secret() {
        let backend = ScriptedBackend::default();
        let mut session = DirectorySession::for_tests(backend.clone());
        session.disconnect().await;
        session.disconnect().await;
        assert!(!session.is_connected());
        assert!(session.credential().secret.is_empty());
        assert!(!session.credential().authenticated);
        assert_eq!(backend.log().unbind_calls, 1);
    }

    #[tokio::test]
    async fn query_failure_is_recorded_on_credential() {
        let backend = ScriptedBackend::answering(vec![Err(ldap3::LdapError::from(
            std::io::Error::other("connection refused"),
        ))]);
        let mut session = DirectorySession::for_tests(backend);
        let err = session.find_user("jdoe").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServerUnavailable);
        assert!(session
            .credential()
            .last_error
            .as_deref()
            .unwrap()
            .contains("connection refused"));
    }
}
