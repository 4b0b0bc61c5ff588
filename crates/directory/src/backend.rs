//! Transport seam between the session and the LDAP client.
//!
//! The session talks to a [`DirectoryBackend`] rather than to `ldap3`
//! directly so management-operation tests can count writes against a
//! scripted double.

use async_trait::async_trait;
use ldap3::{Ldap, LdapError, Mod, Scope, SearchEntry};

/// The three primitives the engine needs from the directory client.
#[async_trait]
pub trait DirectoryBackend: Send {
    async fn search(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: Vec<String>,
    ) -> Result<Vec<SearchEntry>, LdapError>;

    async fn modify(&mut self, dn: &str, mods: Vec<Mod<Vec<u8>>>) -> Result<(), LdapError>;

    async fn unbind(&mut self) -> Result<(), LdapError>;
}

/// Production backend over a live `ldap3` handle.
pub struct LdapBackend {
    ldap: Ldap,
}

impl LdapBackend {
    pub fn new(ldap: Ldap) -> Self {
        Self { ldap }
    }
}

#[async_trait]
impl DirectoryBackend for LdapBackend {
    async fn search(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: Vec<String>,
    ) -> Result<Vec<SearchEntry>, LdapError> {
        let (entries, _res) = self
            .ldap
            .search(base, scope, filter, attrs)
            .await?
            .success()?;
        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }

    async fn modify(&mut self, dn: &str, mods: Vec<Mod<Vec<u8>>>) -> Result<(), LdapError> {
        self.ldap.modify(dn, mods).await?.success()?;
        Ok(())
    }

    async fn unbind(&mut self) -> Result<(), LdapError> {
        self.ldap.unbind().await
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Scripted backend double for session, policy, and operation tests.
    //!
    //! The double and the test share state through a handle, so a test can
    //! keep inspecting the call log after the session has taken ownership
    //! of the backend.

    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex, MutexGuard};

    use super::*;

    /// Build a `SearchEntry` from attribute name → values pairs.
    pub(crate) fn entry(dn: &str, attrs: Vec<(&str, Vec<&str>)>) -> SearchEntry {
        SearchEntry {
            dn: dn.into(),
            attrs: attrs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
                .collect(),
            bin_attrs: HashMap::new(),
        }
    }

    #[derive(Default)]
    pub(crate) struct ScriptState {
        /// Queued answers, consumed per search call; an empty queue
        /// answers with an empty result set.
        pub search_results: VecDeque<Result<Vec<SearchEntry>, LdapError>>,
        /// Queued answers for modify calls; an empty queue answers Ok.
        pub modify_results: VecDeque<Result<(), LdapError>>,
        /// Log of (base, filter) per search.
        pub searches: Vec<(String, String)>,
        /// Log of (dn, mods) per modify — the write counter for tests.
        pub modifies: Vec<(String, Vec<Mod<Vec<u8>>>)>,
        pub unbind_calls: usize,
    }

    #[derive(Clone, Default)]
    pub(crate) struct ScriptedBackend {
        state: Arc<Mutex<ScriptState>>,
    }

    impl ScriptedBackend {
        pub fn answering(results: Vec<Result<Vec<SearchEntry>, LdapError>>) -> Self {
            let backend = Self::default();
            backend.state.lock().unwrap().search_results = results.into();
            backend
        }

        pub fn push_modify_result(&self, result: Result<(), LdapError>) {
            self.state.lock().unwrap().modify_results.push_back(result);
        }

        pub fn log(&self) -> MutexGuard<'_, ScriptState> {
            self.state.lock().unwrap()
        }
    }

    #[async_trait]
    impl DirectoryBackend for ScriptedBackend {
        async fn search(
            &mut self,
            base: &str,
            _scope: Scope,
            filter: &str,
            _attrs: Vec<String>,
        ) -> Result<Vec<SearchEntry>, LdapError> {
            let mut state = self.state.lock().unwrap();
            state.searches.push((base.to_string(), filter.to_string()));
            state.search_results.pop_front().unwrap_or_else(|| Ok(vec![]))
        }

        async fn modify(&mut self, dn: &str, mods: Vec<Mod<Vec<u8>>>) -> Result<(), LdapError> {
            let mut state = self.state.lock().unwrap();
            state.modifies.push((dn.to_string(), mods));
            state.modify_results.pop_front().unwrap_or(Ok(()))
        }

        async fn unbind(&mut self) -> Result<(), LdapError> {
            self.state.lock().unwrap().unbind_calls += 1;
            Ok(())
        }
    }
}
