//! Top-level scope resolution facade.
//!
//! A [`ScopeResolver`] is compiled once from the full role catalog and then
//! shared read-only: `resolve` is pure, allocation-local, and safe to call
//! from any number of threads against the same snapshot.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::expand::{saturate, touches_assume, ASSUME_PREFIX};
use crate::set::ScopeSet;
use crate::trie::RoleTrie;

/// A role definition: identifier plus the scopes it grants directly.
///
/// The identifier may end in `*`, making the role match any
/// `assume:<stem>...` scope sharing its stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub role_id: String,
    pub scopes: Vec<String>,
}

impl Role {
    pub fn new(role_id: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            role_id: role_id.into(),
            scopes,
        }
    }
}

/// Compiled recognizer plus saturated role expansions.
pub struct ScopeResolver {
    index: HashMap<String, usize>,
    expanded: Vec<ScopeSet>,
    trie: RoleTrie,
    scope_sets: Vec<ScopeSet>,
}

impl ScopeResolver {
    /// Compiles the recognizer and saturates every role's grants.
    pub fn new(roles: &[Role]) -> Self {
        let patterns: Vec<String> = roles
            .iter()
            .map(|role| format!("{ASSUME_PREFIX}{}", role.role_id))
            .collect();
        let direct: Vec<ScopeSet> = roles
            .iter()
            .map(|role| ScopeSet::from_scopes(role.scopes.clone()))
            .collect();
        let trie = RoleTrie::build(&patterns);
        let (expanded, scope_sets) = saturate(&direct, &trie);
        let index = roles
            .iter()
            .enumerate()
            .map(|(idx, role)| (role.role_id.clone(), idx))
            .collect();
        Self {
            index,
            expanded,
            trie,
            scope_sets,
        }
    }

    /// A resolver over an empty catalog; resolves every input to itself.
    pub fn empty() -> Self {
        Self::new(&[])
    }

    /// Expands a set of held scopes into everything they grant.
    ///
    /// Every input scope that could name a role is run through the
    /// recognizer and the matched roles' closed grants are appended to the
    /// working set, which is scanned until exhausted; each distinct scope
    /// is evaluated at most once. The input scopes themselves are part of
    /// the result, so resolving `assume:R` always yields `assume:R`.
    pub fn resolve(&self, scopes: &[String]) -> ScopeSet {
        let mut work: Vec<String> = scopes.to_vec();
        let mut evaluated: HashSet<String> = HashSet::new();
        let mut i = 0;
        while i < work.len() {
            let scope = work[i].clone();
            i += 1;
            if !touches_assume(&scope) {
                continue;
            }
            if !evaluated.insert(scope.clone()) {
                continue;
            }
            let granted = &self.scope_sets[self.trie.execute(&scope)];
            work.extend(granted.iter().map(str::to_string));
        }
        ScopeSet::from_scopes(work)
    }

    /// The closed scope set of one role, if it exists in the catalog.
    pub fn expanded_scopes(&self, role_id: &str) -> Option<&ScopeSet> {
        self.index.get(role_id).map(|&idx| &self.expanded[idx])
    }

    pub fn role_count(&self) -> usize {
        self.index.len()
    }
}

impl Default for ScopeResolver {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(defs: &[(&str, &[&str])]) -> Vec<Role> {
        defs.iter()
            .map(|(id, scopes)| Role::new(*id, scopes.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    fn resolve(resolver: &ScopeResolver, scopes: &[&str]) -> Vec<String> {
        let held: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
        resolver.resolve(&held).into_vec()
    }

    #[test]
    fn plain_scopes_pass_through() {
        let resolver = ScopeResolver::new(&roles(&[("a", &["x"])]));
        assert_eq!(resolve(&resolver, &["queue:get", "b"]), vec!["b", "queue:get"]);
    }

    #[test]
    fn assuming_a_role_grants_its_scopes() {
        let resolver = ScopeResolver::new(&roles(&[("a", &["x"])]));
        assert_eq!(resolve(&resolver, &["assume:a"]), vec!["assume:a", "x"]);
    }

    #[test]
    fn unknown_role_resolves_to_input() {
        let resolver = ScopeResolver::new(&roles(&[("a", &["x"])]));
        assert_eq!(resolve(&resolver, &["assume:nope"]), vec!["assume:nope"]);
    }

    #[test]
    fn empty_catalog_returns_normalized_input() {
        let resolver = ScopeResolver::empty();
        assert_eq!(resolve(&resolver, &["b", "a*", "ab"]), vec!["a*", "b"]);
    }

    #[test]
    fn expansion_chases_granted_assume_scopes() {
        let resolver = ScopeResolver::new(&roles(&[
            ("front", &["assume:back"]),
            ("back", &["payload"]),
        ]));
        assert_eq!(
            resolve(&resolver, &["assume:front"]),
            vec!["assume:back", "assume:front", "payload"]
        );
    }

    #[test]
    fn resolve_is_idempotent() {
        let resolver = ScopeResolver::new(&roles(&[
            ("a", &["assume:b", "one"]),
            ("b", &["assume:a", "two"]),
            ("c*", &["three:*"]),
        ]));
        let once = resolver.resolve(&["assume:a".to_string(), "assume:cat".to_string()]);
        let twice = resolver.resolve(once.as_slice());
        assert_eq!(once, twice);
    }

    #[test]
    fn expanded_scopes_lookup() {
        let resolver = ScopeResolver::new(&roles(&[("a", &["assume:b"]), ("b", &["x"])]));
        let expanded = resolver.expanded_scopes("a").unwrap();
        assert!(expanded.contains("x"));
        assert!(resolver.expanded_scopes("missing").is_none());
        assert_eq!(resolver.role_count(), 2);
    }
}
