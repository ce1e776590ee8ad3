//! Scope algebra: comparison, satisfaction, merging and normalization.
//!
//! A scope is a non-empty authorization string. A scope ending in `*` is a
//! prefix scope: it grants every scope that begins with its stem (the string
//! minus the trailing `*`). Scope sets are kept in a canonical normalized
//! form so that comparing and combining them stays linear.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Returns true if holding scope `a` grants scope `b`.
///
/// `a` satisfies `b` iff they are equal, or `a` is a prefix scope whose stem
/// is a prefix of `b`. The scope `*` therefore satisfies every scope, while
/// the empty string satisfies only itself.
pub fn satisfies(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match a.strip_suffix('*') {
        Some(stem) => b.starts_with(stem),
        None => false,
    }
}

/// Returns true if `scope` is a well-formed scope string: printable ASCII
/// only. The empty string is well-formed and matches only itself.
pub fn valid_scope(scope: &str) -> bool {
    scope.bytes().all(|byte| (0x20..=0x7e).contains(&byte))
}

/// Total order used for merging scope sets.
///
/// Deviates from the lexicographic order in exactly one way: a prefix scope
/// sorts immediately before the scopes it covers, so a single left-to-right
/// pass over a sorted set can drop every satisfied member by skipping while
/// the stem still matches.
pub fn scope_compare(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (n, m) = (a.len(), b.len());
    if n == m {
        if let Some(stem) = a.strip_suffix('*') {
            if b.starts_with(stem) {
                return Ordering::Less;
            }
        }
        if let Some(stem) = b.strip_suffix('*') {
            if a.starts_with(stem) {
                return Ordering::Greater;
            }
        }
    } else if n == m + 1 {
        if let Some(stem) = a.strip_suffix('*') {
            if stem == b {
                return Ordering::Less;
            }
        }
    } else if m == n + 1 {
        if let Some(stem) = b.strip_suffix('*') {
            if stem == a {
                return Ordering::Greater;
            }
        }
    }
    a.cmp(b)
}

/// Sorts and normalizes a list of scopes.
///
/// The result contains no duplicates and no scope satisfied by another
/// member, and is sorted by [`scope_compare`].
pub fn normalize_scopes(mut scopes: Vec<String>) -> Vec<String> {
    scopes.sort_by(|a, b| scope_compare(a, b));
    let mut kept: Vec<String> = Vec::with_capacity(scopes.len());
    for scope in scopes {
        match kept.last() {
            Some(last) if satisfies(last, &scope) => continue,
            _ => kept.push(scope),
        }
    }
    kept
}

/// Merges two sorted, normalized scope lists into one.
///
/// Two-cursor merge: emit the smaller head; whenever the emitted scope is a
/// prefix scope, advance both cursors past everything its stem covers.
/// Output is again sorted and normalized. O(|a| + |b|).
pub fn merge_scope_sets(a: &[String], b: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() || j < b.len() {
        let take_a = match (a.get(i), b.get(j)) {
            (Some(x), Some(y)) => scope_compare(x, y) != Ordering::Greater,
            (Some(_), None) => true,
            _ => false,
        };
        let scope = if take_a {
            i += 1;
            &a[i - 1]
        } else {
            j += 1;
            &b[j - 1]
        };
        if merged.last().is_some_and(|last| last == scope) {
            continue;
        }
        merged.push(scope.clone());
        if let Some(stem) = scope.strip_suffix('*') {
            while i < a.len() && a[i].starts_with(stem) {
                i += 1;
            }
            while j < b.len() && b[j].starts_with(stem) {
                j += 1;
            }
        }
    }
    merged
}

/// Scopes common to both sets: every member of one set satisfied by the
/// other, normalized.
pub fn scope_intersection(a: &ScopeSet, b: &ScopeSet) -> ScopeSet {
    let mut common: Vec<String> = Vec::new();
    common.extend(a.iter().filter(|s| b.satisfies_scope(s)).map(str::to_string));
    common.extend(b.iter().filter(|s| a.satisfies_scope(s)).map(str::to_string));
    ScopeSet::from_scopes(common)
}

/// A set of scopes maintained in canonical normalized form.
///
/// Invariant: the members are sorted by [`scope_compare`], contain no
/// duplicates, and no member satisfies another.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeSet {
    scopes: Vec<String>,
}

impl ScopeSet {
    /// The empty scope set.
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Builds a normalized set from arbitrary scopes.
    pub fn from_scopes(scopes: Vec<String>) -> Self {
        Self {
            scopes: normalize_scopes(scopes),
        }
    }

    /// Wraps a list already sorted and normalized by the caller.
    pub(crate) fn from_normalized(scopes: Vec<String>) -> Self {
        debug_assert!(scopes.windows(2).all(|w| {
            scope_compare(&w[0], &w[1]) == Ordering::Less && !satisfies(&w[0], &w[1])
        }));
        Self { scopes }
    }

    /// Merges another normalized set into this one, returning the union.
    pub fn merge(&self, other: &ScopeSet) -> ScopeSet {
        ScopeSet::from_normalized(merge_scope_sets(&self.scopes, &other.scopes))
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.scopes
    }

    pub fn into_vec(self) -> Vec<String> {
        self.scopes
    }

    /// Exact membership (satisfaction aside).
    pub fn contains(&self, scope: &str) -> bool {
        self.scopes
            .binary_search_by(|member| scope_compare(member, scope))
            .is_ok()
    }

    /// True if some member of this set satisfies `scope`.
    pub fn satisfies_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|member| satisfies(member, scope))
    }

    /// True if this set grants at least everything `other` grants: every
    /// member of `other` is satisfied by some member of this set.
    pub fn satisfies_set(&self, other: &ScopeSet) -> bool {
        other.iter().all(|scope| self.satisfies_scope(scope))
    }
}

impl From<Vec<String>> for ScopeSet {
    fn from(scopes: Vec<String>) -> Self {
        Self::from_scopes(scopes)
    }
}

impl From<ScopeSet> for Vec<String> {
    fn from(set: ScopeSet) -> Self {
        set.scopes
    }
}

impl<'a> IntoIterator for &'a ScopeSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.scopes.iter()
    }
}

impl FromIterator<String> for ScopeSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self::from_scopes(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(scopes: &[&str]) -> ScopeSet {
        ScopeSet::from_scopes(scopes.iter().map(|s| s.to_string()).collect())
    }

    fn strings(scopes: &[&str]) -> Vec<String> {
        scopes.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn satisfies_exact_and_prefix() {
        assert!(satisfies("queue:create", "queue:create"));
        assert!(satisfies("queue:*", "queue:create"));
        assert!(satisfies("queue:*", "queue:"));
        assert!(satisfies("*", "anything:at:all"));
        assert!(!satisfies("queue:create", "queue:*"));
        assert!(!satisfies("queue:c*", "queue:"));
    }

    #[test]
    fn validity_is_printable_ascii() {
        assert!(valid_scope("queue:create-task/prod_1"));
        assert!(valid_scope("queue:*"));
        assert!(valid_scope(""));
        assert!(!valid_scope("queue:\ncreate"));
        assert!(!valid_scope("queue:créer"));
    }

    #[test]
    fn empty_scope_matches_only_itself() {
        assert!(satisfies("", ""));
        assert!(!satisfies("", "a"));
        assert!(satisfies("*", ""));
    }

    #[test]
    fn compare_places_wildcard_before_covered() {
        assert_eq!(scope_compare("ab*", "abc"), Ordering::Less);
        assert_eq!(scope_compare("abc", "ab*"), Ordering::Greater);
        assert_eq!(scope_compare("ab*", "ab"), Ordering::Less);
        assert_eq!(scope_compare("ab", "ab*"), Ordering::Greater);
        assert_eq!(scope_compare("ab", "ab"), Ordering::Equal);
        assert_eq!(scope_compare("a", "b"), Ordering::Less);
    }

    #[test]
    fn normalize_drops_satisfied_members() {
        let normalized = normalize_scopes(strings(&[
            "a*", "ab", "aa", "b*", "c", "ca", "da*", "abc", "ab*", "daa",
        ]));
        assert_eq!(normalized, strings(&["a*", "b*", "c", "ca", "da*"]));
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_scopes(strings(&["q:*", "q:a", "r", "r", "s*", "sss"]));
        let twice = normalize_scopes(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn wildcard_only_set_collapses() {
        assert_eq!(normalize_scopes(strings(&["*", "a", "b*", "c:d"])), strings(&["*"]));
    }

    #[test]
    fn merge_is_union() {
        let a = set(&["a", "b*"]);
        let b = set(&["bx", "c"]);
        assert_eq!(a.merge(&b).as_slice(), &strings(&["a", "b*", "c"])[..]);
    }

    #[test]
    fn merge_commutes_as_sets() {
        let a = set(&["auth:create:*", "queue:get", "z"]);
        let b = set(&["auth:create:client", "queue:*", "y"]);
        assert_eq!(a.merge(&b), b.merge(&a));
    }

    #[test]
    fn merge_dedupes() {
        let a = set(&["a", "b"]);
        assert_eq!(a.merge(&a), a);
    }

    #[test]
    fn intersection_keeps_mutually_granted() {
        let a = set(&["queue:*", "auth:get"]);
        let b = set(&["queue:create", "auth:*"]);
        let both = scope_intersection(&a, &b);
        assert_eq!(both.as_slice(), &strings(&["auth:get", "queue:create"])[..]);
    }

    #[test]
    fn satisfies_set_requires_full_cover() {
        let held = set(&["queue:*", "auth:get"]);
        assert!(held.satisfies_set(&set(&["queue:create", "queue:delete"])));
        assert!(!held.satisfies_set(&set(&["queue:create", "auth:delete"])));
    }

    #[test]
    fn contains_is_exact() {
        let s = set(&["a*", "b"]);
        assert!(s.contains("a*"));
        assert!(!s.contains("ab"));
    }

    #[test]
    fn serde_round_trip_normalizes() {
        let parsed: ScopeSet = serde_json::from_str(r#"["b","a*","ab"]"#).unwrap();
        assert_eq!(parsed, set(&["a*", "b"]));
        let text = serde_json::to_string(&parsed).unwrap();
        assert_eq!(text, r#"["a*","b"]"#);
    }
}
