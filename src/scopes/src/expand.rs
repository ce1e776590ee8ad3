//! Fixed-point expansion of role grants over `assume:` edges.
//!
//! A role's scopes may contain `assume:<roleId>` scopes, granting the
//! scopes of other roles. Saturation computes, for every role, the
//! transitive closure of everything reachable that way, then derives the
//! closed scope set for every role set the recognizer interned.

use rand::seq::SliceRandom;

use crate::set::ScopeSet;
use crate::trie::{RoleTrie, SetEntry};

/// Scope namespace by which a caller requests a role's authority.
pub const ASSUME_PREFIX: &str = "assume:";

/// True if `scope` could match some `assume:` identifier: either it lives
/// in the namespace, or it is a prefix scope whose stem covers part of it
/// (`assume*`, `ass*`, `*`).
pub(crate) fn touches_assume(scope: &str) -> bool {
    scope.starts_with(ASSUME_PREFIX)
        || (scope.ends_with('*') && ASSUME_PREFIX.starts_with(&scope[..scope.len() - 1]))
}

struct RoleState {
    scopes: ScopeSet,
    expanded: Option<ScopeSet>,
    implied: Vec<usize>,
    /// Traversal stamp; equal to the current iteration when this role is
    /// already part of the running depth-first walk.
    seen: u64,
}

/// Computes every role's closed scope set and the closed set for each
/// interned recognizer set.
///
/// `direct[i]` holds the declared scopes of role `i`; `trie` is the
/// recognizer compiled from the `assume:`-prefixed role identifiers.
/// Returns `(expanded_per_role, expanded_per_set)`.
pub(crate) fn saturate(direct: &[ScopeSet], trie: &RoleTrie) -> (Vec<ScopeSet>, Vec<ScopeSet>) {
    let mut states: Vec<RoleState> = direct
        .iter()
        .map(|scopes| RoleState {
            scopes: scopes.clone(),
            expanded: None,
            implied: Vec::new(),
            seen: 0,
        })
        .collect();

    // Seed the implication edges through the recognizer.
    for idx in 0..states.len() {
        let mut implied: Vec<usize> = Vec::new();
        for scope in direct[idx].iter() {
            if !touches_assume(scope) {
                continue;
            }
            implied.extend(trie.matches(scope));
        }
        implied.sort_unstable();
        implied.dedup();
        implied.retain(|&role| role != idx);
        states[idx].implied = implied;
    }

    // Saturate in a randomized order so adjacent dependency chains in the
    // catalog do not line up into a worst-case processing sequence.
    let mut order: Vec<usize> = (0..states.len()).collect();
    order.shuffle(&mut rand::thread_rng());
    let mut iteration = 0u64;
    for &root in &order {
        iteration += 1;
        let expanded = traverse(&mut states, root, iteration);
        states[root].expanded = Some(expanded);
    }
    let expanded: Vec<ScopeSet> = states
        .into_iter()
        .map(|state| state.expanded.unwrap_or_default())
        .collect();

    // Closed set per interned entry, walked in index order so that every
    // back-reference is already computed.
    let mut scope_sets: Vec<ScopeSet> = Vec::with_capacity(trie.set_count());
    for entry in trie.sets() {
        let merged = match entry {
            SetEntry::Roles(list) => list
                .iter()
                .fold(ScopeSet::new(), |acc, &role| acc.merge(&expanded[role])),
            SetEntry::Chain { role, rest } => scope_sets[*rest].merge(&expanded[*role]),
        };
        scope_sets.push(merged);
    }
    (expanded, scope_sets)
}

/// Depth-first accumulation of everything reachable from `at`.
///
/// A role already stamped with the current iteration is on the running
/// walk; its scopes reach the root through the point where it was first
/// visited, so it is skipped rather than revisited. Only the root of a
/// traversal stores its result: interior results are truncated at cycles
/// and would be wrong to keep.
fn traverse(states: &mut [RoleState], at: usize, iteration: u64) -> ScopeSet {
    states[at].seen = iteration;
    let mut result = states[at].scopes.clone();
    let implied = states[at].implied.clone();
    for dep in implied {
        if let Some(done) = &states[dep].expanded {
            result = result.merge(done);
        } else if states[dep].seen == iteration {
            continue;
        } else {
            let sub = traverse(states, dep, iteration);
            result = result.merge(&sub);
        }
    }
    result
}
