//! Character-level recognizer over role identifiers.
//!
//! The trie answers, for any scope, which role identifiers that scope
//! matches, where both sides may carry a trailing `*` wildcard. Matched
//! role sets are interned into a side array and shared between nodes via
//! back-references, so a catalog of tens of thousands of roles compiles to
//! a structure whose set storage stays near-linear in the role count.

use std::cmp::Ordering;

/// Index into the interned set array.
pub type SetId = usize;

/// An interned role set: either a concrete list of role indices, or one
/// role on top of a previously interned set.
#[derive(Debug, Clone)]
pub(crate) enum SetEntry {
    Roles(Vec<usize>),
    Chain { role: usize, rest: SetId },
}

const EMPTY_SET: SetId = 0;

#[derive(Debug)]
struct Node {
    /// Sorted edge list, one byte per edge. Never contains `b'*'`.
    edges: Vec<(u8, Node)>,
    /// Set matched when the input ends at this node.
    end: Option<SetId>,
    /// Set matched when the input diverges from every edge here.
    default: SetId,
    /// Child taken for a `*` byte in the input. Present on every node the
    /// builder emits; absent only below synthesized star nodes, where any
    /// further input falls through to `default`.
    star: Option<Box<Node>>,
}

impl Node {
    fn leaf(implied: SetId) -> Node {
        Node {
            edges: Vec::new(),
            end: Some(implied),
            default: implied,
            star: Some(Box::new(Node {
                edges: Vec::new(),
                end: Some(implied),
                default: implied,
                star: None,
            })),
        }
    }

    /// The set matched by an input ending in `*` at this node.
    fn star_end(&self) -> SetId {
        match &self.star {
            Some(star) => star.end.unwrap_or(star.default),
            None => self.default,
        }
    }
}

/// Identifier order for construction: lexicographic, except that `*` sorts
/// before end-of-string and before any other byte. This places each
/// wildcard identifier immediately before every identifier it covers, so
/// the builder can recurse over contiguous index ranges.
fn pattern_compare(a: &[u8], b: &[u8]) -> Ordering {
    let mut i = 0;
    loop {
        match (a.get(i), b.get(i)) {
            (Some(&x), Some(&y)) if x == y => i += 1,
            (Some(&b'*'), _) => return Ordering::Less,
            (_, Some(&b'*')) => return Ordering::Greater,
            (Some(&x), Some(&y)) => return x.cmp(&y),
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

struct Builder<'a> {
    /// Identifier bytes with their original role index, in construction order.
    patterns: Vec<(&'a [u8], usize)>,
    sets: Vec<SetEntry>,
}

impl Builder<'_> {
    fn push_chain(&mut self, role: usize, rest: SetId) -> SetId {
        self.sets.push(SetEntry::Chain { role, rest });
        self.sets.len() - 1
    }

    /// Builds the node for the identifier range `[lo, hi)` at `depth` bytes
    /// consumed, with `implied` holding every wildcard identifier that
    /// already covers this point.
    fn build(&mut self, lo: usize, hi: usize, depth: usize, implied: SetId) -> Node {
        if lo >= hi {
            return Node::leaf(implied);
        }
        let mut lo = lo;
        let mut implied = implied;
        let mut end: Option<SetId> = None;

        // A wildcard identifier ending exactly here covers the whole subtree.
        let (pattern, role) = self.patterns[lo];
        if pattern.len() == depth + 1 && pattern[depth] == b'*' {
            implied = self.push_chain(role, implied);
            end = Some(implied);
            lo += 1;
        }
        let star_base = lo;

        // Identifiers with a literal '*' at this position continue under the
        // star child.
        let mut mid = lo;
        while mid < hi && self.patterns[mid].0.get(depth) == Some(&b'*') {
            mid += 1;
        }

        // An identifier terminating exactly here.
        let mut after = mid;
        let mut terminal: Option<(usize, SetId)> = None;
        if after < hi && self.patterns[after].0.len() == depth {
            let role = self.patterns[after].1;
            let entry = self.push_chain(role, implied);
            end = Some(entry);
            terminal = Some((role, entry));
            after += 1;
        }

        // Children, partitioned by the byte at this depth.
        let mut edges: Vec<(u8, Node)> = Vec::new();
        let mut i = after;
        while i < hi {
            let byte = self.patterns[i].0[depth];
            let mut j = i + 1;
            while j < hi && self.patterns[j].0[depth] == byte {
                j += 1;
            }
            let child = self.build(i, j, depth + 1, implied);
            edges.push((byte, child));
            i = j;
        }

        // The set for an input ending in '*' right here: every role in the
        // subtree range plus the covering identifiers on the path. On a
        // non-branching chain the single child's star set is the same set,
        // so it is reused by index instead of materialized again.
        let star_end = if edges.len() == 1 && mid == star_base {
            let shared = edges[0].1.star_end();
            match terminal {
                None => shared,
                Some((role, _)) => self.push_chain(role, shared),
            }
        } else {
            let (mut set, from) = match terminal {
                Some((_, entry)) if mid == star_base => (entry, after),
                _ => (implied, star_base),
            };
            for k in from..hi {
                set = self.push_chain(self.patterns[k].1, set);
            }
            set
        };

        let star = if mid > star_base {
            let mut below = self.build(star_base, mid, depth + 1, implied);
            below.end = Some(star_end);
            Box::new(below)
        } else {
            Box::new(Node {
                edges: Vec::new(),
                end: Some(star_end),
                default: implied,
                star: None,
            })
        };

        Node {
            edges,
            end,
            default: implied,
            star: Some(star),
        }
    }
}

/// Compiled recognizer over a fixed list of role identifiers.
#[derive(Debug)]
pub struct RoleTrie {
    root: Node,
    sets: Vec<SetEntry>,
}

impl RoleTrie {
    /// Compiles the recognizer. `patterns[i]` is the identifier for role
    /// index `i`; a trailing `*` makes it a wildcard identifier.
    pub fn build(patterns: &[String]) -> RoleTrie {
        let mut sorted: Vec<(&[u8], usize)> = patterns
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.as_bytes(), idx))
            .collect();
        sorted.sort_by(|a, b| pattern_compare(a.0, b.0));
        let count = sorted.len();
        let mut builder = Builder {
            patterns: sorted,
            sets: vec![SetEntry::Roles(Vec::new())],
        };
        let root = builder.build(0, count, 0, EMPTY_SET);
        RoleTrie {
            root,
            sets: builder.sets,
        }
    }

    /// Walks the input and returns the interned set of matched roles.
    pub fn execute(&self, scope: &str) -> SetId {
        let mut node = &self.root;
        for &byte in scope.as_bytes() {
            let next = if byte == b'*' {
                node.star.as_deref()
            } else {
                node.edges
                    .binary_search_by_key(&byte, |(b, _)| *b)
                    .ok()
                    .map(|idx| &node.edges[idx].1)
            };
            match next {
                Some(child) => node = child,
                None => return node.default,
            }
        }
        node.end.unwrap_or(node.default)
    }

    /// Flattens an interned set into role indices.
    pub fn matching_roles(&self, set: SetId) -> Vec<usize> {
        let mut roles = Vec::new();
        let mut current = set;
        loop {
            match &self.sets[current] {
                SetEntry::Chain { role, rest } => {
                    roles.push(*role);
                    current = *rest;
                }
                SetEntry::Roles(list) => {
                    roles.extend(list.iter().copied());
                    return roles;
                }
            }
        }
    }

    /// Roles matched by `scope`, flattened.
    pub fn matches(&self, scope: &str) -> Vec<usize> {
        self.matching_roles(self.execute(scope))
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub(crate) fn sets(&self) -> &[SetEntry] {
        &self.sets
    }
}
