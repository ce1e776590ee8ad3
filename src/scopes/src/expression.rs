//! Boolean requirements over held scopes.
//!
//! API endpoints declare what a caller must hold as a tree of scopes
//! combined with `AllOf` / `AnyOf`. An expression is checked against a
//! caller's resolved [`ScopeSet`] under the usual prefix-wildcard
//! satisfaction; on failure the unsatisfied part of the tree can be
//! reported back so the caller learns exactly what was missing.

use serde::{Deserialize, Serialize};

use crate::set::ScopeSet;

/// A requirement over held scopes.
///
/// The JSON form mirrors the tree: a bare string requires one scope,
/// `{"AllOf": [...]}` requires every branch, `{"AnyOf": [...]}` requires at
/// least one. An empty `AllOf` is trivially satisfied; an empty `AnyOf`
/// can never be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeExpression {
    Required(String),
    AllOf {
        #[serde(rename = "AllOf")]
        all_of: Vec<ScopeExpression>,
    },
    AnyOf {
        #[serde(rename = "AnyOf")]
        any_of: Vec<ScopeExpression>,
    },
}

impl ScopeExpression {
    /// Requires a single scope.
    pub fn required(scope: impl Into<String>) -> Self {
        Self::Required(scope.into())
    }

    /// Requires every sub-expression.
    pub fn all_of(parts: Vec<ScopeExpression>) -> Self {
        Self::AllOf { all_of: parts }
    }

    /// Requires at least one sub-expression.
    pub fn any_of(parts: Vec<ScopeExpression>) -> Self {
        Self::AnyOf { any_of: parts }
    }

    /// True if the held scopes satisfy this requirement.
    pub fn satisfied_by(&self, held: &ScopeSet) -> bool {
        match self {
            Self::Required(scope) => held.satisfies_scope(scope),
            Self::AllOf { all_of } => all_of.iter().all(|part| part.satisfied_by(held)),
            Self::AnyOf { any_of } => any_of.iter().any(|part| part.satisfied_by(held)),
        }
    }

    /// The part of the requirement the held scopes do not cover, or `None`
    /// when fully satisfied.
    ///
    /// `AllOf` keeps only its failing branches; a failing `AnyOf` is
    /// reported whole, since any one of its branches would do.
    pub fn unsatisfied(&self, held: &ScopeSet) -> Option<ScopeExpression> {
        match self {
            Self::Required(scope) => {
                if held.satisfies_scope(scope) {
                    None
                } else {
                    Some(self.clone())
                }
            }
            Self::AllOf { all_of } => {
                let missing: Vec<ScopeExpression> = all_of
                    .iter()
                    .filter_map(|part| part.unsatisfied(held))
                    .collect();
                match missing.len() {
                    0 => None,
                    1 => missing.into_iter().next(),
                    _ => Some(Self::AllOf { all_of: missing }),
                }
            }
            Self::AnyOf { any_of } => {
                if any_of.iter().any(|part| part.satisfied_by(held)) {
                    None
                } else {
                    Some(self.clone())
                }
            }
        }
    }

    /// Every scope mentioned anywhere in the tree.
    pub fn referenced_scopes(&self) -> Vec<&str> {
        let mut scopes = Vec::new();
        self.collect_scopes(&mut scopes);
        scopes
    }

    fn collect_scopes<'a>(&'a self, into: &mut Vec<&'a str>) {
        match self {
            Self::Required(scope) => into.push(scope),
            Self::AllOf { all_of: parts } | Self::AnyOf { any_of: parts } => {
                for part in parts {
                    part.collect_scopes(into);
                }
            }
        }
    }
}
