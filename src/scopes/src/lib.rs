//! # GridAuth scope engine
//!
//! Scope algebra and role expansion for the GridAuth authentication
//! service. Given the scope strings a caller holds and the global role
//! catalog, the engine answers what the caller is authorized to exercise:
//!
//! - **Scope algebra**: prefix-wildcard satisfaction, canonical
//!   normalization, linear merging ([`set`]).
//! - **Role recognizer**: a compiled trie mapping any scope to the set of
//!   roles it matches, wildcards allowed on both sides ([`trie`]).
//! - **Fixed-point expansion**: transitive closure of grants over
//!   `assume:<roleId>` edges, plumbed back into the recognizer so one walk
//!   resolves a scope straight to its granted scope set.
//! - **Resolver**: the read-only facade ([`resolver::ScopeResolver`]).
//! - **Expressions**: `AllOf`/`AnyOf` requirement trees checked against a
//!   resolved scope set ([`expression`]).
//!
//! ## Example
//!
//! ```
//! use gridauth_scopes::{Role, ScopeResolver};
//!
//! let resolver = ScopeResolver::new(&[
//!     Role::new("deploy-prod", vec!["queue:submit:prod/*".to_string()]),
//! ]);
//! let granted = resolver.resolve(&["assume:deploy-prod".to_string()]);
//! assert!(granted.satisfies_scope("queue:submit:prod/web"));
//! ```

pub mod expression;
pub mod resolver;
pub mod set;
pub mod trie;

mod expand;

pub use expand::ASSUME_PREFIX;
pub use expression::ScopeExpression;
pub use resolver::{Role, ScopeResolver};
pub use set::{
    merge_scope_sets, normalize_scopes, satisfies, scope_compare, scope_intersection, valid_scope,
    ScopeSet,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
