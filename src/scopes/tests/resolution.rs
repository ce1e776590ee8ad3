//! End-to-end resolution scenarios against realistic role catalogs.

use gridauth_scopes::{Role, ScopeExpression, ScopeResolver, ScopeSet};

fn role(id: &str, scopes: &[&str]) -> Role {
    Role::new(id, scopes.iter().map(|s| s.to_string()).collect())
}

fn resolve(resolver: &ScopeResolver, held: &[&str]) -> Vec<String> {
    let held: Vec<String> = held.iter().map(|s| s.to_string()).collect();
    resolver.resolve(&held).into_vec()
}

fn strings(scopes: &[&str]) -> Vec<String> {
    scopes.iter().map(|s| s.to_string()).collect()
}

#[test]
fn simple_assume() {
    let resolver = ScopeResolver::new(&[role("a", &["x"])]);
    assert_eq!(resolve(&resolver, &["assume:a"]), strings(&["assume:a", "x"]));
}

#[test]
fn wildcard_role_matches_any_suffix() {
    let resolver = ScopeResolver::new(&[role("a*", &["p*"])]);
    assert_eq!(
        resolve(&resolver, &["assume:abc"]),
        strings(&["assume:abc", "p*"])
    );
    assert_eq!(resolve(&resolver, &["assume:a"]), strings(&["assume:a", "p*"]));
}

#[test]
fn wildcard_input_matches_every_role() {
    let resolver = ScopeResolver::new(&[
        role("a", &["x"]),
        role("b", &["y"]),
        role("c", &["z"]),
    ]);
    assert_eq!(
        resolve(&resolver, &["assume:*"]),
        strings(&["assume:*", "x", "y", "z"])
    );
}

#[test]
fn short_wildcard_input_covers_the_namespace() {
    let resolver = ScopeResolver::new(&[role("a", &["x"]), role("b", &["y"])]);
    // "ass*" satisfies every assume:... scope, so it grants every role.
    let resolved = resolver.resolve(&["ass*".to_string()]);
    assert!(resolved.contains("x"));
    assert!(resolved.contains("y"));
    assert!(resolved.contains("ass*"));
}

#[test]
fn mutual_cycle_terminates_with_both_grants() {
    let resolver = ScopeResolver::new(&[
        role("A", &["assume:B", "scope-a"]),
        role("B", &["assume:A", "scope-b"]),
    ]);
    assert_eq!(
        resolve(&resolver, &["assume:A"]),
        strings(&["assume:A", "assume:B", "scope-a", "scope-b"])
    );
}

#[test]
fn deep_chain_resolves_to_the_end() {
    let mut roles: Vec<Role> = (0..500)
        .map(|i| role(&format!("tr-{i}"), &[&format!("assume:tr-{}", i + 1)]))
        .collect();
    roles.push(role("tr-500", &["special"]));
    let resolver = ScopeResolver::new(&roles);

    let resolved = resolver.resolve(&["assume:tr-0".to_string()]);
    assert!(resolved.contains("special"));
    for i in 0..=500 {
        assert!(
            resolved.contains(&format!("assume:tr-{i}")),
            "missing assume:tr-{i}"
        );
    }
    assert_eq!(resolved.len(), 502);
}

#[test]
fn star_scope_swallows_everything() {
    let resolver = ScopeResolver::new(&[role("client-id:root", &["*"])]);
    assert_eq!(resolve(&resolver, &["assume:client-id:*"]), strings(&["*"]));
}

#[test]
fn resolution_is_idempotent_on_a_mixed_catalog() {
    let resolver = ScopeResolver::new(&[
        role("repo:github.com/org/app:push", &["queue:route:index.app.*"]),
        role("worker-type:prod/*", &["queue:claim-work:prod/*", "assume:project:app"]),
        role("project:app", &["secrets:get:project/app/*"]),
    ]);
    let held = vec![
        "assume:worker-type:prod/builder".to_string(),
        "queue:get-artifact:public/logs/live".to_string(),
    ];
    let once = resolver.resolve(&held);
    let twice = resolver.resolve(once.as_slice());
    assert_eq!(once, twice);
}

#[test]
fn resolution_is_monotone_under_satisfaction() {
    let resolver = ScopeResolver::new(&[
        role("a", &["x:1", "assume:b"]),
        role("b", &["y:*"]),
        role("c", &["z"]),
    ]);
    let small = resolver.resolve(&["assume:a".to_string()]);
    let large = resolver.resolve(&["assume:a".to_string(), "assume:c".to_string()]);
    for scope in small.iter() {
        assert!(large.satisfies_scope(scope), "{scope} lost in the larger set");
    }
}

#[test]
fn endpoint_requirements_check_against_resolved_scopes() {
    let resolver = ScopeResolver::new(&[
        role("hook-admin", &["hooks:modify-hook:*", "hooks:trigger-hook:*"]),
        role("hook-runner", &["hooks:trigger-hook:ci/*"]),
    ]);
    let requirement = ScopeExpression::all_of(vec![
        ScopeExpression::required("hooks:trigger-hook:ci/nightly"),
        ScopeExpression::any_of(vec![
            ScopeExpression::required("hooks:modify-hook:ci/nightly"),
            ScopeExpression::required("queue:create-task:ci"),
        ]),
    ]);

    let admin = resolver.resolve(&["assume:hook-admin".to_string()]);
    assert!(requirement.satisfied_by(&admin));

    let runner = resolver.resolve(&["assume:hook-runner".to_string()]);
    assert!(!requirement.satisfied_by(&runner));
    let missing = requirement.unsatisfied(&runner).unwrap();
    assert_eq!(
        missing,
        ScopeExpression::any_of(vec![
            ScopeExpression::required("hooks:modify-hook:ci/nightly"),
            ScopeExpression::required("queue:create-task:ci"),
        ])
    );
}

#[test]
fn resolved_set_is_normalized() {
    let resolver = ScopeResolver::new(&[
        role("broad", &["queue:*"]),
        role("narrow", &["queue:create:tasks"]),
    ]);
    let resolved = resolver.resolve(&[
        "assume:broad".to_string(),
        "assume:narrow".to_string(),
        "queue:get".to_string(),
    ]);
    let expected = ScopeSet::from_scopes(strings(&[
        "assume:broad",
        "assume:narrow",
        "queue:*",
    ]));
    assert_eq!(resolved, expected);
}
