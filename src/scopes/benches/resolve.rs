//! Compilation and resolution throughput over a synthetic catalog shaped
//! like production data: grouped roles, wildcard identifiers, and
//! cross-role `assume:` edges.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridauth_scopes::{Role, ScopeResolver};

fn synthetic_catalog(groups: usize, per_group: usize) -> Vec<Role> {
    let mut roles = Vec::with_capacity(groups * per_group + groups);
    for g in 0..groups {
        roles.push(Role::new(
            format!("group-{g}:*"),
            vec![format!("service-{g}:admin:*")],
        ));
        for m in 0..per_group {
            roles.push(Role::new(
                format!("group-{g}:member-{m}"),
                vec![
                    format!("service-{g}:read:{m}"),
                    format!("assume:group-{}:member-{}", (g + 1) % groups, m),
                ],
            ));
        }
    }
    roles
}

fn bench_compile(c: &mut Criterion) {
    let roles = synthetic_catalog(20, 50);
    c.bench_function("compile_1k_roles", |b| {
        b.iter(|| ScopeResolver::new(black_box(&roles)))
    });
}

fn bench_resolve(c: &mut Criterion) {
    let roles = synthetic_catalog(20, 50);
    let resolver = ScopeResolver::new(&roles);
    let held = vec![
        "assume:group-3:member-7".to_string(),
        "assume:group-11:*".to_string(),
        "queue:unrelated:scope".to_string(),
    ];
    c.bench_function("resolve_held_scopes", |b| {
        b.iter(|| resolver.resolve(black_box(&held)))
    });
}

criterion_group!(benches, bench_compile, bench_resolve);
criterion_main!(benches);
