use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rowgate_auth::{GuardedEntityDescriptor, apply_data_scope, resolve};
use rowgate_core::{DataScope, RoleContext, UserContext};
use rowgate_sql::{Column, Expr};

fn user_with_custom_roles(n: i64) -> UserContext {
    UserContext::new(7, 3)
        .with_role(RoleContext::new(0, DataScope::Dept))
        .with_roles((1..=n).map(|id| RoleContext::new(id, DataScope::Custom)))
}

fn bench_resolution_by_role_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let descriptor = GuardedEntityDescriptor::new().with_table_alias("t");

    for roles in [1i64, 4, 16, 64] {
        let user = user_with_custom_roles(roles);
        group.bench_with_input(BenchmarkId::from_parameter(roles), &user, |b, user| {
            b.iter(|| resolve(black_box(user), black_box(&descriptor)));
        });
    }

    group.finish();
}

fn bench_all_short_circuit(c: &mut Criterion) {
    let user = user_with_custom_roles(64).with_role(RoleContext::new(-1, DataScope::All));
    let descriptor = GuardedEntityDescriptor::new();

    c.bench_function("resolve_all_short_circuit", |b| {
        b.iter(|| resolve(black_box(&user), black_box(&descriptor)));
    });
}

fn bench_rewrite_and_render(c: &mut Criterion) {
    let user = user_with_custom_roles(4);
    let descriptor = GuardedEntityDescriptor::new().with_table_alias("t");
    let existing = Expr::column_eq(Column::new("status"), "active");

    c.bench_function("apply_and_render", |b| {
        b.iter(|| {
            let filter = apply_data_scope(Some(existing.clone()), Some(&user), &descriptor);
            black_box(filter.map(|f| f.to_string()))
        });
    });
}

criterion_group!(
    benches,
    bench_resolution_by_role_count,
    bench_all_short_circuit,
    bench_rewrite_and_render
);
criterion_main!(benches);
