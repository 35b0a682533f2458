use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use chrono::Duration;
use warden_auth::expression::{has_authority, has_role, is_owner_of};
use warden_auth::{AuthorityExpression, AuthorizationEvaluator, Principal, SigningKey, TokenCodec};
use warden_core::{ManualClock, SubjectId};

fn codec() -> TokenCodec {
    let key = Arc::new(SigningKey::from_material(&[7u8; 32]).unwrap());
    TokenCodec::new(key, Arc::new(ManualClock::at_unix(1_700_000_000)), Duration::minutes(15))
}

fn bench_token_parse(c: &mut Criterion) {
    let codec = codec();
    let subject = SubjectId::new("alice").unwrap();
    let mut group = c.benchmark_group("token_parse");

    for authorities in [1usize, 10, 100] {
        let granted: Vec<String> = (0..authorities).map(|i| format!("perm.{i}")).collect();
        let issued = codec.issue_default(&subject, granted).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(authorities), &issued.token, |b, token| {
            b.iter(|| codec.parse(black_box(token)).unwrap());
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let evaluator = AuthorizationEvaluator::new();
    let codec = codec();
    let issued = codec
        .issue_default(&SubjectId::new("alice").unwrap(), ["ROLE_USER", "order.read"])
        .unwrap();
    // Authenticated principals only come out of the manager; go through the token path.
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let manager = warden_auth::AuthenticationManager::builder()
        .provider(warden_auth::TokenProvider::new(Arc::new(codec)))
        .build();
    let principal: Principal = rt
        .block_on(manager.authenticate(&warden_auth::Credential::bearer(issued.token)))
        .unwrap();

    let simple = has_role("USER");
    let nested: AuthorityExpression = (0..16).fold(has_role("ADMIN"), |acc, i| {
        acc.or(has_authority(format!("perm.{i}")).and(is_owner_of("owner")))
    });
    let resources = [("owner", "alice")];

    let mut group = c.benchmark_group("evaluate");
    group.bench_function("has_role", |b| {
        b.iter(|| evaluator.evaluate(Some(&principal), black_box(&simple), &()))
    });
    group.bench_function("nested_or_chain", |b| {
        b.iter(|| evaluator.evaluate(Some(&principal), black_box(&nested), &resources))
    });
    group.finish();
}

criterion_group!(benches, bench_token_parse, bench_evaluate);
criterion_main!(benches);
