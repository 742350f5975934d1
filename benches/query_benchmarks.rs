/*!
# Query Benchmarks

Request parsing and body validation, the per-request work every action does
before touching the database.

```bash
cargo bench --bench query_benchmarks
cargo bench --bench query_benchmarks -- --quick
```

HTML reports are generated in `target/criterion/report/index.html`.
*/

use std::hint::black_box;

use axum::extract::Query;
use axum::http::Uri;
use criterion::{Criterion, criterion_group, criterion_main};
use rest_resource::{
    Appends, ControllerConfig, ListParams, PerPage, Presence, QuerySpec, Rule, Rules,
};
use serde_json::{Map, Value, json};

fn config() -> ControllerConfig {
    ControllerConfig::new()
        .items_per_page(PerPage::Count(25))
        .sort("created_at")
        .fields(["id", "title", "published", "created_at"])
        .allowed_with(["comments", "author", "tags"])
        .appends(Appends::mapped([("comment_count", "comments")]))
}

fn rules() -> Rules {
    Rules::new()
        .field("title", [Rule::Required, Rule::String, Rule::Min(3.0), Rule::Max(200.0)])
        .field("email", [Rule::Required, Rule::Email])
        .field("status", [Rule::In(vec!["draft".into(), "live".into()])])
        .field("rank", [Rule::Nullable, Rule::Integer, Rule::Min(0.0)])
        .field("author_id", [Rule::Uuid])
}

fn body(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn bench_query_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Query Parsing");
    let config = config();
    let uri: Uri = "/posts?items_per_page=10&page=3&sort=title&order=asc&with=comments,secrets,tags&fields=id,title,password&show_trashed=only"
        .parse()
        .unwrap();

    group.bench_function("extract_list_params", |b| {
        b.iter(|| Query::<ListParams>::try_from_uri(black_box(&uri)).unwrap());
    });

    let Query(params) = Query::<ListParams>::try_from_uri(&uri).unwrap();
    group.bench_function("resolve_query_spec", |b| {
        b.iter(|| QuerySpec::resolve(black_box(&params), black_box(&config)));
    });
    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Validation");
    let rules = rules();
    let valid = body(json!({
        "title": "A reasonable title",
        "email": "editor@example.com",
        "status": "live",
        "rank": 4,
        "author_id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
    }));
    let invalid = body(json!({
        "title": "x",
        "email": "not-an-email",
        "status": "archived",
        "rank": -1,
        "author_id": "42",
    }));

    group.bench_function("valid_full", |b| {
        b.iter(|| rules.check(black_box(&valid), Presence::Full));
    });
    group.bench_function("invalid_full", |b| {
        b.iter(|| rules.check(black_box(&invalid), Presence::Full));
    });
    group.bench_function("partial_single_field", |b| {
        let patch = body(json!({"title": "Renamed"}));
        b.iter(|| rules.check(black_box(&patch), Presence::Partial));
    });
    group.finish();
}

criterion_group!(benches, bench_query_parsing, bench_validation);
criterion_main!(benches);
