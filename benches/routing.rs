use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trellis::{Context, ParsedRequest, Router};

fn build_router(routes: &[&'static str]) -> Router {
    let mut router = Router::new();
    for path in routes {
        router.get(path, |ctx: &mut Context| ctx.text(200, "ok"));
    }
    router
}

fn routes() -> Vec<&'static str> {
    vec![
        "/",
        "/events",
        "/feeds",
        "/notifications",
        "/repos/{owner}/{repo}",
        "/repos/{owner}/{repo}/commits/{sha}",
        "/repos/{owner}/{repo}/issues/{number}",
        "/repos/{owner}/{repo}/issues/{number}/comments",
        "/repos/{owner}/{repo}/pulls/{number}/files",
        "/repos/{owner}/{repo}/git/trees/{sha}",
        "/users/{user}",
        "/users/{user}/repos",
        "/users/{user}/followers",
        "/orgs/{org}/teams",
        "/teams/{id}/members/{user}",
        "/search/repositories",
        "/markdown/raw",
        "/gists/{id}/star",
        "/static/{filepath:*}",
        "/img/{name}.{ext}",
        "/api/v{ver:[0-9]+}/{resource}",
    ]
}

fn bench_static_match(c: &mut Criterion) {
    let router = build_router(&routes());
    c.bench_function("match_static", |b| {
        b.iter(|| {
            let parts = router.handle(black_box(ParsedRequest::new("GET", "/markdown/raw")));
            black_box(parts.status())
        })
    });
}

fn bench_param_match(c: &mut Criterion) {
    let router = build_router(&routes());
    c.bench_function("match_two_params", |b| {
        b.iter(|| {
            let parts = router.handle(black_box(ParsedRequest::new(
                "GET",
                "/repos/octocat/hello/commits/abc123",
            )));
            black_box(parts.status())
        })
    });
}

fn bench_catch_all_match(c: &mut Criterion) {
    let router = build_router(&routes());
    c.bench_function("match_catch_all", |b| {
        b.iter(|| {
            let parts = router.handle(black_box(ParsedRequest::new(
                "GET",
                "/static/css/deep/site.css",
            )));
            black_box(parts.status())
        })
    });
}

fn bench_regex_match(c: &mut Criterion) {
    let router = build_router(&routes());
    c.bench_function("match_regex", |b| {
        b.iter(|| {
            let parts = router.handle(black_box(ParsedRequest::new("GET", "/api/v12/users")));
            black_box(parts.status())
        })
    });
}

criterion_group!(
    benches,
    bench_static_match,
    bench_param_match,
    bench_catch_all_match,
    bench_regex_match
);
criterion_main!(benches);
