mod common;

use common::{body_str, get, init_tracing};
use trellis::{Context, ParsedRequest, Router};

fn echo_method(ctx: &mut Context) {
    let method = ctx.request().method.clone();
    ctx.text(200, &method);
}

#[test]
fn test_methods_table() {
    init_tracing();
    let mut r = Router::new();
    r.get("/get", echo_method);
    r.post("/post", echo_method);
    r.put("/put", echo_method);
    r.delete("/delete", echo_method);
    r.patch("/patch", echo_method);
    r.head("/head", echo_method);
    r.any("/any", echo_method);

    for (method, path) in [
        ("GET", "/get"),
        ("POST", "/post"),
        ("PUT", "/put"),
        ("DELETE", "/delete"),
        ("PATCH", "/patch"),
        ("HEAD", "/head"),
        ("GET", "/any"),
        ("POST", "/any"),
        ("DELETE", "/any"),
    ] {
        let parts = r.handle(ParsedRequest::new(method, path));
        assert_eq!(parts.status(), 200, "{method} {path}");
        assert_eq!(body_str(&parts), method, "{method} {path}");
    }
}

#[test]
fn test_param_and_named_catch_all() {
    init_tracing();
    let mut r = Router::new();
    r.get("/user/{name}", |ctx: &mut Context| {
        let name = ctx.path_params.get("name").unwrap_or("").to_string();
        ctx.text(200, &format!("user:{name}"));
    });
    r.get("/files/{filepath:*}", |ctx: &mut Context| {
        let fp = ctx.path_params.get("filepath").unwrap_or("").to_string();
        ctx.text(200, &fp);
    });

    let parts = get(&r, "/user/alice");
    assert_eq!(body_str(&parts), "user:alice");

    // Scenario: catch-all binds the joined remainder of the path.
    let parts = get(&r, "/files/css/a.css");
    assert_eq!(parts.status(), 200);
    assert_eq!(body_str(&parts), "css/a.css");
}

#[test]
fn test_composite_segment() {
    init_tracing();
    let mut r = Router::new();
    r.get("/img/{name}.{ext}", |ctx: &mut Context| {
        let name = ctx.path_params.get("name").unwrap_or("").to_string();
        let ext = ctx.path_params.get("ext").unwrap_or("").to_string();
        ctx.text(200, &format!("name={name} ext={ext}"));
    });

    let parts = get(&r, "/img/photo.jpg");
    assert_eq!(body_str(&parts), "name=photo ext=jpg");
}

#[test]
fn test_regex_segment() {
    init_tracing();
    let mut r = Router::new();
    r.get("/api/v{v:[0-9]+}/{res}", |ctx: &mut Context| {
        let v = ctx.path_params.get("v").unwrap_or("").to_string();
        let res = ctx.path_params.get("res").unwrap_or("").to_string();
        ctx.text(200, &format!("ver={v} res={res}"));
    });

    let parts = get(&r, "/api/v12/users");
    assert_eq!(parts.status(), 200);
    assert_eq!(body_str(&parts), "ver=12 res=users");

    let parts = get(&r, "/api/vX/users");
    assert_eq!(parts.status(), 404);
}

#[test]
fn test_bare_wildcards() {
    init_tracing();
    let mut r = Router::new();
    r.get("/all/*", |ctx: &mut Context| ctx.text(200, "wildcard"));
    r.get("/recursive/**", |ctx: &mut Context| {
        ctx.text(200, "recursive")
    });

    assert_eq!(body_str(&get(&r, "/all/anything")), "wildcard");
    assert_eq!(get(&r, "/all/a/b").status(), 404);
    assert_eq!(body_str(&get(&r, "/recursive/deep/path")), "recursive");
    // ** also accepts the empty remainder.
    assert_eq!(body_str(&get(&r, "/recursive")), "recursive");
}

#[test]
fn test_sibling_backtracking() {
    init_tracing();
    let mut r = Router::new();
    r.get("/a/b/{p1}/d", |ctx: &mut Context| {
        let p = ctx.path_params.get("p1").unwrap_or("").to_string();
        ctx.text(200, &format!("d matched p1={p}"));
    });
    r.get("/a/b/{p2}/c", |ctx: &mut Context| {
        let p = ctx.path_params.get("p2").unwrap_or("").to_string();
        ctx.text(200, &format!("c matched p2={p}"));
    });

    // The {p1} branch is tried first and fails at the terminal, so the
    // matcher must back out and try {p2}.
    assert_eq!(body_str(&get(&r, "/a/b/x/c")), "c matched p2=x");
    assert_eq!(body_str(&get(&r, "/a/b/x/d")), "d matched p1=x");
}

#[test]
fn test_backtracking_cleans_params() {
    init_tracing();
    let mut r = Router::new();
    r.get("/users/{id}/details", |ctx: &mut Context| {
        ctx.text(200, "details")
    });
    r.get("/users/{any:*}", |ctx: &mut Context| {
        // The failed {id} attempt must leave no residue behind.
        if ctx.path_params.get("id").is_some() {
            ctx.text(500, "bug:id_exists");
            return;
        }
        let any = ctx.path_params.get("any").unwrap_or("").to_string();
        ctx.text(200, &format!("wild:{any}"));
    });

    let parts = get(&r, "/users/123/profile");
    assert_eq!(body_str(&parts), "wild:123/profile");
}

#[test]
fn test_static_beats_param_regardless_of_order() {
    init_tracing();
    let mut r = Router::new();
    r.get("/p/specific", |ctx: &mut Context| ctx.text(200, "specific"));
    r.get("/p/{param}", |ctx: &mut Context| {
        let p = ctx.path_params.get("param").unwrap_or("").to_string();
        ctx.text(200, &format!("param={p}"));
    });

    assert_eq!(body_str(&get(&r, "/p/specific")), "specific");
    assert_eq!(body_str(&get(&r, "/p/other")), "param=other");

    // Same outcome when the param route is registered first: static
    // siblings rank ahead of parametric ones.
    let mut r = Router::new();
    r.get("/q/{param}", |ctx: &mut Context| {
        let p = ctx.path_params.get("param").unwrap_or("").to_string();
        ctx.text(200, &format!("param={p}"));
    });
    r.get("/q/specific", |ctx: &mut Context| ctx.text(200, "specific"));

    assert_eq!(body_str(&get(&r, "/q/specific")), "specific");
}

#[test]
fn test_static_beats_wildcard_registered_first() {
    init_tracing();
    let mut r = Router::new();
    r.get("/w/*", |ctx: &mut Context| ctx.text(200, "wildcard"));
    r.get("/w/specific", |ctx: &mut Context| ctx.text(200, "specific"));

    assert_eq!(body_str(&get(&r, "/w/specific")), "specific");
    assert_eq!(body_str(&get(&r, "/w/other")), "wildcard");
}

#[test]
fn test_first_matching_param_wins_on_conflict() {
    init_tracing();
    let mut r = Router::new();
    r.get("/users/{id}", |ctx: &mut Context| ctx.text(200, "id"));
    r.get("/users/{name}", |ctx: &mut Context| ctx.text(200, "name"));

    // Both terminals match; ordered descent takes the first registration.
    assert_eq!(body_str(&get(&r, "/users/123")), "id");
}

#[test]
fn test_clear_removes_route() {
    init_tracing();
    let mut r = Router::new();
    r.get("/remove", |ctx: &mut Context| ctx.text(200, "exist"));

    assert_eq!(get(&r, "/remove").status(), 200);
    r.clear("/remove", "GET");
    assert_eq!(get(&r, "/remove").status(), 404);
}

#[test]
fn test_duplicate_registration_replaces() {
    init_tracing();
    let mut r = Router::new();
    r.get("/dup", |ctx: &mut Context| ctx.text(200, "first"));
    r.get("/dup", |ctx: &mut Context| ctx.text(200, "second"));

    assert_eq!(body_str(&get(&r, "/dup")), "second");
}

#[test]
fn test_unmatched_paths_get_404() {
    init_tracing();
    let mut r = Router::new();
    r.get("/known", |ctx: &mut Context| ctx.text(200, "ok"));

    assert_eq!(get(&r, "/unknown").status(), 404);
    // Matching path, wrong method: no 405 is synthesized.
    assert_eq!(r.handle(ParsedRequest::new("POST", "/known")).status(), 404);
}

#[test]
fn test_scope_paths_compose() {
    init_tracing();
    let mut r = Router::new();
    {
        let mut api = r.scope("/api");
        let mut v1 = api.scope("/v1");
        v1.get("/hello", |ctx: &mut Context| ctx.text(200, "hello"));
    }

    assert_eq!(body_str(&get(&r, "/api/v1/hello")), "hello");
    assert_eq!(get(&r, "/v1/hello").status(), 404);
}

#[test]
fn test_trailing_slash_is_ignored() {
    init_tracing();
    let mut r = Router::new();
    r.get("/items", |ctx: &mut Context| ctx.text(200, "items"));

    assert_eq!(get(&r, "/items/").status(), 200);
    assert_eq!(get(&r, "/items").status(), 200);
}

#[test]
fn test_describe_lists_routes() {
    init_tracing();
    let mut r = Router::new();
    r.get("/users/{id}", ("fetch one user", |ctx: &mut Context| {
        ctx.text(200, "u")
    }));
    r.post("/users", |ctx: &mut Context| ctx.text(201, "c"));

    let docs = r.describe();
    assert_eq!(docs.len(), 2);
    let get_doc = docs
        .iter()
        .find(|d| d.method == http::Method::GET)
        .expect("GET route documented");
    assert_eq!(get_doc.path, "/users/{id}");
    assert_eq!(get_doc.summary, "fetch one user");
    assert_eq!(get_doc.handlers.len(), 1);
    assert!(get_doc.handlers[0].file.ends_with("router_tests.rs"));
}

#[test]
fn test_github_route_table_resolves() {
    init_tracing();
    let mut r = Router::new();
    for (path, methods) in github_routes() {
        for method in methods {
            let route_path = path.to_string();
            r.set(path, method, move |ctx: &mut Context| {
                let body = route_path.clone();
                ctx.text(200, &body);
            });
        }
    }

    for (path, methods) in github_routes() {
        let concrete = path.replace('{', "").replace('}', "");
        for method in methods {
            let parts = r.handle(ParsedRequest::new(method, &concrete));
            assert_eq!(parts.status(), 200, "{method} {concrete}");
            assert_eq!(body_str(&parts), path, "{method} {concrete}");
        }
    }
}

fn github_routes() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        ("/gitignore/templates", vec!["GET"]),
        ("/repos/{owner}/{repo}/commits/{sha}", vec!["GET"]),
        ("/repos/{owner}/{repo}/issues/{number}", vec!["GET"]),
        ("/users/{user}/gists", vec!["GET"]),
        ("/notifications", vec!["GET", "PUT"]),
        ("/repos/{owner}/{repo}/hooks", vec!["GET", "POST"]),
        ("/repos/{owner}/{repo}/pulls", vec!["GET", "POST"]),
        ("/gists/{id}", vec!["GET", "DELETE"]),
        ("/orgs/{org}/events", vec!["GET"]),
        ("/markdown/raw", vec!["POST"]),
        ("/teams/{id}/members", vec!["GET"]),
        ("/repos/{owner}/{repo}/milestones/{number}/labels", vec!["GET"]),
        ("/user/starred/{owner}/{repo}", vec!["GET", "PUT", "DELETE"]),
        ("/legacy/issues/search/{owner}/{repository}/{state}/{keyword}", vec!["GET"]),
        ("/user/subscriptions", vec!["GET"]),
        ("/users/{user}", vec!["GET"]),
        ("/rate_limit", vec!["GET"]),
        ("/search/repositories", vec!["GET"]),
    ]
}
