//! End-to-end matching and building scenarios.

use wayfinder::{
    NavigationError, ParamValue, Params, PathBuildError, QueryParamsMode, RouteDefinition,
    Router, RouterOptions, UNKNOWN_ROUTE,
};

fn params(pairs: &[(&str, &str)]) -> Params {
    let mut params = Params::new();
    for (k, v) in pairs {
        params.insert(*k, *v);
    }
    params
}

#[test]
fn nested_routes_match_and_build() {
    let router = Router::new(vec![
        RouteDefinition::new("home", "/"),
        RouteDefinition::new("users", "/users")
            .child(RouteDefinition::new("profile", "/:id")),
    ])
    .unwrap();

    let state = router.match_path("/users/42", None).unwrap();
    assert_eq!(state.name, "users.profile");
    assert_eq!(state.params.get("id").unwrap().as_str(), Some("42"));

    let built = router
        .build_path("users.profile", &params(&[("id", "42")]))
        .unwrap();
    assert_eq!(built, "/users/42");
}

#[test]
fn constraints_gate_both_directions() {
    let router = Router::new(vec![RouteDefinition::new("users", "/users/:id<\\d+>")]).unwrap();

    assert!(router.match_path("/users/abc", None).is_none());
    let state = router.match_path("/users/7", None).unwrap();
    assert_eq!(state.params.get("id").unwrap().as_str(), Some("7"));

    let err = router
        .build_path("users", &params(&[("id", "abc")]))
        .unwrap_err();
    assert!(matches!(err, PathBuildError::ConstraintViolation { .. }));
}

#[test]
fn splats_round_trip() {
    let router = Router::new(vec![RouteDefinition::new("files", "/files/*path")]).unwrap();

    let state = router.match_path("/files/a/b/c.txt", None).unwrap();
    assert_eq!(state.params.get("path").unwrap().as_str(), Some("a/b/c.txt"));

    let built = router
        .build_path("files", &params(&[("path", "x/y")]))
        .unwrap();
    assert_eq!(built, "/files/x/y");
}

#[test]
fn query_modes_control_unknown_parameters() {
    let strict = Router::with_options(
        vec![RouteDefinition::new("search", "/search?q&page")],
        RouterOptions {
            query_params_mode: QueryParamsMode::Strict,
            ..RouterOptions::default()
        },
    )
    .unwrap();
    assert!(strict.match_path("/search?q=hi&extra=1", None).is_none());

    let lenient = Router::new(vec![RouteDefinition::new("search", "/search?q&page")]).unwrap();
    let state = lenient.match_path("/search?q=hi&extra=1", None).unwrap();
    assert_eq!(state.params.get("q").unwrap().as_str(), Some("hi"));
    assert!(state.params.get("extra").is_none());
}

#[test]
fn absolute_subroutes_override_the_prefix() {
    let router = Router::new(vec![RouteDefinition::new("users", "/users")
        .child(RouteDefinition::new("admin", "~/admin"))])
    .unwrap();

    let state = router.match_path("/admin", None).unwrap();
    assert_eq!(state.name, "users.admin");
    assert!(router.match_path("/users/admin", None).is_none());
    assert_eq!(
        router.build_path("users.admin", &Params::new()).unwrap(),
        "/admin"
    );
}

#[test]
fn parameterless_routes_round_trip_by_name() {
    let router = Router::new(vec![
        RouteDefinition::new("home", "/"),
        RouteDefinition::new("about", "/about")
            .child(RouteDefinition::new("team", "/team")),
    ])
    .unwrap();

    for name in &["home", "about", "about.team"] {
        let path = router.build_path(name, &Params::new()).unwrap();
        let state = router.match_path(&path, None).unwrap();
        assert_eq!(&state.name, name, "round-trip through `{}`", path);
    }
}

#[test]
fn matched_params_rebuild_the_same_url() {
    let router = Router::new(vec![
        RouteDefinition::new("users", "/users")
            .child(RouteDefinition::new("profile", "/:id")),
        RouteDefinition::new("search", "/search?q"),
    ])
    .unwrap();

    for url in &["/users/42", "/search?q=hello"] {
        let state = router.match_path(url, None).unwrap();
        let rebuilt = router.build_path(&state.name, &state.params).unwrap();
        assert_eq!(&rebuilt, url);
    }
}

#[test]
fn repeated_query_keys_arrive_as_lists() {
    let router = Router::new(vec![RouteDefinition::new("search", "/search?tag")]).unwrap();
    let state = router.match_path("/search?tag=a&tag=b", None).unwrap();
    assert_eq!(
        state.params.get("tag").unwrap(),
        &ParamValue::List(vec!["a".to_owned(), "b".to_owned()])
    );
}

#[test]
fn default_params_fill_matched_states() {
    let router = Router::new(vec![RouteDefinition::new("list", "/list/:page")
        .default_params(params(&[("sort", "asc")]))])
    .unwrap();

    let state = router.match_path("/list/2", None).unwrap();
    assert_eq!(state.params.get("page").unwrap().as_str(), Some("2"));
    assert_eq!(state.params.get("sort").unwrap().as_str(), Some("asc"));
}

#[test]
fn root_path_applies_to_all_matching() {
    let router = Router::new(vec![RouteDefinition::new("users", "/users")]).unwrap();
    router.set_root_path("/app");
    assert_eq!(router.root_path(), "/app");

    assert_eq!(router.match_path("/app/users", None).unwrap().name, "users");
    assert!(router.match_path("/users", None).is_none());

    // Setting is idempotent; the empty string disables stripping.
    router.set_root_path("/app");
    assert_eq!(router.match_path("/app/users", None).unwrap().name, "users");
    router.set_root_path("");
    assert_eq!(router.match_path("/users", None).unwrap().name, "users");
}

#[test]
fn unmatched_start_paths_need_allow_not_found() {
    let router = Router::with_options(
        vec![RouteDefinition::new("home", "/")],
        RouterOptions {
            allow_not_found: true,
            ..RouterOptions::default()
        },
    )
    .unwrap();

    let state = router.start_with_path("/nope").unwrap();
    assert_eq!(state.name, UNKNOWN_ROUTE);
    assert_eq!(state.params.get("path").unwrap().as_str(), Some("/nope"));

    let plain = Router::new(vec![RouteDefinition::new("home", "/")]).unwrap();
    let err = plain.start_with_path("/nope").unwrap_err();
    assert!(matches!(err, NavigationError::NoMatch { .. }));
}

#[test]
fn state_ids_strictly_increase() {
    let router = Router::new(vec![
        RouteDefinition::new("a", "/a"),
        RouteDefinition::new("b", "/b"),
    ])
    .unwrap();

    let first = router.build_state("a", Params::new()).unwrap();
    let second = router.build_state("b", Params::new()).unwrap();
    let third = router.build_state("a", Params::new()).unwrap();
    assert!(first.id < second.id);
    assert!(second.id < third.id);
}

#[test]
fn are_states_equal_honours_query_param_scope() {
    let router = Router::new(vec![RouteDefinition::new("search", "/search/:topic?q")]).unwrap();

    let a = router
        .build_state("search", params(&[("topic", "rust"), ("q", "one")]))
        .unwrap();
    let b = router
        .build_state("search", params(&[("topic", "rust"), ("q", "two")]))
        .unwrap();

    assert!(!router.are_states_equal(&a, &b, false));
    assert!(router.are_states_equal(&a, &b, true));

    let c = router
        .build_state("search", params(&[("topic", "go"), ("q", "one")]))
        .unwrap();
    assert!(!router.are_states_equal(&a, &c, true));
}
