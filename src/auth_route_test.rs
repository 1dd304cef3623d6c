use super::*;

#[test]
fn exact_paths_resolve() {
    assert_eq!(AuthRoute::from_path("/login"), Some(AuthRoute::Login));
    assert_eq!(AuthRoute::from_path("/login_guest"), Some(AuthRoute::LoginGuest));
    assert_eq!(AuthRoute::from_path("/registration"), Some(AuthRoute::Registration));
}

#[test]
fn query_fragment_and_trailing_slash_are_ignored() {
    assert_eq!(AuthRoute::from_path("/login?next=/chat"), Some(AuthRoute::Login));
    assert_eq!(AuthRoute::from_path("/login_guest/"), Some(AuthRoute::LoginGuest));
    assert_eq!(AuthRoute::from_path("/registration#form"), Some(AuthRoute::Registration));
    assert_eq!(AuthRoute::from_path("login"), Some(AuthRoute::Login));
}

#[test]
fn substring_collisions_do_not_match() {
    for path in ["/login_history", "/admin/login", "/relogin", "/registration/verify", "/fetchuser", "/", ""] {
        assert_eq!(AuthRoute::from_path(path), None, "{path:?} must not be an auth route");
    }
}

#[test]
fn every_route_round_trips_through_its_path() {
    for route in AuthRoute::ALL {
        assert_eq!(AuthRoute::from_path(route.path()), Some(route));
    }
}
