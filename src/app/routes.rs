//! Controller names and the route table.

use crate::app::auth::{AuthController, PASSWORD_PATH};
use crate::app::home::HomeController;
use crate::app::users::UsersController;
use crate::controller::ControllerRegistry;
use crate::routing::{RouteError, Router};
use crate::security::guards::LOGIN_PATH;

pub fn registry() -> ControllerRegistry {
    let mut registry = ControllerRegistry::new();
    registry
        .register::<HomeController>("Home")
        .register::<AuthController>("Auth")
        .register::<UsersController>("Users");
    registry
}

/// Declare every application route on `router`.
pub fn register(router: &mut Router) -> Result<(), RouteError> {
    const GUEST: &[&str] = &["Middleware::Guest"];
    const SIGNED_IN: &[&str] = &["Middleware::SignedIn"];
    const USERS: &[&str] = &["Middleware::Auth", "Middleware::Permission:USERS"];
    const ADMIN: &[&str] = &["Middleware::Auth", "Middleware::Permission:USERS", "Middleware::Admin"];

    router
        .get("/", ("Home", "index"), &[])?
        .get(LOGIN_PATH, ("Auth", "login_form"), GUEST)?
        .post(LOGIN_PATH, ("Auth", "login"), GUEST)?
        .post("/auth/logout", ("Auth", "logout"), SIGNED_IN)?
        .get(PASSWORD_PATH, ("Auth", "password_form"), &["Middleware::CanChangePassword"])?
        .post(PASSWORD_PATH, ("Auth", "change_password"), &["Middleware::canChangePassword"])?
        .get("/users", ("Users", "index"), USERS)?
        // Before /users/{uuid}: first match wins.
        .get("/users/new", ("Users", "new_form"), ADMIN)?
        .get("/users/{uuid}", ("Users", "show"), USERS)?
        .post("/users", ("Users", "create"), ADMIN)?;
    Ok(())
}

/// Registry plus route table, ready to serve.
pub fn build_router() -> Result<Router, RouteError> {
    let mut router = Router::new(registry());
    register(&mut router)?;
    tracing::info!(routes = router.routes().len(), "Routes registered");
    Ok(router)
}
