//! Sign-in, sign-out and password change.

use crate::app::{accounts, notify_invalid};
use crate::controller::{ActionResult, Args, Controller, RequestContext};
use crate::db::{Criteria, Value};
use crate::http::Response;
use crate::security::guards::LOGIN_PATH;
use crate::security::{rules, Validator};
use crate::session::Notification;

pub const PASSWORD_PATH: &str = "/auth/password";

/// Shortest password accepted on change.
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Default)]
pub struct AuthController;

impl Controller for AuthController {
    fn call(&mut self, action: &str, ctx: &mut RequestContext<'_>, _args: &Args) -> Option<ActionResult> {
        let result = match action {
            "login_form" => Ok(login_form()),
            "login" => login(ctx),
            "logout" => Ok(logout(ctx)),
            "password_form" => Ok(password_form()),
            "change_password" => change_password(ctx),
            _ => return None,
        };
        Some(result)
    }
}

fn login_form() -> Response {
    Response::page(
        "Sign in",
        format!(
            "<h1>Sign in</h1>\n\
             <form method=\"post\" action=\"{LOGIN_PATH}\">\n\
             <input class=\"form-control\" type=\"email\" name=\"email\" placeholder=\"E-mail\">\n\
             <input class=\"form-control\" type=\"password\" name=\"password\" placeholder=\"Password\">\n\
             <button class=\"btn btn-primary\" type=\"submit\">Sign in</button>\n\
             </form>"
        ),
    )
}

fn login(ctx: &mut RequestContext<'_>) -> ActionResult {
    let request = ctx.request;
    let validator = Validator::new(&request.form)
        .validate("email", rules::email, "Enter a valid e-mail address.")
        .validate("password", rules::required, "Enter your password.");
    if !validator.passes() {
        notify_invalid(ctx, &validator);
        return Ok(Response::redirect(LOGIN_PATH));
    }

    let email = request.form_value("email").unwrap_or_default();
    let password = request.form_value("password").unwrap_or_default();
    let model = ctx.model();

    let Some(user) = accounts::authenticate(&model, email, password)? else {
        tracing::info!(email, "Sign-in refused");
        ctx.notify(Notification::danger("Invalid e-mail or password!"));
        return Ok(Response::redirect(LOGIN_PATH));
    };

    let uuid = user.get("uuid").and_then(Value::as_str).unwrap_or_default().to_string();
    let name = user.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let role = user.get("role").and_then(Value::as_str).map(str::to_string);
    let must_change = user.get("must_change_password").is_some_and(Value::as_bool);
    let permissions = accounts::permissions_for(&model, &uuid)?;

    ctx.session.log_in(user, permissions, role);
    tracing::info!(uuid = %uuid, "User signed in");

    if must_change {
        ctx.session.allowed_update_password = true;
        ctx.notify(Notification::info("Choose a new password before continuing."));
        return Ok(Response::redirect(PASSWORD_PATH));
    }

    ctx.notify(Notification::success(format!("Welcome, {name}!")));
    Ok(Response::redirect("/"))
}

fn logout(ctx: &mut RequestContext<'_>) -> Response {
    ctx.session.log_out();
    ctx.notify(Notification::info("You have been signed out."));
    Response::redirect(LOGIN_PATH)
}

fn password_form() -> Response {
    Response::page(
        "Change password",
        format!(
            "<h1>Change password</h1>\n\
             <form method=\"post\" action=\"{PASSWORD_PATH}\">\n\
             <input class=\"form-control\" type=\"password\" name=\"password\" placeholder=\"New password\">\n\
             <input class=\"form-control\" type=\"password\" name=\"confirm\" placeholder=\"Repeat password\">\n\
             <button class=\"btn btn-primary\" type=\"submit\">Save</button>\n\
             </form>"
        ),
    )
}

fn change_password(ctx: &mut RequestContext<'_>) -> ActionResult {
    let request = ctx.request;
    let password = request.form_value("password");
    let validator = Validator::new(&request.form)
        .validate(
            "password",
            rules::min_len(MIN_PASSWORD_LEN),
            "Passwords need at least 8 characters.",
        )
        .validate("confirm", rules::matches(password), "Passwords do not match.");
    if !validator.passes() {
        notify_invalid(ctx, &validator);
        return Ok(Response::redirect(PASSWORD_PATH));
    }

    let uuid = ctx
        .session
        .user
        .as_ref()
        .and_then(|user| user.get("uuid"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let fields = accounts::password_fields(password.unwrap_or_default()).with("must_change_password", false);
    let criteria = Criteria::new("uuid = :uuid").bind("uuid", uuid.as_str());
    ctx.model().update(accounts::USERS_TABLE, &fields, &criteria)?;

    ctx.session.allowed_update_password = false;
    if let Some(user) = ctx.session.user.as_mut() {
        user.insert("must_change_password".to_string(), Value::from(false));
    }
    tracing::info!(uuid = %uuid, "Password changed");

    ctx.notify(Notification::success("Password updated."));
    Ok(Response::redirect("/"))
}
