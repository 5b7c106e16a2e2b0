//! User listing and creation.

use crate::app::{accounts, notify_invalid};
use crate::controller::{ActionResult, Args, Controller, RequestContext};
use crate::db::{Criteria, Record, Value};
use crate::http::Response;
use crate::security::{rules, Validator};
use crate::session::Notification;
use crate::view::escape;

#[derive(Debug, Default)]
pub struct UsersController;

impl Controller for UsersController {
    fn call(&mut self, action: &str, ctx: &mut RequestContext<'_>, args: &Args) -> Option<ActionResult> {
        let result = match action {
            "index" => index(ctx),
            "show" => show(ctx, args),
            "new_form" => Ok(new_form()),
            "create" => create(ctx),
            _ => return None,
        };
        Some(result)
    }
}

fn text<'r>(record: &'r Record, column: &str) -> &'r str {
    record.get(column).and_then(Value::as_str).unwrap_or_default()
}

fn index(ctx: &mut RequestContext<'_>) -> ActionResult {
    let users = ctx.model().find_all(
        accounts::USERS_TABLE,
        accounts::PUBLIC_COLUMNS,
        &Criteria::new("1=1 ORDER BY name"),
    )?;

    let rows: String = users
        .iter()
        .map(|user| {
            format!(
                "<tr><td><a href=\"/users/{uuid}\">{name}</a></td><td>{email}</td><td>{role}</td></tr>\n",
                uuid = escape(text(user, "uuid")),
                name = escape(text(user, "name")),
                email = escape(text(user, "email")),
                role = escape(text(user, "role")),
            )
        })
        .collect();

    Ok(Response::page(
        "Users",
        format!(
            "<h1>Users</h1>\n\
             <a class=\"btn btn-primary\" href=\"/users/new\">New user</a>\n\
             <table class=\"table\">\n<thead><tr><th>Name</th><th>E-mail</th><th>Role</th></tr></thead>\n\
             <tbody>\n{rows}</tbody>\n</table>"
        ),
    ))
}

fn show(ctx: &mut RequestContext<'_>, args: &Args) -> ActionResult {
    let uuid = args.require(0)?;
    let user = accounts::find_by_uuid(&ctx.model(), uuid)?;
    if user.is_empty() {
        ctx.notify(Notification::warning("User not found!"));
        return Ok(Response::redirect("/users"));
    }

    Ok(Response::page(
        text(&user, "name"),
        format!(
            "<h1>{name}</h1>\n<dl>\n<dt>E-mail</dt><dd>{email}</dd>\n<dt>Role</dt><dd>{role}</dd>\n</dl>",
            name = escape(text(&user, "name")),
            email = escape(text(&user, "email")),
            role = escape(text(&user, "role")),
        ),
    ))
}

fn new_form() -> Response {
    Response::page(
        "New user",
        "<h1>New user</h1>\n\
         <form method=\"post\" action=\"/users\">\n\
         <input class=\"form-control\" name=\"name\" placeholder=\"Name\">\n\
         <input class=\"form-control\" type=\"email\" name=\"email\" placeholder=\"E-mail\">\n\
         <input class=\"form-control\" type=\"password\" name=\"password\" placeholder=\"Initial password\">\n\
         <button class=\"btn btn-primary\" type=\"submit\">Create</button>\n\
         </form>",
    )
}

fn create(ctx: &mut RequestContext<'_>) -> ActionResult {
    let request = ctx.request;
    let validator = Validator::new(&request.form)
        .validate("name", rules::min_len(3), "Name needs at least 3 characters.")
        .validate("name", rules::max_len(80), "Name is too long.")
        .validate("email", rules::email, "Enter a valid e-mail address.")
        .validate("password", rules::min_len(6), "Initial password needs at least 6 characters.");
    if !validator.passes() {
        notify_invalid(ctx, &validator);
        return Ok(Response::redirect("/users/new"));
    }

    let email = request.form_value("email").unwrap_or_default();
    let model = ctx.model();
    if accounts::email_taken(&model, email)? {
        ctx.notify(Notification::danger("E-mail already registered!"));
        return Ok(Response::redirect("/users/new"));
    }

    let uuid = accounts::create_user(
        &model,
        &accounts::NewUser {
            name: request.form_value("name").unwrap_or_default().trim(),
            email,
            password: request.form_value("password").unwrap_or_default(),
            role: "user",
            must_change_password: true,
            modules: &[],
        },
    )?;

    ctx.notify(Notification::success("User created."));
    Ok(Response::redirect(format!("/users/{uuid}")))
}
