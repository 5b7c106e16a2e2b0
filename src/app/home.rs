use crate::controller::{ActionResult, Args, Controller, RequestContext};
use crate::http::Response;
use crate::view::escape;

#[derive(Debug, Default)]
pub struct HomeController;

impl Controller for HomeController {
    fn call(&mut self, action: &str, ctx: &mut RequestContext<'_>, _args: &Args) -> Option<ActionResult> {
        match action {
            "index" => Some(Ok(index(ctx))),
            _ => None,
        }
    }
}

fn index(ctx: &RequestContext<'_>) -> Response {
    let name = ctx
        .session
        .user
        .as_ref()
        .and_then(|user| user.get("name"))
        .and_then(|name| name.as_str());

    let content = match name {
        Some(name) => format!(
            "<h1>Welcome, {}</h1>\n\
             <p><a href=\"/users\">Users</a></p>\n\
             <form method=\"post\" action=\"/auth/logout\"><button class=\"btn btn-secondary\">Sign out</button></form>",
            escape(name)
        ),
        None => "<h1>Welcome</h1>\n<p><a class=\"btn btn-primary\" href=\"/auth/login\">Sign in</a></p>".to_string(),
    };
    Response::page("Home", content)
}
