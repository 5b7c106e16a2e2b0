//! Page shell and error pages.

use axum::http::StatusCode;

use crate::session::Notification;

/// Escape text for safe inclusion in HTML content and attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Dismissible alert markup for one notification.
pub fn notification_html(notification: &Notification) -> String {
    format!(
        "<div class=\"alert alert-{} alert-dismissible fade show\" role=\"alert\" style=\"margin-top: 20px;\">\
         {}<button type=\"button\" class=\"btn-close\" data-bs-dismiss=\"alert\" aria-label=\"Close\"></button></div>",
        notification.kind,
        escape(&notification.message)
    )
}

/// Full HTML document: shell, notifications block, then `content`.
///
/// `content` is trusted markup produced by the application.
pub fn render_page(title: &str, content: &str, notifications: &[Notification]) -> String {
    let alerts: String = notifications.iter().map(notification_html).collect();
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n\
         <link rel=\"stylesheet\" href=\"/assets/css/bootstrap.min.css\">\n\
         </head>\n\
         <body class=\"bg-body-tertiary\">\n\
         <main class=\"container\">\n\
         {}\n\
         {}\n\
         </main>\n\
         <script src=\"/assets/js/bootstrap.bundle.min.js\"></script>\n\
         </body>\n\
         </html>\n",
        escape(title),
        alerts,
        content
    )
}

pub fn not_found_content() -> String {
    "<h1 class=\"text-danger\">404</h1>\n\
     <p>Sorry, the page you are looking for could not be found.</p>\n\
     <a class=\"btn btn-primary\" href=\"javascript:history.back()\">Back to the previous page</a>"
        .to_string()
}

pub fn error_content(status: StatusCode, message: &str) -> String {
    format!(
        "<h1 class=\"text-danger\">{}</h1>\n<p>{}</p>",
        status.as_u16(),
        escape(message)
    )
}
