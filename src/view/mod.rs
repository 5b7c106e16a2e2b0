//! Server-side HTML rendering.
//!
//! Only the page shell, notification alerts and the error pages live here;
//! controllers build their own inner markup with [`escape`].

pub mod page;

pub use page::{error_content, escape, not_found_content, notification_html, render_page};
