//! Per-visitor session state.

use crate::db::Record;
use crate::session::notification::Notification;

/// Access flag for one application module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub module: String,
    pub access: bool,
}

impl Permission {
    pub fn new(module: impl Into<String>, access: bool) -> Self {
        Self {
            module: module.into(),
            access,
        }
    }
}

/// Everything remembered about one visitor between requests.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Authenticated user record, if logged in.
    pub user: Option<Record>,
    pub permissions: Vec<Permission>,
    /// Set while the user must change their password before continuing.
    pub allowed_update_password: bool,
    pub role: Option<String>,
    pub(crate) flash: Vec<Notification>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Access for `module`, decided by the first matching permission entry.
    pub fn has_permission(&self, module: &str) -> bool {
        self.permissions
            .iter()
            .find(|p| p.module == module)
            .map(|p| p.access)
            .unwrap_or(false)
    }

    /// Nothing worth remembering between requests.
    pub fn is_empty(&self) -> bool {
        self.user.is_none()
            && self.permissions.is_empty()
            && !self.allowed_update_password
            && self.role.is_none()
            && self.flash.is_empty()
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    pub fn log_in(&mut self, user: Record, permissions: Vec<Permission>, role: Option<String>) {
        self.user = Some(user);
        self.permissions = permissions;
        self.role = role;
        self.allowed_update_password = false;
    }

    /// Forget the user; pending notifications survive.
    pub fn log_out(&mut self) {
        self.user = None;
        self.permissions.clear();
        self.role = None;
        self.allowed_update_password = false;
    }

    /// Keep notifications for the next rendered page.
    pub fn flash(&mut self, notifications: impl IntoIterator<Item = Notification>) {
        self.flash.extend(notifications);
    }

    /// Remove and return the flashed notifications.
    pub fn take_flash(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.flash)
    }

    pub fn pending_flash(&self) -> &[Notification] {
        &self.flash
    }
}
