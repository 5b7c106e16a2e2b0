//! Per-request context passed to guards and actions.

use crate::db::{Connection, Model};
use crate::http::Request;
use crate::session::{Notification, Session};

/// Everything an action may touch while handling one request.
pub struct RequestContext<'a> {
    pub request: &'a Request,
    pub session: &'a mut Session,
    pub db: &'a Connection,
    transactional_writes: bool,
    notifications: Vec<Notification>,
}

impl<'a> RequestContext<'a> {
    /// Start a context; notifications flashed by the previous request are
    /// taken out of the session here.
    pub fn new(request: &'a Request, session: &'a mut Session, db: &'a Connection) -> Self {
        let notifications = session.take_flash();
        Self {
            request,
            session,
            db,
            transactional_writes: false,
            notifications,
        }
    }

    pub fn with_transactional_writes(mut self, enabled: bool) -> Self {
        self.transactional_writes = enabled;
        self
    }

    /// Record accessor configured for this request.
    pub fn model(&self) -> Model<'a> {
        Model::new(self.db).with_transactions(self.transactional_writes)
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Hand the pending notifications to the renderer.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
