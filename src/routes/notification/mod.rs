mod handler;
mod model;

pub use handler::{list_notifications, notify};
pub use model::{NotificationsQuery, NotifyRequest, RateLimitedResponse};
