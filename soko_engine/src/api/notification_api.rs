use log::*;

use crate::{
    db_types::NewNotification,
    traits::{MarketplaceDatabase, MarketplaceError},
};

/// Persists notifications into the outbound feed. Typically driven from the event hooks rather than called
/// directly.
#[derive(Clone)]
pub struct NotificationApi<B> {
    db: B,
}

impl<B> NotificationApi<B>
where B: MarketplaceDatabase
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn notify(&self, notification: NewNotification) -> Result<(), MarketplaceError> {
        debug!("📨️ Notifying {}: {}", notification.recipient, notification.title);
        self.db.insert_notification(notification).await
    }
}
