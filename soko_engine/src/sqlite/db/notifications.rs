use sqlx::SqliteConnection;

use crate::{db_types::NewNotification, traits::MarketplaceError};

pub async fn insert_notification(
    notification: &NewNotification,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    sqlx::query(
        "INSERT INTO notifications (recipient, notification_type, title, message, related_id) VALUES ($1, $2, \
         $3, $4, $5)",
    )
    .bind(&notification.recipient)
    .bind(&notification.notification_type)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(&notification.related_id)
    .execute(conn)
    .await?;
    Ok(())
}
