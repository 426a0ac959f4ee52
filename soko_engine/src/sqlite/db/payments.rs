use log::*;
use sqlx::SqliteConnection;

use crate::{db_types::PaymentUpdate, traits::MarketplaceError};

/// Appends the callback to the processed-callback log. Returns true on first sight of this checkout request id,
/// false on a replay. Runs inside the same transaction as the order update, so "logged" and "applied" cannot
/// diverge.
pub async fn record_callback(
    update: &PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceError> {
    let inserted = sqlx::query(
        "INSERT INTO payment_callbacks (checkout_request_id, result_code, result_desc, receipt_number) VALUES \
         ($1, $2, $3, $4) ON CONFLICT (checkout_request_id) DO NOTHING",
    )
    .bind(&update.checkout_request_id)
    .bind(update.result_code)
    .bind(&update.result_desc)
    .bind(&update.receipt_number)
    .execute(conn)
    .await?
    .rows_affected();
    if inserted == 0 {
        debug!("💰️ Callback for {} has been seen before", update.checkout_request_id);
    }
    Ok(inserted == 1)
}
