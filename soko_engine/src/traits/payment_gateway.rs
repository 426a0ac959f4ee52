use soko_common::Money;
use thiserror::Error;

use crate::mpesa_types::StkPushResponse;

/// The synchronous half of the mobile-money boundary. Implementations send the push-payment request to the
/// buyer's phone; the asynchronous result arrives later as an HTTP callback and is handled by
/// [`crate::OrderFlowApi::handle_payment_callback`].
///
/// `account_ref` is the caller-supplied correlation id (the pre-allocated order id). The returned
/// `checkout_request_id` is the gateway's own correlation handle and is what the callback will carry.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    async fn initiate_stk_push(
        &self,
        amount: Money,
        phone: &str,
        account_ref: &str,
    ) -> Result<StkPushResponse, PaymentGatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    /// The gateway could not be reached, timed out, or answered with garbage.
    #[error("Payment gateway request failed. {0}")]
    RequestFailed(String),
    /// The gateway answered, but refused the push.
    #[error("{message}")]
    Rejected { code: String, message: String },
}
