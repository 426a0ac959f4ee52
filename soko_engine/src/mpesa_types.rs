//! The Daraja (M-Pesa) wire format.
//!
//! Everything in here mirrors Safaricom's JSON verbatim, PascalCase and all. The engine only ever sees the
//! synchronous [`StkPushResponse`] (via the [`crate::PaymentGateway`] trait) and the asynchronous
//! [`StkCallback`]; the request types are used by the server's gateway client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::PaymentUpdate;

//--------------------------------------    STK push request   -------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct StkPushRequest {
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    /// base64(shortcode + passkey + timestamp)
    #[serde(rename = "Password")]
    pub password: String,
    /// YYYYMMDDHHmmss
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "Amount")]
    pub amount: i64,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "TransactionDesc")]
    pub transaction_desc: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Value,
}

//--------------------------------------   STK push response   -------------------------------------------------------
/// The synchronous acknowledgment of an STK push. `response_code` "0" means the push was accepted and a callback
/// will follow; anything else means the initiation itself failed and no money will move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription", default)]
    pub response_description: String,
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: String,
}

impl StkPushResponse {
    pub fn is_accepted(&self) -> bool {
        self.response_code == "0"
    }
}

//--------------------------------------      STK callback     -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,
    #[serde(rename = "CallbackMetadata", default, skip_serializing_if = "Option::is_none")]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub item: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl StkCallback {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    /// Looks up a named metadata item. Daraja mixes strings and numbers, so everything is stringified.
    pub fn metadata(&self, name: &str) -> Option<String> {
        let items = &self.callback_metadata.as_ref()?.item;
        items.iter().find(|i| i.name == name).and_then(|i| i.value.as_ref()).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

impl From<&StkCallback> for PaymentUpdate {
    fn from(cb: &StkCallback) -> Self {
        Self {
            checkout_request_id: cb.checkout_request_id.clone(),
            result_code: cb.result_code,
            result_desc: cb.result_desc.clone(),
            receipt_number: cb.metadata("MpesaReceiptNumber"),
            transaction_date: cb.metadata("TransactionDate"),
            phone_number: cb.metadata("PhoneNumber"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SUCCESS_CALLBACK: &str = r#"{
      "Body": {
        "stkCallback": {
          "MerchantRequestID": "29115-34620561-1",
          "CheckoutRequestID": "ws_CO_191220191020363925",
          "ResultCode": 0,
          "ResultDesc": "The service request is processed successfully.",
          "CallbackMetadata": {
            "Item": [
              { "Name": "Amount", "Value": 1850.00 },
              { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
              { "Name": "TransactionDate", "Value": 20191219102115 },
              { "Name": "PhoneNumber", "Value": 254708374149 }
            ]
          }
        }
      }
    }"#;

    const FAILURE_CALLBACK: &str = r#"{
      "Body": {
        "stkCallback": {
          "MerchantRequestID": "29115-34620561-1",
          "CheckoutRequestID": "ws_CO_191220191020363925",
          "ResultCode": 1032,
          "ResultDesc": "Request cancelled by user."
        }
      }
    }"#;

    #[test]
    fn parse_success_callback() {
        let env: StkCallbackEnvelope = serde_json::from_str(SUCCESS_CALLBACK).unwrap();
        let cb = env.body.stk_callback;
        assert!(cb.is_success());
        assert_eq!(cb.checkout_request_id, "ws_CO_191220191020363925");
        assert_eq!(cb.metadata("MpesaReceiptNumber").as_deref(), Some("NLJ7RT61SV"));
        assert_eq!(cb.metadata("PhoneNumber").as_deref(), Some("254708374149"));
        let update = PaymentUpdate::from(&cb);
        assert!(update.is_success());
        assert_eq!(update.receipt_number.as_deref(), Some("NLJ7RT61SV"));
    }

    #[test]
    fn parse_failure_callback() {
        let env: StkCallbackEnvelope = serde_json::from_str(FAILURE_CALLBACK).unwrap();
        let cb = env.body.stk_callback;
        assert!(!cb.is_success());
        assert_eq!(cb.metadata("MpesaReceiptNumber"), None);
        let update = PaymentUpdate::from(&cb);
        assert_eq!(update.result_desc, "Request cancelled by user.");
    }
}
