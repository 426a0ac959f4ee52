//! The Daraja (M-Pesa) STK push client.
//!
//! Implements [`PaymentGateway`] over Safaricom's REST API: an OAuth client-credentials token fetch followed by
//! the `stkpush/v1/processrequest` call. The asynchronous result comes back on our callback URL and never passes
//! through this module.
use log::*;
use reqwest::Client;
use soko_common::Money;
use soko_engine::{
    mpesa_types::{AccessTokenResponse, StkPushRequest, StkPushResponse},
    PaymentGateway,
    PaymentGatewayError,
};

use crate::config::DarajaConfig;

#[derive(Clone)]
pub struct DarajaGateway {
    config: DarajaConfig,
    client: Client,
}

impl DarajaGateway {
    pub fn new(config: DarajaConfig) -> Self {
        Self { config, client: Client::new() }
    }

    async fn access_token(&self) -> Result<String, PaymentGatewayError> {
        let url = format!("{}/oauth/v1/generate?grant_type=client_credentials", self.config.base_url);
        let credentials =
            base64::encode(format!("{}:{}", self.config.consumer_key, self.config.consumer_secret.reveal()));
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Basic {credentials}"))
            .send()
            .await
            .map_err(|e| PaymentGatewayError::RequestFailed(e.to_string()))?;
        let token: AccessTokenResponse =
            response.json().await.map_err(|e| PaymentGatewayError::RequestFailed(e.to_string()))?;
        Ok(token.access_token)
    }
}

impl PaymentGateway for DarajaGateway {
    async fn initiate_stk_push(
        &self,
        amount: Money,
        phone: &str,
        account_ref: &str,
    ) -> Result<StkPushResponse, PaymentGatewayError> {
        let token = self.access_token().await?;
        let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
        let password = base64::encode(format!(
            "{}{}{}",
            self.config.business_short_code,
            self.config.passkey.reveal(),
            timestamp
        ));
        let request = StkPushRequest {
            business_short_code: self.config.business_short_code.clone(),
            password,
            timestamp,
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount: amount.value(),
            party_a: phone.to_string(),
            party_b: self.config.business_short_code.clone(),
            phone_number: phone.to_string(),
            callback_url: self.config.callback_url.clone(),
            account_reference: account_ref.to_string(),
            transaction_desc: format!("Soko order {account_ref}"),
        };
        debug!("💰️ Sending STK push of {amount} to {phone}");
        let response = self
            .client
            .post(format!("{}/mpesa/stkpush/v1/processrequest", self.config.base_url))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PaymentGatewayError::RequestFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("💰️ Daraja refused the STK push ({status}): {body}");
            return Err(PaymentGatewayError::Rejected { code: status.as_str().to_string(), message: body });
        }
        let push: StkPushResponse =
            response.json().await.map_err(|e| PaymentGatewayError::RequestFailed(e.to_string()))?;
        if !push.is_accepted() {
            return Err(PaymentGatewayError::Rejected {
                code: push.response_code.clone(),
                message: push.response_description.clone(),
            });
        }
        Ok(push)
    }
}
