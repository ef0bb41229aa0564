//! Twilio REST client for phone-number provisioning

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TwilioError};

const API_BASE_URL: &str = "https://api.twilio.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Twilio API client
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    base_url: String,
}

/// Account details
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub sid: String,
    pub friendly_name: String,
    pub status: String,
}

/// A number offered for purchase
#[derive(Debug, Clone, Deserialize)]
pub struct AvailableNumber {
    pub phone_number: String,
    pub friendly_name: String,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// A number owned by the account
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingNumber {
    pub sid: String,
    pub phone_number: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub voice_url: Option<String>,
    #[serde(default)]
    pub status_callback: Option<String>,
}

/// Filters for the available-number search
#[derive(Debug, Clone)]
pub struct NumberSearch {
    pub country: String,
    pub area_code: Option<u16>,
    pub limit: u32,
}

impl Default for NumberSearch {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            area_code: None,
            limit: 5,
        }
    }
}

/// Purchase payload; both webhooks are configured for POST
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PurchaseRequest {
    pub phone_number: String,
    pub voice_url: String,
    pub voice_method: String,
    pub status_callback: String,
    pub status_callback_method: String,
}

impl PurchaseRequest {
    pub fn new(phone_number: &str, voice_url: &str, status_callback: &str) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            voice_url: voice_url.to_string(),
            voice_method: "POST".to_string(),
            status_callback: status_callback.to_string(),
            status_callback_method: "POST".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct AvailableNumbersPage {
    available_phone_numbers: Vec<AvailableNumber>,
}

#[derive(Deserialize)]
struct IncomingNumbersPage {
    incoming_phone_numbers: Vec<IncomingNumber>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl TwilioClient {
    /// Create a new Twilio client; demo placeholders count as unset
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Result<Self> {
        let account_sid = account_sid.into();
        let auth_token = auth_token.into();

        if account_sid.trim().is_empty()
            || auth_token.trim().is_empty()
            || account_sid.starts_with("demo_")
            || auth_token.starts_with("demo_")
        {
            return Err(TwilioError::CredentialsNotSet);
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            account_sid,
            auth_token,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Point the client at another API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn account_url(&self, path: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}{}",
            self.base_url, self.account_sid, path
        )
    }

    /// Fetch the account these credentials belong to
    pub async fn fetch_account(&self) -> Result<Account> {
        let url = self.account_url(".json");
        self.send(self.client.get(&url)).await
    }

    /// Search local numbers available for purchase
    pub async fn search_local_numbers(&self, search: &NumberSearch) -> Result<Vec<AvailableNumber>> {
        let url = self.account_url(&format!(
            "/AvailablePhoneNumbers/{}/Local.json",
            search.country
        ));

        let mut query = vec![("PageSize", search.limit.to_string())];
        if let Some(area_code) = search.area_code {
            query.push(("AreaCode", area_code.to_string()));
        }

        let page: AvailableNumbersPage = self.send(self.client.get(&url).query(&query)).await?;
        debug!(
            "Found {} available numbers in {}",
            page.available_phone_numbers.len(),
            search.country
        );
        Ok(page.available_phone_numbers)
    }

    /// Buy a number and point its webhooks at this service
    pub async fn purchase_number(&self, request: &PurchaseRequest) -> Result<IncomingNumber> {
        info!("Purchasing Twilio number {}", request.phone_number);

        let url = self.account_url("/IncomingPhoneNumbers.json");
        self.send(self.client.post(&url).form(request)).await
    }

    /// Numbers owned by the account
    pub async fn incoming_numbers(&self) -> Result<Vec<IncomingNumber>> {
        let url = self.account_url("/IncomingPhoneNumbers.json");
        let page: IncomingNumbersPage = self.send(self.client.get(&url)).await?;
        Ok(page.incoming_phone_numbers)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(TwilioError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| TwilioError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = TwilioClient::new("AC123", "token123").unwrap();
        assert_eq!(
            client.account_url("/IncomingPhoneNumbers.json"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/IncomingPhoneNumbers.json"
        );
    }

    #[test]
    fn test_demo_credentials_rejected() {
        assert!(matches!(
            TwilioClient::new("demo_account_sid", "demo_auth_token"),
            Err(TwilioError::CredentialsNotSet)
        ));
        assert!(matches!(
            TwilioClient::new("AC123", ""),
            Err(TwilioError::CredentialsNotSet)
        ));
    }

    #[test]
    fn test_custom_base_url() {
        let client = TwilioClient::new("AC123", "token123")
            .unwrap()
            .with_base_url("http://127.0.0.1:9999/");
        assert_eq!(
            client.account_url(".json"),
            "http://127.0.0.1:9999/2010-04-01/Accounts/AC123.json"
        );
    }

    #[test]
    fn test_purchase_request_form_fields() {
        let request = PurchaseRequest::new(
            "+15550001111",
            "https://ivr.example.com/voice",
            "https://ivr.example.com/call_status",
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["PhoneNumber"], "+15550001111");
        assert_eq!(value["VoiceUrl"], "https://ivr.example.com/voice");
        assert_eq!(value["VoiceMethod"], "POST");
        assert_eq!(value["StatusCallback"], "https://ivr.example.com/call_status");
        assert_eq!(value["StatusCallbackMethod"], "POST");
    }

    #[test]
    fn test_parse_available_numbers() {
        let body = r#"{
            "available_phone_numbers": [
                {"phone_number": "+15550001111", "friendly_name": "(555) 000-1111",
                 "locality": "Springfield", "region": "IL", "capabilities": {"voice": true}}
            ],
            "uri": "/2010-04-01/Accounts/AC123/AvailablePhoneNumbers/US/Local.json"
        }"#;
        let page: AvailableNumbersPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.available_phone_numbers.len(), 1);
        assert_eq!(page.available_phone_numbers[0].locality.as_deref(), Some("Springfield"));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_http_error() {
        let client = TwilioClient::new("AC123", "token123")
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let result = client.fetch_account().await;
        assert!(matches!(result, Err(TwilioError::Http(_))));
    }
}
