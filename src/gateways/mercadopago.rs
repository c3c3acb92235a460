use crate::config::{ProviderCredentials, ProviderTimeouts};
use crate::error::ProviderError;
use crate::gateways::{PaymentProvider, SearchPage, SearchQuery};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

pub struct MercadoPagoProvider {
    pub base_url: String,
    pub credentials: ProviderCredentials,
    pub timeouts: ProviderTimeouts,
    pub client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub nickname: Option<String>,
}

impl MercadoPagoProvider {
    pub fn new(base_url: String, credentials: ProviderCredentials, timeouts: ProviderTimeouts) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            timeouts,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T, ProviderError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.credentials.access_token)
            .query(query)
            .timeout(timeout)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl PaymentProvider for MercadoPagoProvider {
    fn name(&self) -> &'static str {
        "mercadopago"
    }

    async fn search_payments(&self, query: &SearchQuery) -> Result<SearchPage, ProviderError> {
        let url = format!("{}/v1/payments/search", self.base_url);
        let params = [
            ("range", query.range.clone()),
            ("begin_date", query.begin_date.clone()),
            ("end_date", query.end_date.clone()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        // A `null` body or `null` results end pagination like an empty page.
        let body: Option<SearchResponse> = self.get_json(url, &params, self.timeouts.search).await?;
        Ok(SearchPage {
            results: body.and_then(|b| b.results).unwrap_or_default(),
        })
    }

    async fn payment_details(&self, payment_id: i64) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/v1/payments/{}", self.base_url, payment_id);
        self.get_json(url, &[], self.timeouts.detail).await
    }

    async fn user_nickname(&self, user_id: &str) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        let profile: UserProfile = self.get_json(url, &[], self.timeouts.user).await?;
        Ok(profile.nickname.filter(|n| !n.trim().is_empty()))
    }
}
