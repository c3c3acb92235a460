use crate::error::ProviderError;
use crate::gateways::{PaymentProvider, SearchPage, SearchQuery};
use std::collections::HashMap;
use std::sync::Mutex;

/// Scripted in-memory provider.
///
/// Search pages are served by `offset / limit`; anything past the scripted
/// pages is an empty page. Ids without a scripted detail answer fail with
/// HTTP 500, users without a scripted nickname fail with HTTP 404.
#[derive(Default)]
pub struct MockProvider {
    pages: Vec<Vec<serde_json::Value>>,
    search_failure: Option<MockFailure>,
    details: HashMap<i64, serde_json::Value>,
    nicknames: HashMap<String, String>,
    search_log: Mutex<Vec<SearchQuery>>,
    detail_log: Mutex<Vec<i64>>,
    user_log: Mutex<Vec<String>>,
}

#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    Unauthorized,
    Status(u16),
    Network,
}

impl MockFailure {
    fn to_error(self) -> ProviderError {
        match self {
            MockFailure::Unauthorized => ProviderError::Unauthorized,
            MockFailure::Status(status) => ProviderError::Http {
                status,
                body: "mock failure".to_string(),
            },
            MockFailure::Network => ProviderError::Network("mock connection reset".to_string()),
        }
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, results: Vec<serde_json::Value>) -> Self {
        self.pages.push(results);
        self
    }

    /// Fails every search request, including the first page.
    pub fn with_search_failure(mut self, failure: MockFailure) -> Self {
        self.search_failure = Some(failure);
        self
    }

    pub fn with_details(mut self, payment_id: i64, payment: serde_json::Value) -> Self {
        self.details.insert(payment_id, payment);
        self
    }

    pub fn with_nickname(mut self, user_id: &str, nickname: &str) -> Self {
        self.nicknames.insert(user_id.to_string(), nickname.to_string());
        self
    }

    pub fn search_requests(&self) -> Vec<SearchQuery> {
        self.search_log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn detail_requests(&self) -> Vec<i64> {
        self.detail_log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn user_requests(&self) -> Vec<String> {
        self.user_log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PaymentProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search_payments(&self, query: &SearchQuery) -> Result<SearchPage, ProviderError> {
        if let Ok(mut log) = self.search_log.lock() {
            log.push(query.clone());
        }
        if let Some(failure) = self.search_failure {
            return Err(failure.to_error());
        }

        let index = (query.offset / query.limit.max(1)) as usize;
        Ok(SearchPage {
            results: self.pages.get(index).cloned().unwrap_or_default(),
        })
    }

    async fn payment_details(&self, payment_id: i64) -> Result<serde_json::Value, ProviderError> {
        if let Ok(mut log) = self.detail_log.lock() {
            log.push(payment_id);
        }
        self.details
            .get(&payment_id)
            .cloned()
            .ok_or_else(|| MockFailure::Status(500).to_error())
    }

    async fn user_nickname(&self, user_id: &str) -> Result<Option<String>, ProviderError> {
        if let Ok(mut log) = self.user_log.lock() {
            log.push(user_id.to_string());
        }
        self.nicknames
            .get(user_id)
            .cloned()
            .map(Some)
            .ok_or_else(|| MockFailure::Status(404).to_error())
    }
}
