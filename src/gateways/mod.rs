use crate::error::ProviderError;

pub mod mercadopago;
pub mod mock;

pub const SEARCH_RANGE_LAST_UPDATED: &str = "date_last_updated";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub range: String,
    pub begin_date: String,
    pub end_date: String,
    pub limit: u32,
    pub offset: u32,
}

/// One page of search results, still as untyped provider objects so a single
/// malformed item cannot fail the whole page.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub results: Vec<serde_json::Value>,
}

#[async_trait::async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search_payments(&self, query: &SearchQuery) -> Result<SearchPage, ProviderError>;

    async fn payment_details(&self, payment_id: i64) -> Result<serde_json::Value, ProviderError>;

    /// Display nickname from the user profile, `Ok(None)` if the profile has none.
    async fn user_nickname(&self, user_id: &str) -> Result<Option<String>, ProviderError>;
}
