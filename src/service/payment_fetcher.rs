use crate::domain::checkpoint::SyncWindow;
use crate::domain::payment::{PaymentSummary, ProviderPayment};
use crate::error::ProviderError;
use crate::gateways::{PaymentProvider, SearchQuery, SEARCH_RANGE_LAST_UPDATED};
use futures::stream::{self, Stream, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct PaymentFetcher {
    pub provider: Arc<dyn PaymentProvider>,
    pub page_size: u32,
    pub page_delay: Duration,
}

impl PaymentFetcher {
    /// Lazily pages through the search endpoint for `window`, advancing the
    /// offset until a page comes back empty. Items keep provider order and are
    /// yielded even when they only partly decode. The first error ends the
    /// stream.
    pub fn search_window(
        &self,
        window: &SyncWindow,
    ) -> impl Stream<Item = Result<PaymentSummary, ProviderError>> + Send + '_ {
        let begin_date = window.begin_iso();
        let end_date = window.end_iso();
        let limit = self.page_size.max(1);

        stream::try_unfold(0_u32, move |offset| {
            let query = SearchQuery {
                range: SEARCH_RANGE_LAST_UPDATED.to_string(),
                begin_date: begin_date.clone(),
                end_date: end_date.clone(),
                limit,
                offset,
            };
            async move {
                if offset > 0 && !self.page_delay.is_zero() {
                    tokio::time::sleep(self.page_delay).await;
                }
                let page = self.provider.search_payments(&query).await?;
                if page.results.is_empty() {
                    return Ok::<_, ProviderError>(None);
                }
                tracing::debug!("search page offset={} returned {} items", offset, page.results.len());
                Ok(Some((page.results, offset + limit)))
            }
        })
        .map_ok(|results| {
            stream::iter(
                results
                    .into_iter()
                    .map(PaymentSummary::from_value)
                    .map(Ok::<_, ProviderError>),
            )
        })
        .try_flatten()
    }

    /// Materializes the whole window; any search error is returned as-is.
    pub async fn collect_window(&self, window: &SyncWindow) -> Result<Vec<PaymentSummary>, ProviderError> {
        self.search_window(window).try_collect().await
    }

    /// Authoritative record for one id, or `None` when retrieval fails.
    pub async fn fetch_details(&self, payment_id: i64) -> Option<ProviderPayment> {
        let value = match self.provider.payment_details(payment_id).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("could not fetch details for payment {}: {}", payment_id, e);
                return None;
            }
        };

        match ProviderPayment::from_value(value) {
            Ok(p) if p.id == payment_id => Some(p),
            Ok(p) => {
                tracing::warn!("detail for payment {} carried id {}, ignoring", payment_id, p.id);
                None
            }
            Err(e) => {
                tracing::warn!("could not decode details for payment {}: {}", payment_id, e);
                None
            }
        }
    }
}
