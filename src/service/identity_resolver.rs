use crate::gateways::PaymentProvider;
use std::sync::Arc;

#[derive(Clone)]
pub struct IdentityResolver {
    pub provider: Arc<dyn PaymentProvider>,
}

impl IdentityResolver {
    /// Best-effort nickname lookup; any failure yields `None`.
    pub async fn resolve_nickname(&self, user_id: &str) -> Option<String> {
        if user_id.trim().is_empty() {
            return None;
        }
        match self.provider.user_nickname(user_id).await {
            Ok(nickname) => nickname,
            Err(e) => {
                tracing::warn!("could not resolve nickname for user {}: {}", user_id, e);
                None
            }
        }
    }
}
