use crate::domain::payment::{PaymentRecord, ProviderPayment};
use crate::repo::payments_repo::PaymentsRepo;
use crate::service::identity_resolver::IdentityResolver;
use anyhow::Result;

#[derive(Clone)]
pub struct Reconciler {
    pub payments_repo: PaymentsRepo,
    pub identity_resolver: IdentityResolver,
}

impl Reconciler {
    /// Payer name from the payload, or the profile nickname when both name
    /// parts are absent.
    pub async fn payer_name(&self, payment: &ProviderPayment) -> Option<String> {
        if let Some(name) = payment.payer_full_name() {
            return Some(name);
        }
        match payment.payer_id() {
            Some(user_id) => self.identity_resolver.resolve_nickname(user_id).await,
            None => None,
        }
    }

    pub async fn upsert(&self, payment: &ProviderPayment) -> Result<PaymentRecord> {
        let payer_name = self.payer_name(payment).await;
        let record = PaymentRecord::from_provider(payment, payer_name, chrono::Utc::now());
        self.payments_repo.upsert(&record).await?;
        Ok(record)
    }
}
