use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_CURRENCY: &str = "ARS";
pub const SOURCE_API: &str = "api";

/// Provider ids arrive either as JSON numbers or as numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Num(i64),
    Str(String),
}

impl RawId {
    fn into_payment_id(self) -> Result<i64, String> {
        match self {
            RawId::Num(n) => Ok(n),
            RawId::Str(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("payment id is not numeric: {s:?}")),
        }
    }
}

fn de_payment_id<'de, D>(d: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(d)?
        .into_payment_id()
        .map_err(serde::de::Error::custom)
}

/// The payment id of an untyped provider object, independent of whether the
/// rest of the object decodes.
pub fn payment_id_of(value: &serde_json::Value) -> Option<i64> {
    let id = value.get("id")?;
    RawId::deserialize(id).ok()?.into_payment_id().ok()
}

fn de_opt_id<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawId>::deserialize(d)? {
        Some(RawId::Num(n)) => Some(n.to_string()),
        Some(RawId::Str(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderPayer {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// A payment as returned by the provider, either a search summary or a full
/// detail object. Unknown keys are ignored but kept in `raw`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderPayment {
    #[serde(deserialize_with = "de_payment_id")]
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub transaction_amount: Option<f64>,
    #[serde(default)]
    pub currency_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_approved: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub payer: Option<ProviderPayer>,
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl ProviderPayment {
    /// Id-only payment carrying the original payload, for objects whose other
    /// fields could not be decoded.
    pub fn minimal(id: i64, raw: serde_json::Value) -> Self {
        Self {
            id,
            status: None,
            status_detail: None,
            transaction_amount: None,
            currency_id: None,
            description: None,
            external_reference: None,
            payment_method_id: None,
            date_created: None,
            date_approved: None,
            receipt_url: None,
            payer: None,
            raw,
        }
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut payment: ProviderPayment = serde_json::from_value(value.clone())?;
        payment.raw = value;
        Ok(payment)
    }

    /// "first last" trimmed, or `None` when both parts are missing or blank.
    pub fn payer_full_name(&self) -> Option<String> {
        let payer = self.payer.as_ref()?;
        let joined = [payer.first_name.as_deref(), payer.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }

    pub fn payer_id(&self) -> Option<&str> {
        self.payer.as_ref().and_then(|p| p.id.as_deref())
    }

    pub fn payer_email(&self) -> Option<&str> {
        self.payer.as_ref().and_then(|p| p.email.as_deref())
    }
}

/// One search result as observed, before detail retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSummary {
    pub id: Option<i64>,
    pub payment: Option<ProviderPayment>,
    pub raw: serde_json::Value,
    pub decode_error: Option<String>,
}

impl PaymentSummary {
    pub fn from_value(value: serde_json::Value) -> Self {
        let id = payment_id_of(&value);
        match ProviderPayment::from_value(value.clone()) {
            Ok(payment) => Self {
                id: Some(payment.id),
                payment: Some(payment),
                raw: value,
                decode_error: None,
            },
            Err(e) => Self {
                id,
                payment: None,
                raw: value,
                decode_error: Some(e.to_string()),
            },
        }
    }

    /// Best record available without the detail endpoint.
    pub fn fallback_payment(&self) -> Option<ProviderPayment> {
        match (&self.payment, self.id) {
            (Some(p), _) => Some(p.clone()),
            (None, Some(id)) => Some(ProviderPayment::minimal(id, self.raw.clone())),
            (None, None) => None,
        }
    }
}

pub fn operation_number(payment_id: i64) -> String {
    payment_id.to_string()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentRecord {
    pub payment_id: i64,
    pub operation_number: String,
    pub status: Option<String>,
    pub status_detail: Option<String>,
    pub amount: Option<f64>,
    pub currency: String,
    pub payer_email: Option<String>,
    pub payer_name: Option<String>,
    pub payment_method_id: Option<String>,
    pub description: Option<String>,
    pub external_reference: Option<String>,
    pub date_created: Option<String>,
    pub date_approved: Option<String>,
    pub receipt_url: Option<String>,
    pub source: String,
    pub raw: Option<String>,
    pub updated_at: String,
}

impl PaymentRecord {
    pub fn from_provider(
        payment: &ProviderPayment,
        payer_name: Option<String>,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            payment_id: payment.id,
            operation_number: operation_number(payment.id),
            status: payment.status.clone(),
            status_detail: payment.status_detail.clone(),
            amount: payment.transaction_amount,
            currency: payment
                .currency_id
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_CURRENCY)
                .to_string(),
            payer_email: payment.payer_email().map(ToString::to_string),
            payer_name,
            payment_method_id: payment.payment_method_id.clone(),
            description: payment.description.clone(),
            external_reference: payment.external_reference.clone(),
            date_created: payment.date_created.clone(),
            date_approved: payment.date_approved.clone(),
            receipt_url: payment.receipt_url.clone(),
            source: SOURCE_API.to_string(),
            raw: if payment.raw.is_null() {
                serde_json::to_string(payment).ok()
            } else {
                Some(payment.raw.to_string())
            },
            updated_at: crate::domain::checkpoint::format_utc(updated_at),
        }
    }
}
