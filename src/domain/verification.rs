use crate::domain::payment::{PaymentRecord, DEFAULT_CURRENCY};
use serde::Serialize;

pub const APPROVED_STATUS: &str = "approved";
pub const MSG_VERIFIED: &str = "The operation number was verified successfully.";
pub const MSG_NOT_CREDITED: &str = "Payment not yet credited.";
pub const MSG_NOT_FOUND: &str =
    "Not found. If you paid recently, it may take a few minutes to be synchronized.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VerifyResponse {
    pub verified: bool,
    pub operation_number: Option<String>,
    pub status: Option<String>,
    pub approved_at: Option<String>,
    pub amount: Option<f64>,
    pub currency: String,
    pub payer_name: Option<String>,
    pub description: Option<String>,
    pub message: String,
}

impl VerifyResponse {
    pub fn not_found() -> Self {
        Self {
            verified: false,
            operation_number: None,
            status: None,
            approved_at: None,
            amount: None,
            currency: DEFAULT_CURRENCY.to_string(),
            payer_name: None,
            description: None,
            message: MSG_NOT_FOUND.to_string(),
        }
    }

    pub fn from_record(record: &PaymentRecord, mask_payer_name: bool) -> Self {
        let verified = record.status.as_deref() == Some(APPROVED_STATUS);
        let payer_name = if mask_payer_name {
            record.payer_name.as_deref().and_then(mask_name)
        } else {
            record.payer_name.clone()
        };

        Self {
            verified,
            operation_number: Some(record.operation_number.clone()),
            status: record.status.clone(),
            approved_at: record.date_approved.clone(),
            amount: record.amount,
            currency: if record.currency.is_empty() {
                DEFAULT_CURRENCY.to_string()
            } else {
                record.currency.clone()
            },
            payer_name,
            description: record.description.clone(),
            message: if verified { MSG_VERIFIED } else { MSG_NOT_CREDITED }.to_string(),
        }
    }
}

/// "Juan Perez Gomez" -> "Juan P."; single names are returned as-is.
pub fn mask_name(name: &str) -> Option<String> {
    let mut parts = name.split_whitespace();
    let first = parts.next()?;
    match parts.next().and_then(|second| second.chars().next()) {
        Some(initial) => Some(format!("{first} {initial}.")),
        None => Some(first.to_string()),
    }
}

/// Operation numbers are 6 to 24 ASCII digits.
pub fn is_valid_operation_number(op: &str) -> bool {
    (6..=24).contains(&op.len()) && op.bytes().all(|b| b.is_ascii_digit())
}
