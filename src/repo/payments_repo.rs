use crate::domain::payment::PaymentRecord;
use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

#[derive(Clone)]
pub struct PaymentsRepo {
    pub pool: SqlitePool,
}

const SELECT_COLUMNS: &str = r#"
    SELECT payment_id, operation_number, status, status_detail, amount, currency,
           payer_email, payer_name, payment_method_id, description, external_reference,
           date_created, date_approved, receipt_url, source, raw, updated_at
    FROM payments
"#;

impl PaymentsRepo {
    /// Insert-or-update keyed on `payment_id`. Every provider-sourced column is
    /// overwritten; `payment_id` and `operation_number` never change.
    pub async fn upsert(&self, record: &PaymentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, operation_number, external_reference, description, status, status_detail,
                amount, currency, payer_email, payer_name, payment_method_id,
                date_created, date_approved, receipt_url, source, raw, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ON CONFLICT (payment_id) DO UPDATE SET
                external_reference=excluded.external_reference,
                description=excluded.description,
                status=excluded.status,
                status_detail=excluded.status_detail,
                amount=excluded.amount,
                currency=excluded.currency,
                payer_email=excluded.payer_email,
                payer_name=excluded.payer_name,
                payment_method_id=excluded.payment_method_id,
                date_created=excluded.date_created,
                date_approved=excluded.date_approved,
                receipt_url=excluded.receipt_url,
                source=excluded.source,
                raw=excluded.raw,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(record.payment_id)
        .bind(&record.operation_number)
        .bind(&record.external_reference)
        .bind(&record.description)
        .bind(&record.status)
        .bind(&record.status_detail)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(&record.payer_email)
        .bind(&record.payer_name)
        .bind(&record.payment_method_id)
        .bind(&record.date_created)
        .bind(&record.date_approved)
        .bind(&record.receipt_url)
        .bind(&record.source)
        .bind(&record.raw)
        .bind(&record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_operation_number(&self, operation_number: &str) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE operation_number = ?1"))
            .bind(operation_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| map_row(&r)))
    }

    pub async fn find_by_payment_id(&self, payment_id: i64) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE payment_id = ?1"))
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| map_row(&r)))
    }

    pub async fn list_all(&self) -> Result<Vec<PaymentRecord>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY payment_id ASC"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(map_row).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM payments")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

fn map_row(r: &SqliteRow) -> PaymentRecord {
    PaymentRecord {
        payment_id: r.get("payment_id"),
        operation_number: r.get("operation_number"),
        status: r.get("status"),
        status_detail: r.get("status_detail"),
        amount: r.get("amount"),
        currency: r.get("currency"),
        payer_email: r.get("payer_email"),
        payer_name: r.get("payer_name"),
        payment_method_id: r.get("payment_method_id"),
        description: r.get("description"),
        external_reference: r.get("external_reference"),
        date_created: r.get("date_created"),
        date_approved: r.get("date_approved"),
        receipt_url: r.get("receipt_url"),
        source: r.get("source"),
        raw: r.get("raw"),
        updated_at: r.get("updated_at"),
    }
}
