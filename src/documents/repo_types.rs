use rust_decimal::Decimal;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Document row (invoice or quotation).
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_number: String,
    pub issue_date: Date,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub client_address: Option<String>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub template_id: i32,
    pub document_type: String, // "invoice" | "quotation"
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct LineItemRow {
    pub id: Uuid,
    pub document_id: Uuid,
    pub position: i32, // submission order
    pub description: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub amount: Decimal,
}

/// Per-user aggregates shown on the dashboard.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentStats {
    pub total_documents: i64,
    pub total_revenue: Decimal,
}
