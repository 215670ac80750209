use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::documents::aggregate::{ClientInfo, DocumentType, LineItem, Totals};
use crate::documents::repo_types::DocumentRow;
use crate::profile::dto::ProfileResponse;
use crate::templates::TemplateDescriptor;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// A form value that may arrive as a JSON string (possibly currency formatted) or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Number(serde_json::Number),
}

impl RawValue {
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// Inbound document form. Items come as parallel arrays; rows with an empty
/// description are dropped. Client-computed amounts and totals are accepted and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentForm {
    pub document_type: String,
    #[serde(default)]
    pub template_id: Option<RawValue>,
    #[serde(alias = "invoice_number")]
    pub document_number: String,
    pub date: String,
    pub client_name: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub client_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tax_rate: Option<RawValue>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, alias = "item_description[]")]
    pub item_description: Vec<String>,
    #[serde(default, alias = "item_quantity[]")]
    pub item_quantity: Vec<RawValue>,
    #[serde(default, alias = "item_price[]")]
    pub item_price: Vec<RawValue>,
    #[serde(default, alias = "item_amount[]")]
    pub item_amount: Vec<RawValue>,
}

#[derive(Debug, Serialize)]
pub struct LineItemView {
    pub description: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub amount: Decimal,
}

impl From<&LineItem> for LineItemView {
    fn from(item: &LineItem) -> Self {
        Self {
            description: item.description().to_string(),
            quantity: item.quantity(),
            price: item.price(),
            amount: item.amount(),
        }
    }
}

/// Payload handed to the presentation layer for both previews and saved documents.
#[derive(Debug, Serialize)]
pub struct RenderPayload {
    pub document_type: DocumentType,
    pub template: TemplateDescriptor,
    pub currency: String,
    pub document_number: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub client: ClientInfo,
    pub notes: Option<String>,
    pub items: Vec<LineItemView>,
    pub tax_rate: Decimal,
    #[serde(flatten)]
    pub totals: Totals,
    pub company: ProfileResponse,
}

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub document_type: String,
    pub document_number: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub client_name: String,
    pub total: Decimal,
    pub template_id: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<DocumentRow> for DocumentSummary {
    fn from(d: DocumentRow) -> Self {
        Self {
            id: d.id,
            document_type: d.document_type,
            document_number: d.document_number,
            date: d.issue_date,
            client_name: d.client_name,
            total: d.total,
            template_id: d.template_id,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentDetails {
    pub id: Uuid,
    pub document_type: DocumentType,
    pub document_number: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub client: ClientInfo,
    pub notes: Option<String>,
    pub template: TemplateDescriptor,
    pub items: Vec<LineItemView>,
    pub tax_rate: Decimal,
    #[serde(flatten)]
    pub totals: Totals,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }
