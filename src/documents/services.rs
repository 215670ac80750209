use anyhow::Context;
use rust_decimal::Decimal;
use time::{macros::format_description, Date};
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents::aggregate::{
    ClientInfo, DocumentAggregate, DocumentError, DocumentHeader, DocumentType,
};
use crate::documents::dto::{DocumentDetails, DocumentForm, LineItemView, RawValue, RenderPayload};
use crate::documents::repo;
use crate::documents::repo_types::{DocumentRow, LineItemRow};
use crate::error::{AppError, AppResult};
use crate::money;
use crate::profile;
use crate::state::AppState;
use crate::templates::DEFAULT_TEMPLATE_ID;

pub const DEFAULT_CURRENCY: &str = "₹";

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required(field: &str, value: &str) -> AppResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::validation(field, format!("{field} is required")));
    }
    Ok(v.to_string())
}

pub fn parse_issue_date(raw: &str) -> AppResult<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::validation("date", "expected a date formatted YYYY-MM-DD"))
}

fn parse_item_value(index: usize, what: &str, raw: &RawValue) -> Result<Decimal, DocumentError> {
    money::parse_amount(&raw.as_text()).map_err(|_| DocumentError::InvalidLineItem {
        index,
        reason: format!("{what} is not a number"),
    })
}

/// Validates a submitted form and builds the aggregate it describes. Nothing is persisted.
pub fn build_aggregate(form: &DocumentForm) -> AppResult<DocumentAggregate> {
    let document_type: DocumentType = form.document_type.parse()?;
    let template_id = form
        .template_id
        .as_ref()
        .and_then(|v| v.as_text().trim().parse::<i32>().ok())
        .unwrap_or(DEFAULT_TEMPLATE_ID);
    let tax_rate = match &form.tax_rate {
        Some(raw) if !raw.as_text().trim().is_empty() => money::parse_amount(&raw.as_text())
            .map_err(|e| AppError::validation("tax_rate", e.to_string()))?,
        _ => Decimal::ZERO,
    };

    let header = DocumentHeader {
        document_type,
        document_number: required("document_number", &form.document_number)?,
        issue_date: parse_issue_date(&form.date)?,
        client: ClientInfo {
            name: required("client_name", &form.client_name)?,
            email: non_empty(&form.client_email),
            phone: non_empty(&form.client_phone),
            address: non_empty(&form.client_address),
        },
        notes: non_empty(&form.notes),
    };

    let rows = form.item_description.len();
    if form.item_quantity.len() != rows || form.item_price.len() != rows {
        return Err(AppError::validation(
            "items",
            "item descriptions, quantities and prices must have the same length",
        ));
    }

    let mut doc = DocumentAggregate::new(header, template_id, tax_rate)?;
    // indexes in errors refer to the submitted arrays, blank rows included
    let kept = form
        .item_description
        .iter()
        .zip(&form.item_quantity)
        .zip(&form.item_price)
        .enumerate()
        .filter(|(_, ((description, _), _))| !description.trim().is_empty());
    for (index, ((description, quantity), price)) in kept {
        let quantity = parse_item_value(index, "quantity", quantity)?;
        let price = parse_item_value(index, "price", price)?;
        doc.add_item(description, quantity, price)
            .map_err(|e| match e {
                DocumentError::InvalidLineItem { reason, .. } => {
                    DocumentError::InvalidLineItem { index, reason }
                }
                other => other,
            })?;
    }
    Ok(doc)
}

/// Rebuilds the aggregate of a stored document from its rows.
pub fn rehydrate(row: &DocumentRow, items: &[LineItemRow]) -> anyhow::Result<DocumentAggregate> {
    let header = DocumentHeader {
        document_type: row.document_type.parse()?,
        document_number: row.document_number.clone(),
        issue_date: row.issue_date,
        client: ClientInfo {
            name: row.client_name.clone(),
            email: row.client_email.clone(),
            phone: row.client_phone.clone(),
            address: row.client_address.clone(),
        },
        notes: row.notes.clone(),
    };
    let mut doc = DocumentAggregate::new(header, row.template_id, row.tax_rate)?;
    for item in items {
        doc.add_item(&item.description, item.quantity, item.price)?;
    }
    if doc.totals().total != row.total {
        warn!(document_id = %row.id, stored = %row.total, derived = %doc.totals().total,
              "stored total differs from derived total");
    }
    Ok(doc)
}

pub fn details(row: &DocumentRow, doc: &DocumentAggregate) -> DocumentDetails {
    let header = doc.header();
    DocumentDetails {
        id: row.id,
        document_type: header.document_type,
        document_number: header.document_number.clone(),
        date: header.issue_date,
        client: header.client.clone(),
        notes: header.notes.clone(),
        template: *doc.template(),
        items: doc.items().iter().map(LineItemView::from).collect(),
        tax_rate: doc.tax_rate(),
        totals: doc.totals(),
        created_at: row.created_at,
    }
}

async fn render(
    state: &AppState,
    user_id: Uuid,
    doc: &DocumentAggregate,
    currency: Option<&str>,
) -> AppResult<RenderPayload> {
    let company = profile::repo::get(&state.db, user_id)
        .await?
        .ok_or(AppError::SetupRequired)?;
    let company = profile::services::to_response(state, company).await;
    let header = doc.header();
    Ok(RenderPayload {
        document_type: header.document_type,
        template: *doc.template(),
        currency: currency
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string(),
        document_number: header.document_number.clone(),
        date: header.issue_date,
        client: header.client.clone(),
        notes: header.notes.clone(),
        items: doc.items().iter().map(LineItemView::from).collect(),
        tax_rate: doc.tax_rate(),
        totals: doc.totals(),
        company,
    })
}

pub async fn preview(state: &AppState, user_id: Uuid, form: &DocumentForm) -> AppResult<RenderPayload> {
    let doc = build_aggregate(form)?;
    render(state, user_id, &doc, form.currency.as_deref()).await
}

/// Persists the document and its items atomically.
pub async fn create_document(
    state: &AppState,
    user_id: Uuid,
    form: &DocumentForm,
) -> AppResult<DocumentDetails> {
    let doc = build_aggregate(form)?;

    let mut tx = state.db.begin().await.context("begin tx")?;
    let (row, _) = repo::insert_document_tx(&mut tx, user_id, &doc).await?;
    tx.commit().await.context("commit tx")?;

    info!(
        user_id = %user_id,
        document_id = %row.id,
        document_type = doc.header().document_type.as_str(),
        items = doc.items().len(),
        total = %doc.totals().total,
        "document saved"
    );
    Ok(details(&row, &doc))
}

pub async fn load_document(
    state: &AppState,
    user_id: Uuid,
    document_id: Uuid,
) -> AppResult<(DocumentRow, DocumentAggregate)> {
    let (row, items) = repo::get_with_items(&state.db, user_id, document_id)
        .await?
        .ok_or(AppError::NotFound("document"))?;
    let doc = rehydrate(&row, &items).context("rehydrate stored document")?;
    Ok((row, doc))
}

pub async fn render_saved(
    state: &AppState,
    user_id: Uuid,
    document_id: Uuid,
) -> AppResult<RenderPayload> {
    let (_, doc) = load_document(state, user_id, document_id).await?;
    render(state, user_id, &doc, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use time::OffsetDateTime;

    fn form(value: serde_json::Value) -> DocumentForm {
        serde_json::from_value(value).expect("valid form json")
    }

    fn base() -> serde_json::Value {
        json!({
            "document_type": "invoice",
            "template_id": "2",
            "document_number": "INV-100",
            "date": "2024-01-31",
            "client_name": "Globex",
            "client_email": "",
            "tax_rate": "10.00",
            "item_description": ["Widget", "Service"],
            "item_quantity": ["2", "1"],
            "item_price": ["₹10.00", "$50.00"],
            "item_amount": ["999", "999"]
        })
    }

    #[test]
    fn builds_totals_ignoring_client_amounts() {
        let doc = build_aggregate(&form(base())).unwrap();
        let t = doc.totals();
        assert_eq!(t.subtotal, dec!(70.00));
        assert_eq!(t.tax_amount, dec!(7.00));
        assert_eq!(t.total, dec!(77.00));
        assert_eq!(doc.template().id, 2);
        assert_eq!(doc.header().client.email, None);
    }

    #[test]
    fn empty_descriptions_are_dropped() {
        let mut v = base();
        v["item_description"] = json!(["Widget", "", "Service"]);
        v["item_quantity"] = json!(["2", "not-a-number", "1"]);
        v["item_price"] = json!(["10", "", "50"]);
        let doc = build_aggregate(&form(v)).unwrap();
        assert_eq!(doc.items().len(), 2);
        assert_eq!(doc.totals().subtotal, dec!(70));
    }

    #[test]
    fn mismatched_arrays_are_rejected() {
        let mut v = base();
        v["item_price"] = json!(["10"]);
        match build_aggregate(&form(v)) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "items"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_template_falls_back_and_bad_type_fails() {
        let mut v = base();
        v["template_id"] = json!("tampered");
        assert_eq!(build_aggregate(&form(v)).unwrap().template().id, 1);

        let mut v = base();
        v["document_type"] = json!("receipt");
        match build_aggregate(&form(v)) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "document_type"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_or_non_numeric_items_fail() {
        let mut v = base();
        v["item_quantity"] = json!(["-2", "1"]);
        assert!(matches!(
            build_aggregate(&form(v)),
            Err(AppError::Validation { .. })
        ));

        let mut v = base();
        v["item_price"] = json!(["ten", "1"]);
        assert!(build_aggregate(&form(v)).is_err());
    }

    #[test]
    fn item_errors_point_at_the_submitted_row() {
        let mut v = base();
        v["item_description"] = json!(["", "Widget", "Service"]);
        v["item_quantity"] = json!(["", "2", "-1"]);
        v["item_price"] = json!(["", "10", "50"]);
        match build_aggregate(&form(v)) {
            Err(AppError::Validation { field, message }) => {
                assert_eq!(field, "items");
                assert!(message.starts_with("line item 2:"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut v = base();
        v["item_description"] = json!(["", "Widget"]);
        v["item_quantity"] = json!(["", "lots"]);
        v["item_price"] = json!(["", "10"]);
        match build_aggregate(&form(v)) {
            Err(AppError::Validation { message, .. }) => {
                assert!(message.starts_with("line item 1:"), "{message}")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn oversized_amounts_are_validation_errors() {
        let mut v = base();
        v["tax_rate"] = json!("999.99");
        v["item_description"] = json!(["Everything"]);
        v["item_quantity"] = json!(["99999999.99"]);
        v["item_price"] = json!(["99999999.99"]);
        match build_aggregate(&form(v)) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "items"),
            other => panic!("unexpected {other:?}"),
        }

        let mut v = base();
        v["item_price"] = json!(["1_000", "1e3"]);
        assert!(matches!(
            build_aggregate(&form(v)),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn missing_tax_rate_means_zero() {
        let mut v = base();
        v.as_object_mut().unwrap().remove("tax_rate");
        let doc = build_aggregate(&form(v)).unwrap();
        assert_eq!(doc.totals().tax_amount, Decimal::ZERO);
        assert_eq!(doc.totals().total, dec!(70));
    }

    #[test]
    fn required_header_fields() {
        let mut v = base();
        v["client_name"] = json!("  ");
        assert!(build_aggregate(&form(v)).is_err());
        let mut v = base();
        v["date"] = json!("31/01/2024");
        assert!(build_aggregate(&form(v)).is_err());
    }

    #[test]
    fn rehydrate_matches_stored_rows() {
        let doc = build_aggregate(&form(base())).unwrap();
        let id = Uuid::new_v4();
        let row = DocumentRow {
            id,
            user_id: Uuid::new_v4(),
            document_number: "INV-100".into(),
            issue_date: doc.header().issue_date,
            client_name: "Globex".into(),
            client_email: None,
            client_phone: None,
            client_address: None,
            subtotal: dec!(70.00),
            tax_rate: dec!(10.00),
            tax_amount: dec!(7.00),
            total: dec!(77.00),
            notes: None,
            template_id: 2,
            document_type: "invoice".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let items: Vec<LineItemRow> = doc
            .items()
            .iter()
            .enumerate()
            .map(|(i, it)| LineItemRow {
                id: Uuid::new_v4(),
                document_id: id,
                position: i as i32,
                description: it.description().to_string(),
                quantity: it.quantity(),
                price: it.price(),
                amount: it.amount(),
            })
            .collect();
        let again = rehydrate(&row, &items).unwrap();
        assert_eq!(again.totals(), doc.totals());
        assert_eq!(details(&row, &again).items.len(), 2);
    }
}
