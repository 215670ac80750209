use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::documents::aggregate::DocumentAggregate;
use crate::documents::repo_types::{DocumentRow, DocumentStats, LineItemRow};

const DOCUMENT_COLUMNS: &str = r#"
    id, user_id, document_number, issue_date, client_name, client_email, client_phone,
    client_address, subtotal, tax_rate, tax_amount, total, notes, template_id,
    document_type, created_at
"#;

/// Insert a document and all of its line items within a transaction.
pub async fn insert_document_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    doc: &DocumentAggregate,
) -> anyhow::Result<(DocumentRow, Vec<LineItemRow>)> {
    let header = doc.header();
    let totals = doc.totals();

    let row = sqlx::query_as::<_, DocumentRow>(&format!(
        r#"
        INSERT INTO documents (id, user_id, document_number, issue_date, client_name,
                               client_email, client_phone, client_address, subtotal,
                               tax_rate, tax_amount, total, notes, template_id, document_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {DOCUMENT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&header.document_number)
    .bind(header.issue_date)
    .bind(&header.client.name)
    .bind(&header.client.email)
    .bind(&header.client.phone)
    .bind(&header.client.address)
    .bind(totals.subtotal)
    .bind(doc.tax_rate())
    .bind(totals.tax_amount)
    .bind(totals.total)
    .bind(&header.notes)
    .bind(doc.template().id)
    .bind(header.document_type.as_str())
    .fetch_one(&mut **tx)
    .await
    .context("insert document")?;

    let mut items = Vec::with_capacity(doc.items().len());
    for (position, item) in doc.items().iter().enumerate() {
        let item_row = sqlx::query_as::<_, LineItemRow>(
            r#"
            INSERT INTO line_items (id, document_id, position, description, quantity, price, amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, document_id, position, description, quantity, price, amount
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.id)
        .bind(position as i32)
        .bind(item.description())
        .bind(item.quantity())
        .bind(item.price())
        .bind(item.amount())
        .fetch_one(&mut **tx)
        .await
        .context("insert line item")?;
        items.push(item_row);
    }

    Ok((row, items))
}

/// Newest documents first.
pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<DocumentRow>> {
    let rows = sqlx::query_as::<_, DocumentRow>(&format!(
        r#"
        SELECT {DOCUMENT_COLUMNS}
          FROM documents
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list documents by user")?;
    Ok(rows)
}

/// A document owned by `user_id` together with its items in submission order.
pub async fn get_with_items(
    db: &PgPool,
    user_id: Uuid,
    document_id: Uuid,
) -> anyhow::Result<Option<(DocumentRow, Vec<LineItemRow>)>> {
    let Some(doc) = sqlx::query_as::<_, DocumentRow>(&format!(
        r#"
        SELECT {DOCUMENT_COLUMNS}
          FROM documents
         WHERE id = $1 AND user_id = $2
        "#
    ))
    .bind(document_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("get document")?
    else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, LineItemRow>(
        r#"
        SELECT id, document_id, position, description, quantity, price, amount
          FROM line_items
         WHERE document_id = $1
         ORDER BY position ASC
        "#,
    )
    .bind(document_id)
    .fetch_all(db)
    .await
    .context("list line items")?;

    Ok(Some((doc, items)))
}

pub async fn stats_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<DocumentStats> {
    let stats = sqlx::query_as::<_, DocumentStats>(
        r#"
        SELECT COUNT(*) AS total_documents,
               COALESCE(SUM(total), 0) AS total_revenue
          FROM documents
         WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("document stats")?;
    Ok(stats)
}
