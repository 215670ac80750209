use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::profile::repo_types::{
    CompanyProfile, ProfileUpdate, PLACEHOLDER_COMPANY, PLACEHOLDER_VALUE,
};

const PROFILE_COLUMNS: &str = r#"
    user_id, company_name, pan_number, gst_number, phone, address, logo_key, website, updated_at
"#;

pub async fn get(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<CompanyProfile>> {
    let profile = sqlx::query_as::<_, CompanyProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM company_profiles WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("get company profile")?;
    Ok(profile)
}

/// Create the profile at registration time, company name only.
pub async fn create_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    company_name: &str,
) -> anyhow::Result<CompanyProfile> {
    let profile = sqlx::query_as::<_, CompanyProfile>(&format!(
        r#"
        INSERT INTO company_profiles (user_id, company_name, pan_number, phone, address)
        VALUES ($1, $2, $3, $3, $3)
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(company_name)
    .bind(PLACEHOLDER_VALUE)
    .fetch_one(&mut **tx)
    .await
    .context("insert company profile")?;
    Ok(profile)
}

/// Returns the profile and whether this call created it.
pub async fn get_or_create(db: &PgPool, user_id: Uuid) -> anyhow::Result<(CompanyProfile, bool)> {
    let inserted = sqlx::query_as::<_, CompanyProfile>(&format!(
        r#"
        INSERT INTO company_profiles (user_id, company_name, pan_number, phone, address)
        VALUES ($1, $2, $3, $3, $3)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(PLACEHOLDER_COMPANY)
    .bind(PLACEHOLDER_VALUE)
    .fetch_optional(db)
    .await
    .context("get_or_create company profile")?;

    if let Some(profile) = inserted {
        return Ok((profile, true));
    }
    let existing = get(db, user_id)
        .await?
        .context("company profile vanished after conflict")?;
    Ok((existing, false))
}

pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    fields: &ProfileUpdate,
) -> anyhow::Result<CompanyProfile> {
    let profile = sqlx::query_as::<_, CompanyProfile>(&format!(
        r#"
        UPDATE company_profiles
           SET company_name = $2, pan_number = $3, gst_number = $4, phone = $5,
               address = $6, website = $7, updated_at = now()
         WHERE user_id = $1
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&fields.company_name)
    .bind(&fields.pan_number)
    .bind(&fields.gst_number)
    .bind(&fields.phone)
    .bind(&fields.address)
    .bind(&fields.website)
    .fetch_one(db)
    .await
    .context("update company profile")?;
    Ok(profile)
}

/// Point the profile at a new logo; returns the key it replaced, if any.
pub async fn set_logo(db: &PgPool, user_id: Uuid, logo_key: &str) -> anyhow::Result<Option<String>> {
    let previous: Option<(Option<String>,)> = sqlx::query_as(
        r#"
        UPDATE company_profiles p
           SET logo_key = $2, updated_at = now()
          FROM (SELECT logo_key FROM company_profiles WHERE user_id = $1 FOR UPDATE) old
         WHERE p.user_id = $1
        RETURNING old.logo_key
        "#,
    )
    .bind(user_id)
    .bind(logo_key)
    .fetch_optional(db)
    .await
    .context("set company logo")?;
    Ok(previous.and_then(|(k,)| k))
}
