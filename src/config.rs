use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Password-reset timing. The one-time code window itself is fixed, see `challenge::OTP_TTL`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    /// How long an unfinished reset session is remembered.
    pub session_ttl_minutes: i64,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            session_ttl_minutes: 30,
        }
    }
}

const MAX_SESSION_TTL_MINUTES: i64 = 24 * 60;
const MAX_ACCESS_TTL_MINUTES: i64 = 7 * 24 * 60;
const MAX_REFRESH_TTL_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub reset: ResetConfig,
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
}

/// Keeps a configured duration in `1..=max` minutes.
fn clamp_minutes(key: &str, value: i64, max: i64) -> i64 {
    let clamped = value.clamp(1, max);
    if clamped != value {
        tracing::warn!(key, value, clamped, "duration out of range, clamped");
    }
    clamped
}

fn env_minutes(key: &str, default: i64, max: i64) -> i64 {
    clamp_minutes(key, env_i64(key, default), max)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "invoicegen".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "invoicegen-users".into()),
            ttl_minutes: env_minutes("JWT_TTL_MINUTES", 60, MAX_ACCESS_TTL_MINUTES),
            refresh_ttl_minutes: env_minutes(
                "JWT_REFRESH_TTL_MINUTES",
                60 * 24 * 14,
                MAX_REFRESH_TTL_MINUTES,
            ),
        };
        let storage = StorageConfig {
            endpoint: std::env::var("MINIO_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".into()),
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "invoicegen".into()),
            access_key: std::env::var("MINIO_ACCESS_KEY").unwrap_or_default(),
            secret_key: std::env::var("MINIO_SECRET_KEY").unwrap_or_default(),
        };
        let defaults = ResetConfig::default();
        let reset = ResetConfig {
            session_ttl_minutes: env_minutes(
                "RESET_SESSION_TTL_MINUTES",
                defaults.session_ttl_minutes,
                MAX_SESSION_TTL_MINUTES,
            ),
        };
        Ok(Self {
            database_url,
            jwt,
            storage,
            reset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_are_clamped() {
        assert_eq!(clamp_minutes("X", 30, MAX_SESSION_TTL_MINUTES), 30);
        assert_eq!(clamp_minutes("X", 0, MAX_SESSION_TTL_MINUTES), 1);
        assert_eq!(clamp_minutes("X", -5, MAX_SESSION_TTL_MINUTES), 1);
        assert_eq!(
            clamp_minutes("X", i64::MAX, MAX_SESSION_TTL_MINUTES),
            MAX_SESSION_TTL_MINUTES
        );
        // the clamped value is always a valid `time::Duration`
        let _ = time::Duration::minutes(clamp_minutes("X", i64::MAX, MAX_REFRESH_TTL_MINUTES));
    }
}
