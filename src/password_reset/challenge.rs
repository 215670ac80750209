use rand::Rng;
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

pub const CODE_LEN: usize = 6;

/// A code is accepted for this long after it was issued.
pub const OTP_TTL: Duration = Duration::minutes(10);

/// One-time reset code issued to a user. Rows are kept after use.
#[derive(Debug, Clone, FromRow)]
pub struct Challenge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub created_at: OffsetDateTime,
    pub used: bool,
}

impl Challenge {
    /// Unused and strictly younger than `ttl` at `now`.
    pub fn is_valid_at(&self, now: OffsetDateTime, ttl: Duration) -> bool {
        !self.used && now - self.created_at < ttl
    }
}

/// Uniformly random six-digit code, zero padded.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:06}", rng.gen_range(0..=999_999u32))
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}
