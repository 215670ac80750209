use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const PLACEHOLDER_COMPANY: &str = "Your Company";
pub const PLACEHOLDER_VALUE: &str = "Not provided";

/// Company profile, one per user.
#[derive(Debug, Clone, FromRow)]
pub struct CompanyProfile {
    pub user_id: Uuid,
    pub company_name: String,
    pub pan_number: String,           // primary tax identifier
    pub gst_number: Option<String>,   // secondary tax identifier
    pub phone: String,
    pub address: String,
    pub logo_key: Option<String>,     // object storage key
    pub website: Option<String>,
    pub updated_at: OffsetDateTime,
}

impl CompanyProfile {
    /// Incomplete profiles send the user back to setup before anything else.
    pub fn is_complete(&self) -> bool {
        let name = self.company_name.trim();
        let phone = self.phone.trim();
        !(name.is_empty()
            || name == PLACEHOLDER_COMPANY
            || phone.is_empty()
            || phone == PLACEHOLDER_VALUE)
    }
}

/// Validated profile fields ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub company_name: String,
    pub pan_number: String,
    pub gst_number: Option<String>,
    pub phone: String,
    pub address: String,
    pub website: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, phone: &str) -> CompanyProfile {
        CompanyProfile {
            user_id: Uuid::new_v4(),
            company_name: name.into(),
            pan_number: "ABCDE1234F".into(),
            gst_number: None,
            phone: phone.into(),
            address: "1 Main Road".into(),
            logo_key: None,
            website: None,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn placeholders_are_incomplete() {
        assert!(!profile(PLACEHOLDER_COMPANY, "9876543210").is_complete());
        assert!(!profile("Acme", PLACEHOLDER_VALUE).is_complete());
        assert!(!profile("", "9876543210").is_complete());
        assert!(!profile("Acme", " ").is_complete());
        assert!(profile("Acme", "9876543210").is_complete());
    }
}
