use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

/// Returned after a code was issued; the code goes out through the delivery channel only.
#[derive(Debug, Serialize)]
pub struct RequestResetResponse {
    pub reset_session: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub reset_session: Uuid,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteResetRequest {
    pub reset_session: Uuid,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetStatus {
    pub status: &'static str,
}
