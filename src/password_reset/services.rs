use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{check_new_password, hash_password};
use crate::auth::services::is_valid_email;
use crate::error::{AppError, AppResult};
use crate::password_reset::challenge::{generate_code, is_well_formed, Challenge, OTP_TTL};
use crate::password_reset::repo::ResetStore;
use crate::password_reset::session::{ResetSession, ResetSessionStore, ResetStep};
use crate::state::AppState;

/// Result of a successful reset request. The code itself never leaves the server
/// except through the delivery channel.
#[derive(Debug)]
pub struct IssuedReset {
    pub session_id: Uuid,
    pub challenge: Challenge,
}

/// Request → verify → complete, with one-time codes and session-scoped gating.
pub struct ResetFlow<'a> {
    store: &'a dyn ResetStore,
    sessions: &'a dyn ResetSessionStore,
}

impl<'a> ResetFlow<'a> {
    pub fn new(store: &'a dyn ResetStore, sessions: &'a dyn ResetSessionStore) -> Self {
        Self { store, sessions }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(state.reset_store.as_ref(), state.reset_sessions.as_ref())
    }

    pub async fn request_reset(&self, email: &str, now: OffsetDateTime) -> AppResult<IssuedReset> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::validation("email", "Enter a valid email address."));
        }

        let Some(user) = self.store.find_account(&email).await? else {
            warn!(email = %email, "password reset for unknown email");
            return Err(AppError::NotFound("account"));
        };

        let code = generate_code(&mut rand::thread_rng());
        let challenge = self.store.issue_challenge(user.id, &code, now).await?;

        let session_id = Uuid::new_v4();
        self.sessions
            .put(
                session_id,
                ResetSession {
                    user_id: user.id,
                    email: user.email.clone(),
                    step: ResetStep::Issued,
                    started_at: now,
                },
            )
            .await;

        // console delivery
        info!(target: "otp_delivery", email = %user.email, code = %challenge.code,
              "password reset code issued");
        Ok(IssuedReset {
            session_id,
            challenge,
        })
    }

    pub async fn verify_code(
        &self,
        session_id: Uuid,
        code: &str,
        now: OffsetDateTime,
    ) -> AppResult<()> {
        let session = self
            .sessions
            .get(session_id, now)
            .await
            .ok_or(AppError::InvalidOrExpiredCode)?;

        let code = code.trim();
        if !is_well_formed(code) {
            return Err(AppError::InvalidOrExpiredCode);
        }

        let challenge = self
            .store
            .find_unused_challenge(session.user_id, code)
            .await?
            .filter(|c| c.is_valid_at(now, OTP_TTL))
            .ok_or_else(|| {
                warn!(user_id = %session.user_id, "reset code rejected");
                AppError::InvalidOrExpiredCode
            })?;

        if !self.store.consume_challenge(challenge.id).await? {
            return Err(AppError::InvalidOrExpiredCode);
        }
        if !self.sessions.mark_verified(session_id, now).await {
            return Err(AppError::InvalidOrExpiredCode);
        }

        info!(user_id = %session.user_id, "reset code verified");
        Ok(())
    }

    pub async fn set_new_password(
        &self,
        session_id: Uuid,
        new_password: &str,
        confirm_password: &str,
        now: OffsetDateTime,
    ) -> AppResult<()> {
        let verified = self
            .sessions
            .get(session_id, now)
            .await
            .is_some_and(|s| s.step == ResetStep::Verified);
        if !verified {
            return Err(AppError::NotVerified);
        }

        check_new_password("new_password", new_password, confirm_password)?;

        let session = self
            .sessions
            .take_verified(session_id, now)
            .await
            .ok_or(AppError::NotVerified)?;

        let stored = match hash_password(new_password) {
            Ok(hash) => self.store.set_password_hash(session.user_id, &hash).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            // let the user retry from the same verified session
            self.sessions.put(session_id, session).await;
            return Err(e.into());
        }

        info!(user_id = %session.user_id, "password reset completed");
        Ok(())
    }

    pub async fn abandon(&self, session_id: Uuid) {
        if self.sessions.remove(session_id).await.is_some() {
            info!(%session_id, "password reset abandoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::auth::repo_types::User;
    use crate::password_reset::session::InMemoryResetSessions;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        users: Vec<User>,
        challenges: Mutex<Vec<Challenge>>,
        hashes: Mutex<HashMap<Uuid, String>>,
    }

    #[async_trait]
    impl ResetStore for MemoryStore {
        async fn find_account(&self, email: &str) -> anyhow::Result<Option<User>> {
            Ok(self.users.iter().find(|u| u.email == email).cloned())
        }

        async fn issue_challenge(
            &self,
            user_id: Uuid,
            code: &str,
            created_at: OffsetDateTime,
        ) -> anyhow::Result<Challenge> {
            let mut all = self.challenges.lock().await;
            for c in all.iter_mut().filter(|c| c.user_id == user_id) {
                c.used = true;
            }
            let c = Challenge {
                id: Uuid::new_v4(),
                user_id,
                code: code.to_string(),
                created_at,
                used: false,
            };
            all.push(c.clone());
            Ok(c)
        }

        async fn find_unused_challenge(
            &self,
            user_id: Uuid,
            code: &str,
        ) -> anyhow::Result<Option<Challenge>> {
            let all = self.challenges.lock().await;
            Ok(all
                .iter()
                .rev()
                .find(|c| c.user_id == user_id && c.code == code && !c.used)
                .cloned())
        }

        async fn consume_challenge(&self, challenge_id: Uuid) -> anyhow::Result<bool> {
            let mut all = self.challenges.lock().await;
            match all.iter_mut().find(|c| c.id == challenge_id && !c.used) {
                Some(c) => {
                    c.used = true;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn set_password_hash(&self, user_id: Uuid, hash: &str) -> anyhow::Result<()> {
            self.hashes.lock().await.insert(user_id, hash.to_string());
            Ok(())
        }
    }

    fn store_with_user(email: &str) -> (MemoryStore, Uuid) {
        let id = Uuid::new_v4();
        let store = MemoryStore {
            users: vec![User {
                id,
                email: email.to_string(),
                password_hash: "old".into(),
                created_at: OffsetDateTime::now_utc(),
            }],
            ..Default::default()
        };
        (store, id)
    }

    fn sessions() -> InMemoryResetSessions {
        InMemoryResetSessions::new(Duration::minutes(30))
    }

    fn wrong_code(code: &str) -> String {
        let first = if code.starts_with('0') { '1' } else { '0' };
        format!("{first}{}", &code[1..])
    }

    #[tokio::test]
    async fn unknown_email_creates_nothing() {
        let (store, _) = store_with_user("owner@acme.test");
        let sessions = sessions();
        let flow = ResetFlow::new(&store, &sessions);

        let err = flow
            .request_reset("nobody@acme.test", OffsetDateTime::now_utc())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.challenges.lock().await.is_empty());
    }

    #[tokio::test]
    async fn wrong_then_right_code() {
        let (store, user_id) = store_with_user("owner@acme.test");
        let sessions = sessions();
        let flow = ResetFlow::new(&store, &sessions);
        let now = OffsetDateTime::now_utc();

        let issued = flow.request_reset("  Owner@Acme.test ", now).await.unwrap();
        assert_eq!(issued.challenge.user_id, user_id);

        let bad = wrong_code(&issued.challenge.code);
        assert!(matches!(
            flow.verify_code(issued.session_id, &bad, now).await,
            Err(AppError::InvalidOrExpiredCode)
        ));
        // still retryable
        flow.verify_code(issued.session_id, &issued.challenge.code, now)
            .await
            .unwrap();
        assert_eq!(
            sessions.get(issued.session_id, now).await.unwrap().step,
            ResetStep::Verified
        );
    }

    #[tokio::test]
    async fn second_request_invalidates_first_code() {
        let (store, _) = store_with_user("owner@acme.test");
        let sessions = sessions();
        let flow = ResetFlow::new(&store, &sessions);
        let now = OffsetDateTime::now_utc();

        let first = flow.request_reset("owner@acme.test", now).await.unwrap();
        let second = flow.request_reset("owner@acme.test", now).await.unwrap();

        let unused = store
            .challenges
            .lock()
            .await
            .iter()
            .filter(|c| !c.used)
            .count();
        assert_eq!(unused, 1);

        if first.challenge.code != second.challenge.code {
            assert!(matches!(
                flow.verify_code(first.session_id, &first.challenge.code, now).await,
                Err(AppError::InvalidOrExpiredCode)
            ));
        }
        flow.verify_code(second.session_id, &second.challenge.code, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn code_is_single_use() {
        let (store, _) = store_with_user("owner@acme.test");
        let sessions = sessions();
        let flow = ResetFlow::new(&store, &sessions);
        let now = OffsetDateTime::now_utc();

        let issued = flow.request_reset("owner@acme.test", now).await.unwrap();
        flow.verify_code(issued.session_id, &issued.challenge.code, now)
            .await
            .unwrap();
        assert!(matches!(
            flow.verify_code(issued.session_id, &issued.challenge.code, now).await,
            Err(AppError::InvalidOrExpiredCode)
        ));
    }

    #[tokio::test]
    async fn expired_code_fails() {
        let (store, _) = store_with_user("owner@acme.test");
        let sessions = sessions();
        let flow = ResetFlow::new(&store, &sessions);
        let t0 = OffsetDateTime::now_utc();

        let issued = flow.request_reset("owner@acme.test", t0).await.unwrap();
        let later = t0 + Duration::minutes(10) + Duration::seconds(1);
        assert!(matches!(
            flow.verify_code(issued.session_id, &issued.challenge.code, later).await,
            Err(AppError::InvalidOrExpiredCode)
        ));
    }

    #[tokio::test]
    async fn password_requires_verification_and_is_single_use() {
        let (store, user_id) = store_with_user("owner@acme.test");
        let sessions = sessions();
        let flow = ResetFlow::new(&store, &sessions);
        let now = OffsetDateTime::now_utc();

        // fresh session that never verified
        assert!(matches!(
            flow.set_new_password(Uuid::new_v4(), "n3w-passw0rd", "n3w-passw0rd", now).await,
            Err(AppError::NotVerified)
        ));

        let issued = flow.request_reset("owner@acme.test", now).await.unwrap();
        assert!(matches!(
            flow.set_new_password(issued.session_id, "n3w-passw0rd", "n3w-passw0rd", now).await,
            Err(AppError::NotVerified)
        ));

        flow.verify_code(issued.session_id, &issued.challenge.code, now)
            .await
            .unwrap();
        assert!(matches!(
            flow.set_new_password(issued.session_id, "n3w-passw0rd", "different1", now).await,
            Err(AppError::Validation { .. })
        ));
        flow.set_new_password(issued.session_id, "n3w-passw0rd", "n3w-passw0rd", now)
            .await
            .unwrap();

        let hash = store.hashes.lock().await.get(&user_id).cloned().unwrap();
        assert!(verify_password("n3w-passw0rd", &hash).unwrap());

        assert!(matches!(
            flow.set_new_password(issued.session_id, "another-pass", "another-pass", now).await,
            Err(AppError::NotVerified)
        ));
    }

    #[tokio::test]
    async fn abandon_clears_session() {
        let (store, _) = store_with_user("owner@acme.test");
        let sessions = sessions();
        let flow = ResetFlow::new(&store, &sessions);
        let now = OffsetDateTime::now_utc();

        let issued = flow.request_reset("owner@acme.test", now).await.unwrap();
        flow.abandon(issued.session_id).await;
        assert!(matches!(
            flow.verify_code(issued.session_id, &issued.challenge.code, now).await,
            Err(AppError::InvalidOrExpiredCode)
        ));
    }
}
