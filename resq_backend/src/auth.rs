use crate::store::models::{PendingDeletionRecord, SessionRecord, UserRecord};
use crate::store::repositories::{DeletionRepository, SessionRepository, UserRepository};
use crate::store::Store;
use crate::utils::now_millis;
use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Grace period between a deletion request and the scheduled purge.
pub const DELETION_GRACE_MS: i64 = 30 * 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email address is not valid")]
    MalformedEmail,
    #[error("password should be at least 6 characters")]
    WeakPassword,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("not signed in")]
    Unauthorized,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl UserView {
    fn from_record(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            display_name: record.display_name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeletionGrant {
    pub token: String,
    pub user: UserView,
    pub scheduled_permanent_deletion_at: i64,
}

/// Closed set of successful sign-in results. Failures travel through
/// [`AuthError`] instead of a third variant.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    Active(SessionGrant),
    PendingDeletion(PendingDeletionGrant),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AuthService {
    store: Store,
}

impl AuthService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Creates the account and signs it in, like the hosted provider's
    /// combined create-and-authenticate call.
    pub fn register(&self, input: RegisterInput) -> AuthResult<SessionGrant> {
        let email = normalize_email(&input.email)?;
        if input.password.chars().count() < 6 {
            return Err(AuthError::WeakPassword);
        }
        let password_hash = hash_password(&input.password)?;
        let display_name = clean_display_name(input.display_name);

        let created_at = now_millis();
        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            email,
            display_name,
            password_hash,
            created_at,
        };
        let token = Uuid::new_v4().to_string();
        let session = SessionRecord {
            token: token.clone(),
            user_id: user.id.clone(),
            created_at,
        };

        let created = self.store.with_repositories(|repos| {
            if repos.users().find_by_email(&user.email)?.is_some() {
                return Ok(false);
            }
            repos.users().create(&user)?;
            repos.sessions().create(&session)?;
            Ok(true)
        })?;
        if !created {
            return Err(AuthError::EmailTaken);
        }

        tracing::info!(user_id = %user.id, "registered account");
        Ok(SessionGrant {
            token,
            user: UserView::from_record(user),
        })
    }

    pub fn login(&self, input: LoginInput) -> AuthResult<LoginOutcome> {
        let email = input.email.trim().to_lowercase();
        let (user, pending) = self.store.with_repositories(|repos| {
            let user = repos.users().find_by_email(&email)?;
            let pending = match &user {
                Some(user) => repos.deletions().get(&user.id)?,
                None => None,
            };
            Ok((user, pending))
        })?;

        let Some(user) = user else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&input.password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let token = Uuid::new_v4().to_string();
        let session = SessionRecord {
            token: token.clone(),
            user_id: user.id.clone(),
            created_at: now_millis(),
        };
        self.store
            .with_repositories(|repos| repos.sessions().create(&session))?;

        let user = UserView::from_record(user);
        match pending {
            // The account stays signed in so the reactivation call can be
            // made, but callers must surface the prompt instead of the feed.
            Some(record) => Ok(LoginOutcome::PendingDeletion(PendingDeletionGrant {
                token,
                user,
                scheduled_permanent_deletion_at: record.scheduled_permanent_deletion_at,
            })),
            None => Ok(LoginOutcome::Active(SessionGrant { token, user })),
        }
    }

    pub fn authenticate(&self, token: &str) -> AuthResult<UserView> {
        let user = self.store.with_repositories(|repos| {
            let Some(session) = repos.sessions().get(token)? else {
                return Ok(None);
            };
            repos.users().get(&session.user_id)
        })?;
        user.map(UserView::from_record).ok_or(AuthError::Unauthorized)
    }

    pub fn logout(&self, token: &str) -> AuthResult<()> {
        self.store
            .with_repositories(|repos| repos.sessions().delete(token))?;
        Ok(())
    }

    pub fn update_profile(
        &self,
        user_id: &str,
        display_name: Option<String>,
    ) -> AuthResult<UserView> {
        let cleaned = clean_display_name(display_name);
        let user = self.store.with_repositories(|repos| {
            repos.users().set_display_name(user_id, cleaned.as_deref())?;
            repos.users().get(user_id)
        })?;
        user.map(UserView::from_record).ok_or(AuthError::Unauthorized)
    }

    /// Marks the account for deletion thirty days out and revokes every
    /// session, including the one making this call.
    pub fn request_deletion(&self, user_id: &str) -> AuthResult<PendingDeletionRecord> {
        let requested_at = now_millis();
        let record = self.store.with_repositories(|repos| {
            let Some(user) = repos.users().get(user_id)? else {
                return Ok(None);
            };
            let record = PendingDeletionRecord {
                uid: user.id,
                email: user.email,
                requested_at,
                scheduled_permanent_deletion_at: requested_at + DELETION_GRACE_MS,
                status: "pending_deletion".into(),
            };
            repos.deletions().upsert(&record)?;
            repos.sessions().delete_for_user(user_id)?;
            Ok(Some(record))
        })?;
        let record = record.ok_or(AuthError::Unauthorized)?;
        tracing::info!(
            user_id = %record.uid,
            scheduled_at = record.scheduled_permanent_deletion_at,
            "account marked for deletion"
        );
        Ok(record)
    }

    /// Clears the pending-deletion mark. Nothing else was touched by the
    /// request, so there is nothing further to restore.
    pub fn reactivate(&self, user_id: &str) -> AuthResult<()> {
        self.store
            .with_repositories(|repos| repos.deletions().remove(user_id))?;
        tracing::info!(user_id = %user_id, "account reactivated");
        Ok(())
    }
}

/// Display name shown on posts and shared locations. Falls back to the part
/// of the email before the `@`, then to "Anonymous".
pub fn resolve_display_name(display_name: Option<&str>, email: &str) -> String {
    if let Some(name) = display_name {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let prefix = email.split('@').next().unwrap_or("");
    if prefix.is_empty() {
        "Anonymous".to_string()
    } else {
        prefix.to_string()
    }
}

fn clean_display_name(display_name: Option<String>) -> Option<String> {
    display_name.and_then(|name| {
        let trimmed = name.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn normalize_email(raw: &str) -> AuthResult<String> {
    let email = raw.trim().to_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthError::MalformedEmail);
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(AuthError::MalformedEmail);
    }
    Ok(email)
}

fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| AuthError::Internal(anyhow!("failed to hash password: {err}")))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_service() -> AuthService {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let store = Store::from_connection(conn, true);
        store.ensure_migrations().expect("migrations");
        AuthService::new(store)
    }

    fn register_maria(service: &AuthService) -> SessionGrant {
        service
            .register(RegisterInput {
                email: "maria@example.ph".into(),
                password: "lindol123".into(),
                display_name: Some("Maria".into()),
            })
            .expect("register")
    }

    #[test]
    fn registration_validates_inputs() {
        let service = setup_service();

        let no_at = service.register(RegisterInput {
            email: "maria.example.ph".into(),
            password: "lindol123".into(),
            display_name: None,
        });
        assert!(matches!(no_at, Err(AuthError::MalformedEmail)));

        let short = service.register(RegisterInput {
            email: "maria@example.ph".into(),
            password: "abc".into(),
            display_name: None,
        });
        assert!(matches!(short, Err(AuthError::WeakPassword)));

        register_maria(&service);
        let duplicate = service.register(RegisterInput {
            email: "Maria@Example.PH".into(),
            password: "another1".into(),
            display_name: None,
        });
        assert!(matches!(duplicate, Err(AuthError::EmailTaken)));
        assert_eq!(
            duplicate.unwrap_err().to_string(),
            "email already registered"
        );
    }

    #[test]
    fn login_accepts_valid_credentials_only() {
        let service = setup_service();
        let grant = register_maria(&service);
        assert!(service.authenticate(&grant.token).is_ok());

        let wrong = service.login(LoginInput {
            email: "maria@example.ph".into(),
            password: "wrong-password".into(),
        });
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        let unknown = service.login(LoginInput {
            email: "nobody@example.ph".into(),
            password: "lindol123".into(),
        });
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));

        let outcome = service
            .login(LoginInput {
                email: "maria@example.ph".into(),
                password: "lindol123".into(),
            })
            .expect("login");
        assert!(matches!(outcome, LoginOutcome::Active(_)));
    }

    #[test]
    fn logout_revokes_only_the_presented_session() {
        let service = setup_service();
        let first = register_maria(&service);
        let second = match service
            .login(LoginInput {
                email: "maria@example.ph".into(),
                password: "lindol123".into(),
            })
            .expect("login")
        {
            LoginOutcome::Active(grant) => grant,
            other => panic!("unexpected outcome: {other:?}"),
        };

        service.logout(&first.token).expect("logout");
        assert!(matches!(
            service.authenticate(&first.token),
            Err(AuthError::Unauthorized)
        ));
        assert!(service.authenticate(&second.token).is_ok());
    }

    #[test]
    fn deletion_request_schedules_purge_and_signs_out() {
        let service = setup_service();
        let grant = register_maria(&service);
        let user_id = grant.user.id.clone();

        let record = service.request_deletion(&user_id).expect("request deletion");
        assert_eq!(record.status, "pending_deletion");
        assert_eq!(
            record.scheduled_permanent_deletion_at - record.requested_at,
            DELETION_GRACE_MS
        );
        assert!(matches!(
            service.authenticate(&grant.token),
            Err(AuthError::Unauthorized)
        ));

        let outcome = service
            .login(LoginInput {
                email: "maria@example.ph".into(),
                password: "lindol123".into(),
            })
            .expect("login during pending deletion");
        let pending = match outcome {
            LoginOutcome::PendingDeletion(pending) => pending,
            LoginOutcome::Active(_) => panic!("expected pending_deletion outcome"),
        };
        assert_eq!(
            pending.scheduled_permanent_deletion_at,
            record.scheduled_permanent_deletion_at
        );

        service.reactivate(&pending.user.id).expect("reactivate");
        let outcome = service
            .login(LoginInput {
                email: "maria@example.ph".into(),
                password: "lindol123".into(),
            })
            .expect("login after reactivation");
        assert!(matches!(outcome, LoginOutcome::Active(_)));
    }

    #[test]
    fn login_outcome_serializes_with_status_tag() {
        let outcome = LoginOutcome::PendingDeletion(PendingDeletionGrant {
            token: "token-1".into(),
            user: UserView {
                id: "user-1".into(),
                email: "maria@example.ph".into(),
                display_name: None,
            },
            scheduled_permanent_deletion_at: 2_592_000_000,
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "pending_deletion");
        assert_eq!(json["scheduledPermanentDeletionAt"], 2_592_000_000i64);
    }

    #[test]
    fn display_name_falls_back_to_email_prefix() {
        assert_eq!(resolve_display_name(Some("Maria"), "maria@example.ph"), "Maria");
        assert_eq!(resolve_display_name(Some("   "), "ben@example.ph"), "ben");
        assert_eq!(resolve_display_name(None, "ben@example.ph"), "ben");
        assert_eq!(resolve_display_name(None, ""), "Anonymous");
    }

    #[test]
    fn password_hashes_are_salted_and_verifiable() {
        let first = hash_password("lindol123").expect("hash");
        let second = hash_password("lindol123").expect("hash");
        assert_ne!(first, second);
        assert!(verify_password("lindol123", &first));
        assert!(!verify_password("lindol124", &first));
    }
}
