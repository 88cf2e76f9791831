use std::sync::Arc;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult, EMAIL_TAKEN};
use crate::services::token::TokenService;
use crate::storage::{NewUser, UserChanges, UserStore};
use crate::utils::password::{hash_password, verify_password};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

#[derive(Debug, Clone, Default)]
pub struct SignUp {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

/// A signed-in user and the token that identifies them.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: user::Model,
    pub token: String,
}

fn required<'a>(value: &'a Option<String>, message: &str) -> AppResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}

fn check_password_length(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters long.",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }

    /// Unknown email and wrong password fail identically.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let invalid = || AppError::Unauthorized(INVALID_CREDENTIALS.to_string());

        let Some(user) = self.users.find_by_email(email).await? else {
            tracing::debug!("sign-in rejected: unknown email");
            return Err(invalid());
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = user.id_user, "sign-in rejected: bad password");
            return Err(invalid());
        }

        let token = self.tokens.issue(&user)?;
        tracing::info!(user_id = user.id_user, "user signed in");
        Ok(Session { user, token })
    }

    /// Validation runs in a fixed order and stops at the first failure.
    pub async fn sign_up(&self, request: SignUp) -> AppResult<Session> {
        let email = required(&request.email, "Email is required.")?;
        // Passwords are used verbatim, whitespace included.
        let password = request
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::BadRequest("Password is required.".to_string()))?;
        let first_name = required(&request.first_name, "First name is required.")?;
        let last_name = required(&request.last_name, "Last name is required.")?;

        if self.users.email_exists(email).await? {
            return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
        }
        check_password_length(password)?;

        let role = match request.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            None => UserRole::User,
            Some(raw) => raw
                .parse::<UserRole>()
                .map_err(|_| AppError::BadRequest("Invalid role.".to_string()))?,
        };

        let user = self
            .users
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash: hash_password(password)?,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                phone_number: request
                    .phone_number
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string(),
                role,
            })
            .await?;

        let token = self.tokens.issue(&user)?;
        tracing::info!(user_id = user.id_user, role = %user.role, "user signed up");
        Ok(Session { user, token })
    }

    pub async fn update_profile(
        &self,
        user: &user::Model,
        update: ProfileUpdate,
    ) -> AppResult<user::Model> {
        let first_name = update
            .first_name
            .map(|name| {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(AppError::BadRequest("First name cannot be blank.".to_string()));
                }
                Ok(name)
            })
            .transpose()?;
        let last_name = update
            .last_name
            .map(|name| {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(AppError::BadRequest("Last name cannot be blank.".to_string()));
                }
                Ok(name)
            })
            .transpose()?;

        let changes = UserChanges {
            first_name,
            last_name,
            phone_number: update.phone_number.map(|p| p.trim().to_string()),
            password_hash: None,
        };

        self.users
            .update_user(user.id_user, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))
    }

    pub async fn change_password(
        &self,
        user: &user::Model,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        if !verify_password(current_password, &user.password_hash)? {
            return Err(AppError::BadRequest(
                "Current password is incorrect.".to_string(),
            ));
        }
        check_password_length(new_password)?;

        let changes = UserChanges {
            password_hash: Some(hash_password(new_password)?),
            ..Default::default()
        };
        self.users
            .update_user(user.id_user, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        tracing::info!(user_id = user.id_user, "password changed");
        Ok(())
    }

    pub async fn list_users(&self, role: Option<&str>) -> AppResult<Vec<user::Model>> {
        let role = match role.map(str::trim).filter(|r| !r.is_empty()) {
            None => None,
            Some(raw) => Some(
                raw.parse::<UserRole>()
                    .map_err(|_| AppError::BadRequest("Invalid role.".to_string()))?,
            ),
        };
        self.users.list_users(role).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::utils::clock::SystemClock;
    use chrono::Duration;

    fn service() -> AccountService {
        let tokens = TokenService::new(Arc::new(SystemClock), Duration::days(7));
        AccountService::new(Arc::new(InMemoryStore::new()), tokens)
    }

    fn signup(password: &str) -> SignUp {
        SignUp {
            email: Some("new@example.com".to_string()),
            password: Some(password.to_string()),
            first_name: Some("New".to_string()),
            last_name: Some("Person".to_string()),
            ..Default::default()
        }
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::BadRequest(m) | AppError::Unauthorized(m) => m,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validation_order() {
        let accounts = service();

        let err = accounts.sign_up(SignUp::default()).await.unwrap_err();
        assert_eq!(message(err), "Email is required.");

        let err = accounts
            .sign_up(SignUp { password: None, ..signup("abc") })
            .await
            .unwrap_err();
        assert_eq!(message(err), "Password is required.");

        let err = accounts
            .sign_up(SignUp { first_name: None, ..signup("abc") })
            .await
            .unwrap_err();
        assert_eq!(message(err), "First name is required.");

        let err = accounts
            .sign_up(SignUp { last_name: Some("  ".to_string()), ..signup("abc") })
            .await
            .unwrap_err();
        assert_eq!(message(err), "Last name is required.");
    }

    #[tokio::test]
    async fn test_password_length_boundary() {
        let accounts = service();

        let err = accounts.sign_up(signup("12345")).await.unwrap_err();
        assert_eq!(message(err), "Password must be at least 6 characters long.");

        let session = accounts.sign_up(signup("123456")).await.unwrap();
        assert_eq!(session.user.role, UserRole::User);
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_checked_before_password_length() {
        let accounts = service();
        accounts.sign_up(signup("123456")).await.unwrap();

        let err = accounts.sign_up(signup("123")).await.unwrap_err();
        assert_eq!(message(err), EMAIL_TAKEN);
    }

    #[tokio::test]
    async fn test_sign_in_failures_are_indistinguishable() {
        let accounts = service();
        accounts.sign_up(signup("123456")).await.unwrap();

        let wrong_password = accounts.sign_in("new@example.com", "654321").await.unwrap_err();
        let unknown_email = accounts.sign_in("nobody@example.com", "123456").await.unwrap_err();

        assert_eq!(wrong_password.status_code(), unknown_email.status_code());
        assert_eq!(message(wrong_password), INVALID_CREDENTIALS);
        assert_eq!(message(unknown_email), INVALID_CREDENTIALS);

        assert!(accounts.sign_in("new@example.com", "123456").await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let accounts = service();
        let session = accounts.sign_up(signup("123456")).await.unwrap();

        let err = accounts
            .change_password(&session.user, "wrong!", "abcdefg")
            .await
            .unwrap_err();
        assert_eq!(message(err), "Current password is incorrect.");

        accounts
            .change_password(&session.user, "123456", "abcdefg")
            .await
            .unwrap();
        assert!(accounts.sign_in("new@example.com", "abcdefg").await.is_ok());
        assert!(accounts.sign_in("new@example.com", "123456").await.is_err());
    }

    #[tokio::test]
    async fn test_profile_update_rejects_blank_names() {
        let accounts = service();
        let session = accounts.sign_up(signup("123456")).await.unwrap();

        let err = accounts
            .update_profile(
                &session.user,
                ProfileUpdate {
                    first_name: Some(" ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(message(err), "First name cannot be blank.");

        let updated = accounts
            .update_profile(
                &session.user,
                ProfileUpdate {
                    phone_number: Some("555-0100".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone_number, "555-0100");
        assert_eq!(updated.first_name, "New");
    }
}
