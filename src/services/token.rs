//! Opaque session tokens.
//!
//! A token is the standard base64 encoding of a JSON claim set. It carries no
//! signature: anyone who knows the format can mint one, and the embedded role
//! is advisory. [`TokenService::resolve_principal`] therefore always reloads
//! the user by email and trusts only what storage returns.
//!
//! TODO: HMAC-sign the claim payload with a server secret before exposing
//! these tokens outside a trusted network.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::storage::UserStore;
use crate::utils::clock::Clock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub email: String,
    pub role: UserRole,
    pub id_user: i32,
    /// Unix seconds.
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, principal: &user::Model) -> AppResult<String> {
        let claims = TokenClaims {
            email: principal.email.clone(),
            role: principal.role,
            id_user: principal.id_user,
            exp: self
                .clock
                .now()
                .checked_add_signed(self.ttl)
                .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?
                .timestamp(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| AppError::Internal(format!("Failed to encode token: {}", e)))?;
        Ok(STANDARD.encode(payload))
    }

    /// Returns `None` for anything that is not a well-formed, unexpired token.
    pub fn decode(&self, token: &str) -> Option<TokenClaims> {
        let bytes = STANDARD.decode(token.trim()).ok()?;
        let claims: TokenClaims = serde_json::from_slice(&bytes).ok()?;

        if self.clock.now().timestamp() > claims.exp {
            tracing::debug!(email = %claims.email, "token expired");
            return None;
        }

        Some(claims)
    }

    /// Decodes `token` and loads the current user for its email.
    pub async fn resolve_principal(
        &self,
        token: &str,
        lookup: &dyn UserStore,
    ) -> AppResult<Option<user::Model>> {
        let Some(claims) = self.decode(token) else {
            return Ok(None);
        };
        lookup.find_by_email(&claims.email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStore, NewUser};
    use crate::utils::clock::FixedClock;
    use chrono::DateTime;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ))
    }

    async fn store_with_user(role: UserRole) -> (InMemoryStore, user::Model) {
        let store = InMemoryStore::new();
        let user = store
            .insert_user(NewUser {
                email: "rider@example.com".to_string(),
                password_hash: String::new(),
                first_name: "Rita".to_string(),
                last_name: "Rider".to_string(),
                phone_number: String::new(),
                role,
            })
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn test_round_trip_within_window() {
        let clock = clock();
        let tokens = TokenService::new(clock.clone(), Duration::days(7));
        let (store, user) = store_with_user(UserRole::User).await;

        let token = tokens.issue(&user).unwrap();
        clock.advance(Duration::days(7));

        let resolved = tokens.resolve_principal(&token, &store).await.unwrap();
        assert_eq!(resolved, Some(user));
    }

    #[tokio::test]
    async fn test_expired_token_resolves_to_none() {
        let clock = clock();
        let tokens = TokenService::new(clock.clone(), Duration::days(7));
        let (store, user) = store_with_user(UserRole::User).await;

        let token = tokens.issue(&user).unwrap();
        clock.advance(Duration::days(7) + Duration::seconds(1));

        assert!(tokens.decode(&token).is_none());
        assert!(tokens.resolve_principal(&token, &store).await.unwrap().is_none());
    }

    #[test]
    fn test_claims_carry_identity() {
        let tokens = TokenService::new(clock(), Duration::days(7));
        let user = user::Model {
            id_user: 42,
            role: UserRole::Driver,
            first_name: "D".to_string(),
            last_name: "R".to_string(),
            email: "d@example.com".to_string(),
            phone_number: String::new(),
            password_hash: String::new(),
        };

        let claims = tokens.decode(&tokens.issue(&user).unwrap()).unwrap();
        assert_eq!(claims.email, "d@example.com");
        assert_eq!(claims.role, UserRole::Driver);
        assert_eq!(claims.id_user, 42);
        assert_eq!(claims.exp, 1_700_000_000 + 7 * 24 * 3600);
    }

    #[test]
    fn test_garbage_is_invalid_not_an_error() {
        let tokens = TokenService::new(clock(), Duration::days(7));
        assert!(tokens.decode("").is_none());
        assert!(tokens.decode("%%% not base64 %%%").is_none());
        assert!(tokens.decode(&STANDARD.encode("not json")).is_none());
        assert!(tokens.decode(&STANDARD.encode(r#"{"email":"x@y.z"}"#)).is_none());
        assert!(tokens.decode(&STANDARD.encode([0xff, 0xfe, 0x00])).is_none());
    }

    #[tokio::test]
    async fn test_role_comes_from_storage_not_claims() {
        let tokens = TokenService::new(clock(), Duration::days(7));
        let (store, user) = store_with_user(UserRole::User).await;

        let forged = TokenClaims {
            email: user.email.clone(),
            role: UserRole::Admin,
            id_user: user.id_user,
            exp: 1_800_000_000,
        };
        let token = STANDARD.encode(serde_json::to_vec(&forged).unwrap());

        let resolved = tokens.resolve_principal(&token, &store).await.unwrap().unwrap();
        assert_eq!(resolved.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_unknown_subject_resolves_to_none() {
        let tokens = TokenService::new(clock(), Duration::days(7));
        let (_, user) = store_with_user(UserRole::User).await;
        let token = tokens.issue(&user).unwrap();

        let empty = InMemoryStore::new();
        assert!(tokens.resolve_principal(&token, &empty).await.unwrap().is_none());
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let tokens = TokenService::new(clock(), Duration::MAX);
        let user = user::Model {
            id_user: 1,
            role: UserRole::User,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: "a@example.com".to_string(),
            phone_number: String::new(),
            password_hash: String::new(),
        };
        assert!(matches!(tokens.issue(&user), Err(AppError::Internal(_))));
    }
}
