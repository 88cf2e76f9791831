use axum::{extract::Request, middleware::Next, response::Response};

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;

pub fn authorize_admin(principal: Option<&user::Model>) -> bool {
    principal.is_some_and(|p| p.role == UserRole::Admin)
}

/// Require admin role. Runs after `optional_auth`, so an anonymous caller
/// is refused with 403 as well.
pub async fn require_admin(request: Request, next: Next) -> AppResult<Response> {
    let principal = request.extensions().get::<CurrentUser>().map(|c| &c.0);

    if !authorize_admin(principal) {
        tracing::debug!(
            user_id = principal.map(|p| p.id_user),
            "admin access refused"
        );
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action.".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_role(role: UserRole) -> user::Model {
        user::Model {
            id_user: 1,
            role,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: "a@b.c".to_string(),
            phone_number: String::new(),
            password_hash: String::new(),
        }
    }

    #[test]
    fn test_only_admins_pass() {
        assert!(authorize_admin(Some(&with_role(UserRole::Admin))));
        assert!(!authorize_admin(Some(&with_role(UserRole::User))));
        assert!(!authorize_admin(Some(&with_role(UserRole::Driver))));
        assert!(!authorize_admin(Some(&with_role(UserRole::Passenger))));
        assert!(!authorize_admin(None));
    }
}
