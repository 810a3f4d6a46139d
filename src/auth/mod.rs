pub mod jwt;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

pub const TEAM_ROLES: [&str; 2] = ["team", "admin"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl AuthenticatedUser {
    pub fn is_team(&self) -> bool {
        TEAM_ROLES
            .iter()
            .any(|role| self.role.eq_ignore_ascii_case(role))
    }

    /// Name recorded on audit notes; falls back to the email when the
    /// identity provider sent no display name.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email.trim().to_lowercase(),
            name: claims.name,
            role: claims.role,
        })
    }
}

/// An authenticated identity holding a team or admin role.
#[derive(Debug, Clone)]
pub struct TeamMember(pub AuthenticatedUser);

#[async_trait]
impl FromRequestParts<AppState> for TeamMember {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_team() {
            return Err(AppError::forbidden());
        }
        Ok(TeamMember(user))
    }
}
