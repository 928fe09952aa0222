// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::AppError,
    db::AccessRepository,
    middleware::auth::AuthenticatedUser,
    models::auth::{Role, User},
};

/// Guardião das rotas do financeiro. Exige `auth_guard` antes.
#[derive(Debug, Clone)]
pub struct RequireFinance(pub User);

impl<S> FromRequestParts<S> for RequireFinance
where
    S: Send + Sync,
    AccessRepository: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        let access_repo = AccessRepository::from_ref(state);
        if !access_repo.has_role(user.id, Role::Finance).await? {
            tracing::warn!(user_id = %user.id, "Acesso negado a rota do financeiro");
            return Err(AppError::Forbidden(
                "Você precisa do papel 'FINANCE' para realizar esta ação.".into(),
            ));
        }

        Ok(RequireFinance(user))
    }
}
