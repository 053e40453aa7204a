// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::UserRole,
};

/// 1. O Trait que define quais papéis passam pelo portão
pub trait RoleGate: Send + Sync + 'static {
    fn allowed() -> &'static [UserRole];
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleGate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = Locale::from_headers(&parts.headers);

        // A. Extrai Usuário (posto pelo auth_guard)
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

        // B. Confere o papel
        let allowed = T::allowed();
        if !allowed.contains(&user.0.role) {
            tracing::warn!(user_id = %user.0.id, role = %user.0.role, "Acesso negado por papel");
            let roles = allowed
                .iter()
                .map(UserRole::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AppError::Forbidden(roles).to_api_error(&locale));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PORTÕES (TIPOS)
// ---

pub struct ManageEmployees;
impl RoleGate for ManageEmployees {
    fn allowed() -> &'static [UserRole] {
        &[UserRole::Superadmin, UserRole::Leader, UserRole::Admin]
    }
}
