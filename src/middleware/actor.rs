// src/middleware/actor.rs

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use crate::common::error::ApiError;

// Preenchido pelo gateway na frente deste serviço.
const ACTOR_HEADER: &str = "x-user-name";
pub const DEFAULT_ACTOR: &str = "system";
const MAX_ACTOR_LEN: usize = 100;

/// Usuário gravado como `created_by` em lotes e movimentações.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(ACTOR_HEADER) else {
            return Ok(Actor(DEFAULT_ACTOR.to_string()));
        };

        let name = value
            .to_str()
            .map_err(|_| ApiError::bad_request("The x-user-name header contains invalid characters."))?
            .trim();

        if name.is_empty() {
            return Ok(Actor(DEFAULT_ACTOR.to_string()));
        }
        if name.len() > MAX_ACTOR_LEN {
            return Err(ApiError::bad_request("The x-user-name header is too long."));
        }

        Ok(Actor(name.to_string()))
    }
}
