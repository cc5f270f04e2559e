use crate::accounts::{self, LoginOutcome, RoleChoice};
use crate::auth::{self as auth_service, AuthState, TokenClaims};
use crate::error::AppError;
use crate::permissions::{self, Permission};
use crate::state::AppState;
use crate::types::user::{NewUser, UserView};

use axum::Json;
use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;
use time::OffsetDateTime;

/// What a route requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Public,
    /// A valid token holding every listed permission. An empty list only needs the token.
    Authenticated(&'static [Permission]),
}

use Permission::*;

/// Route table consulted by [`require_access`], keyed by method and matched route
/// template. Routes missing from the table still require a valid token.
pub(crate) fn access_for(method: &Method, route: &str) -> Access {
    match (method.as_str(), route) {
        (_, "/health") => Access::Public,
        ("POST", "/auth/login" | "/auth/register") => Access::Public,
        ("GET", "/enums/garbage-types" | "/enums/frequencies" | "/enums/permissions") => {
            Access::Public
        }
        (
            "GET",
            "/schedules"
            | "/schedules/{id}"
            | "/schedules/location/{location}"
            | "/schedules/garbage-type/{garbage_type}"
            | "/schedules/frequency/{frequency}",
        ) => Access::Public,
        ("GET", "/api/push/public-key") => Access::Public,

        ("POST", "/schedules") | ("PUT", "/schedules/{id}") => {
            Access::Authenticated(&[WriteSchedules])
        }
        ("DELETE", "/schedules" | "/schedules/{id}") => Access::Authenticated(&[DeleteSchedules]),
        ("POST", "/schedules/replace-all") => {
            Access::Authenticated(&[WriteSchedules, DeleteSchedules])
        }

        ("GET" | "PUT", "/users/me") | ("PUT", "/users/me/password") => Access::Authenticated(&[]),
        ("GET", "/users" | "/users/{id}") => Access::Authenticated(&[ReadUsers]),
        ("POST", "/users") | ("PUT", "/users/{id}") => Access::Authenticated(&[WriteUsers]),
        ("DELETE", "/users/{id}") => Access::Authenticated(&[DeleteUsers]),
        ("GET", "/permissions") => Access::Authenticated(&[]),

        ("GET", "/roles") => Access::Authenticated(&[ReadUsers]),
        ("POST", "/roles") | ("PUT", "/roles/{id}") => Access::Authenticated(&[WriteUsers]),
        ("DELETE", "/roles/{id}") => Access::Authenticated(&[WriteUsers, DeleteUsers]),

        ("POST", "/subscriptions") => Access::Authenticated(&[]),
        ("POST", "/notifications/tomorrow") => Access::Authenticated(&[]),
        ("POST", "/notifications/users/{id}/tomorrow" | "/notifications/sweep") => {
            Access::Authenticated(&[WriteSchedules])
        }
        ("POST", "/notifications/users/{id}" | "/notifications/broadcast") => {
            Access::Authenticated(&[WriteUsers])
        }

        _ => Access::Authenticated(&[]),
    }
}

/// Guard for every routed request. Works only on the token's embedded permissions and
/// never consults the store. Verified claims are handed to handlers as an extension.
pub(crate) async fn require_access(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let access = match req.extensions().get::<MatchedPath>() {
        Some(route) => access_for(req.method(), route.as_str()),
        None => Access::Authenticated(&[]),
    };
    let Access::Authenticated(required) = access else {
        return Ok(next.run(req).await);
    };

    let claims = authenticate(&state.auth, req.headers())?;
    if !permissions::has_all(&claims.permissions, required) {
        tracing::debug!(
            user_id = %claims.user_id,
            method = %req.method(),
            path = %req.uri().path(),
            "insufficient permissions"
        );
        return Err(AppError::Unauthorized);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn authenticate(auth: &AuthState, headers: &HeaderMap) -> Result<TokenClaims, AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(auth_service::bearer_token)
        .ok_or(AppError::Unauthenticated)?;
    auth.verify_token(token)
        .map_err(|_| AppError::Unauthenticated)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginOutcome>, AppError> {
    let outcome = accounts::login(
        state.store.as_ref(),
        &state.auth,
        &request.email,
        &request.password,
    )?;
    Ok(Json(outcome))
}

pub(crate) async fn register(
    State(state): State<AppState>,
    Json(profile): Json<NewUser>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let user = accounts::register(
        state.store.as_ref(),
        profile,
        RoleChoice::SelfService,
        OffsetDateTime::now_utc(),
    )?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn access_for__should_require_both_permissions_for_replace_all() {
        let access = access_for(&Method::POST, "/schedules/replace-all");

        assert_eq!(
            access,
            Access::Authenticated(&[WriteSchedules, DeleteSchedules])
        );
    }

    #[test]
    fn access_for__should_distinguish_methods_on_same_route() {
        assert_eq!(access_for(&Method::GET, "/schedules/{id}"), Access::Public);
        assert_eq!(
            access_for(&Method::PUT, "/schedules/{id}"),
            Access::Authenticated(&[WriteSchedules])
        );
        assert_eq!(
            access_for(&Method::DELETE, "/schedules/{id}"),
            Access::Authenticated(&[DeleteSchedules])
        );
    }

    #[test]
    fn access_for__should_fail_closed_for_unlisted_routes() {
        assert_eq!(
            access_for(&Method::GET, "/not-in-table"),
            Access::Authenticated(&[])
        );
        assert_eq!(
            access_for(&Method::POST, "/enums/permissions"),
            Access::Authenticated(&[])
        );
    }

    #[test]
    fn authenticate__should_reject_other_schemes() {
        // Given
        let auth = AuthState::from_key_bytes(b"guard-secret");
        let token = auth.issue_token("u1", &[]).expect("token");
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            format!("Token {token}").parse().expect("header"),
        );

        // When
        let result = authenticate(&auth, &headers);

        // Then
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }
}
