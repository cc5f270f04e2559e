use crate::state;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};

mod auth;
mod enums;
mod push;
mod roles;
mod schedules;
mod users;

pub fn app(state: state::AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/enums/garbage-types", get(enums::garbage_types))
        .route("/enums/frequencies", get(enums::frequencies))
        .route("/enums/permissions", get(enums::permissions))
        .route(
            "/schedules",
            get(schedules::list)
                .post(schedules::create)
                .delete(schedules::delete_all),
        )
        .route("/schedules/replace-all", post(schedules::replace_all))
        .route(
            "/schedules/{id}",
            get(schedules::get)
                .put(schedules::update)
                .delete(schedules::delete),
        )
        .route("/schedules/location/{location}", get(schedules::by_location))
        .route(
            "/schedules/garbage-type/{garbage_type}",
            get(schedules::by_garbage_type),
        )
        .route("/schedules/frequency/{frequency}", get(schedules::by_frequency))
        .route("/users", get(users::list).post(users::create))
        .route("/users/me", get(users::me).put(users::update_me))
        .route("/users/me/password", put(users::change_my_password))
        .route(
            "/users/{id}",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/permissions", get(users::my_permissions))
        .route("/roles", get(roles::list).post(roles::create))
        .route("/roles/{id}", put(roles::update).delete(roles::delete))
        .route("/subscriptions", post(push::subscribe))
        .route("/api/push/public-key", get(push::public_key))
        .route("/notifications/tomorrow", post(push::notify_me_tomorrow))
        .route(
            "/notifications/users/{id}/tomorrow",
            post(push::notify_user_tomorrow),
        )
        .route("/notifications/users/{id}", post(push::notify_user))
        .route("/notifications/broadcast", post(push::broadcast))
        .route("/notifications/sweep", post(push::sweep_now))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_access,
        ))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
