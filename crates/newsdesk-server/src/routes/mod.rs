//! HTTP handlers, one module per resource, mounted under the API prefix.

mod accounts;
mod articles;
mod categories;
mod channels;
mod media;
mod notifications;
mod users;

use axum::Router;

use crate::api::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/articles", articles::router())
        .nest("/categories", categories::router())
        .nest("/channels", channels::router())
        .nest("/auth", accounts::router())
        .nest("/users", users::router())
        .nest("/notifications", notifications::router())
        .nest("/media", media::router())
}
