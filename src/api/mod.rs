//! API handlers for Libris REST endpoints

pub mod auth;
pub mod authors;
pub mod book_instances;
pub mod books;
pub mod genres;
pub mod health;
pub mod index;
pub mod openapi;
pub mod routes;
pub mod views;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::NaiveDate;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::SessionConfig,
    error::{AppError, AppResult},
    models::user::UserClaims,
    services::sessions::Session,
    AppState,
};

/// Who is asking, and under which session
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor: Option<UserClaims>,
    pub session: Session,
}

impl RequestContext {
    /// The authenticated actor, or `Authentication` for anonymous requests
    pub fn require_login(&self) -> AppResult<&UserClaims> {
        self.actor
            .as_ref()
            .ok_or_else(|| AppError::Authentication("Login required".to_string()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // An absent header is an anonymous request; a malformed one is rejected
        let actor = match parts.headers.get(AUTHORIZATION) {
            None => None,
            Some(value) => {
                let token = value
                    .to_str()
                    .ok()
                    .and_then(|header| header.strip_prefix("Bearer "))
                    .ok_or_else(|| {
                        AppError::Authentication("Invalid authorization header format".to_string())
                    })?;
                Some(state.services.auth.verify_token(token)?)
            }
        };

        let jar = CookieJar::from_headers(&parts.headers);
        let session = Session::from_cookie(
            jar.get(&state.config.session.cookie_name)
                .map(|cookie| cookie.value()),
        );

        Ok(Self { actor, session })
    }
}

/// Session cookie carrying the session id
pub fn session_cookie(config: &SessionConfig, session: &Session) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), session.id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Local calendar date used for due-date arithmetic
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        // Home page
        .route("/index", get(index::index))
        // Genres
        .route("/genres", get(genres::list_genres))
        .route("/genres/create", get(genres::create_form).post(genres::create_genre))
        .route("/genres/:id", get(genres::genre_detail))
        .route("/genres/:id/update", get(genres::update_form).post(genres::update_genre))
        .route("/genres/:id/delete", get(genres::delete_confirm).post(genres::delete_genre))
        // Books
        .route("/books", get(books::list_books))
        .route("/books/create", get(books::create_form).post(books::create_book))
        .route("/books/:id", get(books::book_detail))
        .route("/books/:id/update", get(books::update_form).post(books::update_book))
        .route("/books/:id/delete", get(books::delete_confirm).post(books::delete_book))
        .route("/books/:id/instances", post(book_instances::create_instance))
        // Authors
        .route("/authors", get(authors::list_authors))
        .route("/authors/create", get(authors::create_form).post(authors::create_author))
        .route("/authors/:id", get(authors::author_detail))
        .route("/authors/:id/update", get(authors::update_form).post(authors::update_author))
        .route("/authors/:id/delete", get(authors::delete_confirm).post(authors::delete_author))
        // Loans
        .route("/mybooks", get(book_instances::my_borrowed))
        .route("/borrowed", get(book_instances::all_borrowed))
        .route(
            "/bookinstances/:id/renew",
            get(book_instances::renew_form).post(book_instances::renew_submit),
        )
        // Copy administration
        .route("/bookinstances", get(book_instances::list_instances))
        .route("/bookinstances/:id", put(book_instances::update_instance))
        .with_state(state);

    Router::new()
        .nest(routes::API_PREFIX, api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
