//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, authors, book_instances, books, genres, health, index, views};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.1.0",
        description = "Library catalog REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        // Catalog
        index::index,
        genres::list_genres,
        genres::genre_detail,
        genres::create_form,
        genres::create_genre,
        genres::update_form,
        genres::update_genre,
        genres::delete_confirm,
        genres::delete_genre,
        // Books
        books::list_books,
        books::book_detail,
        books::create_form,
        books::create_book,
        books::update_form,
        books::update_book,
        books::delete_confirm,
        books::delete_book,
        // Authors
        authors::list_authors,
        authors::author_detail,
        authors::create_form,
        authors::create_author,
        authors::update_form,
        authors::update_author,
        authors::delete_confirm,
        authors::delete_author,
        // Loans
        book_instances::my_borrowed,
        book_instances::all_borrowed,
        book_instances::renew_form,
        book_instances::renew_submit,
        book_instances::list_instances,
        book_instances::create_instance,
        book_instances::update_instance,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            crate::models::user::Permission,
            // Catalog
            crate::models::author::Author,
            crate::models::author::AuthorForm,
            crate::models::genre::Genre,
            crate::models::genre::GenreForm,
            crate::models::book::Book,
            crate::models::book::BookForm,
            // Loans
            crate::models::book_instance::BookInstance,
            crate::models::book_instance::BookInstanceForm,
            crate::models::book_instance::LoanStatus,
            crate::services::renewal::RenewalForm,
            // Views
            views::View,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "catalog", description = "Home page and genre maintenance"),
        (name = "books", description = "Book pages and forms"),
        (name = "authors", description = "Author pages and forms"),
        (name = "loans", description = "Borrowed books, renewal and copies")
    )
)]
pub struct ApiDoc;

/// Declares the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
