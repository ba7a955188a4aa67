//! Named routes used for redirects and record links

use axum::response::Redirect;
use uuid::Uuid;

/// Prefix under which the API router is nested
pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Index,
    Books,
    BookDetail(i32),
    Authors,
    AuthorDetail(i32),
    Genres,
    GenreDetail(i32),
    MyBorrowed,
    AllBorrowed,
    RenewBookLibrarian(Uuid),
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Index => "index",
            Route::Books => "books",
            Route::BookDetail(_) => "book-detail",
            Route::Authors => "authors",
            Route::AuthorDetail(_) => "author-detail",
            Route::Genres => "genres",
            Route::GenreDetail(_) => "genre-detail",
            Route::MyBorrowed => "my-borrowed",
            Route::AllBorrowed => "all-borrowed",
            Route::RenewBookLibrarian(_) => "renew-book-librarian",
        }
    }

    /// Absolute path of the route
    pub fn path(&self) -> String {
        let relative = match self {
            Route::Index => "/index".to_string(),
            Route::Books => "/books".to_string(),
            Route::BookDetail(id) => format!("/books/{}", id),
            Route::Authors => "/authors".to_string(),
            Route::AuthorDetail(id) => format!("/authors/{}", id),
            Route::Genres => "/genres".to_string(),
            Route::GenreDetail(id) => format!("/genres/{}", id),
            Route::MyBorrowed => "/mybooks".to_string(),
            Route::AllBorrowed => "/borrowed".to_string(),
            Route::RenewBookLibrarian(id) => format!("/bookinstances/{}/renew", id),
        };
        format!("{}{}", API_PREFIX, relative)
    }

    /// 303 See Other to this route
    pub fn redirect(&self) -> Redirect {
        tracing::debug!("Redirecting to '{}'", self.name());
        Redirect::to(&self.path())
    }
}
