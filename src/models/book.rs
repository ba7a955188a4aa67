//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{
    author::Author,
    book_instance::BookInstance,
    form::{DecodeForm, FormInput, INVALID_CHOICE, INVALID_TEXT},
    genre::Genre,
};

/// Book model from database. `genre_ids` is aggregated from `book_genres`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author_id: i32,
    pub genre_ids: Vec<i32>,
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Short book representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author: Option<Author>,
    pub genre_display: String,
}

/// Book with everything its detail page shows
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetail {
    pub book: Book,
    pub author: Author,
    pub genres: Vec<Genre>,
    /// Physical copies of this book
    pub instances: Vec<BookInstance>,
}

/// Book create/update form (title, author, summary, isbn, genre)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BookForm {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    /// Author ID
    pub author: i32,
    #[validate(length(min = 1, max = 1000, message = "Summary must be 1 to 1000 characters"))]
    pub summary: String,
    #[validate(length(equal = 13, message = "ISBN must be exactly 13 characters"))]
    pub isbn: String,
    /// Genre IDs
    #[serde(default)]
    pub genre: Vec<i32>,
}

impl DecodeForm for BookForm {
    const FIELDS: &'static [&'static str] = &["title", "author", "summary", "isbn", "genre"];

    fn read(input: &mut FormInput) -> Option<Self> {
        let title = input.required("title", INVALID_TEXT);
        let author = input.required("author", INVALID_CHOICE);
        let summary = input.required("summary", INVALID_TEXT);
        let isbn = input.required("isbn", INVALID_TEXT);
        let genre = input.optional::<Vec<i32>>("genre", INVALID_CHOICE);
        Some(Self {
            title: title?,
            author: author?,
            summary: summary?,
            isbn: isbn?,
            genre: genre?.unwrap_or_default(),
        })
    }
}

impl From<&Book> for BookForm {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author_id,
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            genre: book.genre_ids.clone(),
        }
    }
}
