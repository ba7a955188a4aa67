//! Data models for Libris

pub mod author;
pub mod book;
pub mod book_instance;
pub mod form;
pub mod genre;
pub mod pagination;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorForm};
pub use book::{Book, BookForm, BookSummary};
pub use book_instance::{BookInstance, BookInstanceForm, LoanStatus};
pub use form::{DecodeForm, RejectedForm, Submission};
pub use genre::{Genre, GenreForm};
pub use pagination::{Page, PageQuery, PageWindow};
pub use user::{Permission, User, UserClaims};
