//! Repository layer for catalog storage
//!
//! Services talk to storage through [`CatalogStore`]. [`Repository`] is the
//! PostgreSQL implementation; [`memory::MemoryStore`] keeps everything in
//! process and backs the tests and `database.backend = "memory"` runs.

pub mod authors;
pub mod book_instances;
pub mod books;
pub mod genres;
pub mod memory;
pub mod users;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorForm},
        book::{Book, BookForm},
        book_instance::{BookInstance, BookInstanceFilter, BookInstanceForm, BorrowedCopy, LoanStatus},
        genre::{Genre, GenreForm},
        user::{NewUser, User},
    },
};

/// Every read and write the services perform against the catalog.
///
/// Lookups by identifier fail with `NotFound` when the record does not exist.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> AppResult<()>;

    // Authors
    async fn count_authors(&self) -> AppResult<i64>;
    /// Ordered by last name, then first name
    async fn list_authors(&self, limit: i64, offset: i64) -> AppResult<Vec<Author>>;
    async fn get_author(&self, id: i32) -> AppResult<Author>;
    async fn get_authors(&self, ids: &[i32]) -> AppResult<Vec<Author>>;
    async fn create_author(&self, form: &AuthorForm) -> AppResult<Author>;
    async fn update_author(&self, id: i32, form: &AuthorForm) -> AppResult<Author>;
    /// Fails with `Conflict` while the author still owns books
    async fn delete_author(&self, id: i32) -> AppResult<()>;

    // Genres
    /// Ordered by name
    async fn list_genres(&self) -> AppResult<Vec<Genre>>;
    async fn get_genre(&self, id: i32) -> AppResult<Genre>;
    /// Names are unique; a taken name is a `Conflict`
    async fn create_genre(&self, form: &GenreForm) -> AppResult<Genre>;
    async fn update_genre(&self, id: i32, form: &GenreForm) -> AppResult<Genre>;
    /// Also unlinks the genre from its books
    async fn delete_genre(&self, id: i32) -> AppResult<()>;

    // Books
    async fn count_books(&self) -> AppResult<i64>;
    /// Case-insensitive substring match on the title
    async fn count_books_with_title(&self, needle: &str) -> AppResult<i64>;
    /// Ordered by title
    async fn list_books(&self, limit: i64, offset: i64) -> AppResult<Vec<Book>>;
    async fn books_by_author(&self, author_id: i32) -> AppResult<Vec<Book>>;
    async fn get_book(&self, id: i32) -> AppResult<Book>;
    async fn create_book(&self, form: &BookForm) -> AppResult<Book>;
    async fn update_book(&self, id: i32, form: &BookForm) -> AppResult<Book>;
    /// Also removes the book's instances and genre links
    async fn delete_book(&self, id: i32) -> AppResult<()>;

    // Book instances
    async fn count_instances(&self) -> AppResult<i64>;
    async fn count_instances_with_status(&self, status: LoanStatus) -> AppResult<i64>;
    async fn get_instance(&self, id: Uuid) -> AppResult<BookInstance>;
    async fn instances_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>>;
    async fn list_instances(&self, filter: &BookInstanceFilter) -> AppResult<Vec<BookInstance>>;
    async fn count_on_loan_for_borrower(&self, borrower_id: i32) -> AppResult<i64>;
    /// On-loan copies of one borrower, due soonest first
    async fn on_loan_for_borrower(
        &self,
        borrower_id: i32,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BorrowedCopy>>;
    /// Every on-loan copy, due soonest first
    async fn all_on_loan(&self) -> AppResult<Vec<BorrowedCopy>>;
    async fn create_instance(&self, book_id: i32, form: &BookInstanceForm) -> AppResult<BookInstance>;
    async fn update_instance(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance>;
    /// Single-row update of the due-back date; last writer wins
    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance>;

    // Users
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn get_user(&self, id: i32) -> AppResult<User>;
    async fn create_user(&self, user: &NewUser) -> AppResult<User>;
}

/// PostgreSQL repository holding the connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub authors: authors::AuthorsRepository,
    pub genres: genres::GenresRepository,
    pub books: books::BooksRepository,
    pub book_instances: book_instances::BookInstancesRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: authors::AuthorsRepository::new(pool.clone()),
            genres: genres::GenresRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            book_instances: book_instances::BookInstancesRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl CatalogStore for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn count_authors(&self) -> AppResult<i64> {
        self.authors.count().await
    }

    async fn list_authors(&self, limit: i64, offset: i64) -> AppResult<Vec<Author>> {
        self.authors.list(limit, offset).await
    }

    async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.authors.get_by_id(id).await
    }

    async fn get_authors(&self, ids: &[i32]) -> AppResult<Vec<Author>> {
        self.authors.get_by_ids(ids).await
    }

    async fn create_author(&self, form: &AuthorForm) -> AppResult<Author> {
        self.authors.create(form).await
    }

    async fn update_author(&self, id: i32, form: &AuthorForm) -> AppResult<Author> {
        self.authors.update(id, form).await
    }

    async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.authors.delete(id).await
    }

    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.genres.list().await
    }

    async fn get_genre(&self, id: i32) -> AppResult<Genre> {
        self.genres.get_by_id(id).await
    }

    async fn create_genre(&self, form: &GenreForm) -> AppResult<Genre> {
        self.genres.create(form).await
    }

    async fn update_genre(&self, id: i32, form: &GenreForm) -> AppResult<Genre> {
        self.genres.update(id, form).await
    }

    async fn delete_genre(&self, id: i32) -> AppResult<()> {
        self.genres.delete(id).await
    }

    async fn count_books(&self) -> AppResult<i64> {
        self.books.count().await
    }

    async fn count_books_with_title(&self, needle: &str) -> AppResult<i64> {
        self.books.count_with_title(needle).await
    }

    async fn list_books(&self, limit: i64, offset: i64) -> AppResult<Vec<Book>> {
        self.books.list(limit, offset).await
    }

    async fn books_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        self.books.by_author(author_id).await
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.books.get_by_id(id).await
    }

    async fn create_book(&self, form: &BookForm) -> AppResult<Book> {
        self.books.create(form).await
    }

    async fn update_book(&self, id: i32, form: &BookForm) -> AppResult<Book> {
        self.books.update(id, form).await
    }

    async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.books.delete(id).await
    }

    async fn count_instances(&self) -> AppResult<i64> {
        self.book_instances.count().await
    }

    async fn count_instances_with_status(&self, status: LoanStatus) -> AppResult<i64> {
        self.book_instances.count_with_status(status).await
    }

    async fn get_instance(&self, id: Uuid) -> AppResult<BookInstance> {
        self.book_instances.get_by_id(id).await
    }

    async fn instances_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        self.book_instances.for_book(book_id).await
    }

    async fn list_instances(&self, filter: &BookInstanceFilter) -> AppResult<Vec<BookInstance>> {
        self.book_instances.list(filter).await
    }

    async fn count_on_loan_for_borrower(&self, borrower_id: i32) -> AppResult<i64> {
        self.book_instances.count_on_loan_for_borrower(borrower_id).await
    }

    async fn on_loan_for_borrower(
        &self,
        borrower_id: i32,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BorrowedCopy>> {
        self.book_instances
            .on_loan_for_borrower(borrower_id, limit, offset)
            .await
    }

    async fn all_on_loan(&self) -> AppResult<Vec<BorrowedCopy>> {
        self.book_instances.all_on_loan().await
    }

    async fn create_instance(&self, book_id: i32, form: &BookInstanceForm) -> AppResult<BookInstance> {
        self.book_instances.create(book_id, form).await
    }

    async fn update_instance(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance> {
        self.book_instances.update(id, form).await
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        self.book_instances.set_due_back(id, due_back).await
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.users.find_by_username(username).await
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        self.users.get_by_id(id).await
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        self.users.create(user).await
    }
}
