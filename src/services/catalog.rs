//! Catalog service: read-only queries and author/book/genre maintenance

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    config::CatalogConfig,
    error::{field_error, AppError, AppResult},
    models::{
        author::{Author, AuthorForm},
        book::{Book, BookDetail, BookForm, BookSummary},
        book_instance::LoanStatus,
        genre::{genre_display, Genre, GenreForm},
        pagination::{Page, PageQuery, PageWindow},
    },
    repository::CatalogStore,
};

/// Aggregate counts shown on the catalog home page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IndexCounts {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_authors: i64,
    pub num_books_with_title: i64,
}

/// Author with the books they wrote
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorDetail {
    pub author: Author,
    pub books: Vec<Book>,
}

/// Run derive-based field validation, keeping the errors for re-display
fn validate_fields<T: Validate>(form: &T) -> ValidationErrors {
    form.validate().err().unwrap_or_else(ValidationErrors::new)
}

fn into_result(errors: ValidationErrors) -> AppResult<()> {
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidForm(errors))
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, config: CatalogConfig) -> Self {
        Self { store, config }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Counts for the home page
    pub async fn index_counts(&self) -> AppResult<IndexCounts> {
        Ok(IndexCounts {
            num_books: self.store.count_books().await?,
            num_instances: self.store.count_instances().await?,
            num_instances_available: self
                .store
                .count_instances_with_status(LoanStatus::Available)
                .await?,
            num_authors: self.store.count_authors().await?,
            num_books_with_title: self
                .count_books_with_title(&self.config.index_title_search)
                .await?,
        })
    }

    /// Count books whose title contains `needle`, ignoring case
    pub async fn count_books_with_title(&self, needle: &str) -> AppResult<i64> {
        self.store.count_books_with_title(needle).await
    }

    /// One page of books with their author and leading genres
    pub async fn list_books(&self, query: PageQuery) -> AppResult<Page<BookSummary>> {
        let total = self.store.count_books().await?;
        let window = PageWindow::resolve(query.page, self.config.page_size, total)?;
        let books = self.store.list_books(window.limit(), window.offset()).await?;

        let author_ids: Vec<i32> = books
            .iter()
            .map(|b| b.author_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let authors: HashMap<i32, Author> = self
            .store
            .get_authors(&author_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        let genres = self.store.list_genres().await?;

        let summaries = books
            .into_iter()
            .map(|book| BookSummary {
                id: book.id,
                author: authors.get(&book.author_id).cloned(),
                genre_display: genre_display(&genres_of(&book, &genres)),
                title: book.title,
            })
            .collect();

        Ok(Page::new(summaries, window))
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.store.get_book(id).await
    }

    /// Book with author, genres and copies
    pub async fn book_detail(&self, id: i32) -> AppResult<BookDetail> {
        let book = self.store.get_book(id).await?;
        let author = self.store.get_author(book.author_id).await?;
        let genres = genres_of(&book, &self.store.list_genres().await?);
        let instances = self.store.instances_for_book(id).await?;

        Ok(BookDetail {
            book,
            author,
            genres,
            instances,
        })
    }

    /// One page of authors ordered by name
    pub async fn list_authors(&self, query: PageQuery) -> AppResult<Page<Author>> {
        let total = self.store.count_authors().await?;
        let window = PageWindow::resolve(query.page, self.config.page_size, total)?;
        let authors = self.store.list_authors(window.limit(), window.offset()).await?;
        Ok(Page::new(authors, window))
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.store.get_author(id).await
    }

    pub async fn author_detail(&self, id: i32) -> AppResult<AuthorDetail> {
        let author = self.store.get_author(id).await?;
        let books = self.store.books_by_author(id).await?;
        Ok(AuthorDetail { author, books })
    }

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.store.list_genres().await
    }

    /// Every author, for choice lists in book forms
    pub async fn all_authors(&self) -> AppResult<Vec<Author>> {
        let total = self.store.count_authors().await?;
        self.store.list_authors(total, 0).await
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    pub async fn create_author(&self, form: &AuthorForm) -> AppResult<Author> {
        into_result(validate_fields(form))?;
        let author = self.store.create_author(form).await?;
        tracing::info!("Created author id={} ({})", author.id, author);
        Ok(author)
    }

    pub async fn update_author(&self, id: i32, form: &AuthorForm) -> AppResult<Author> {
        self.store.get_author(id).await?;
        into_result(validate_fields(form))?;
        let author = self.store.update_author(id, form).await?;
        tracing::info!("Updated author id={}", id);
        Ok(author)
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.store.delete_author(id).await?;
        tracing::info!("Deleted author id={}", id);
        Ok(())
    }

    // =========================================================================
    // GENRES
    // =========================================================================

    pub async fn get_genre(&self, id: i32) -> AppResult<Genre> {
        self.store.get_genre(id).await
    }

    pub async fn create_genre(&self, form: &GenreForm) -> AppResult<Genre> {
        into_result(validate_fields(form))?;
        let genre = self.store.create_genre(form).await?;
        tracing::info!("Created genre id={} ({})", genre.id, genre);
        Ok(genre)
    }

    pub async fn update_genre(&self, id: i32, form: &GenreForm) -> AppResult<Genre> {
        self.store.get_genre(id).await?;
        into_result(validate_fields(form))?;
        let genre = self.store.update_genre(id, form).await?;
        tracing::info!("Updated genre id={}", id);
        Ok(genre)
    }

    /// Delete a genre; books keep their other genres
    pub async fn delete_genre(&self, id: i32) -> AppResult<()> {
        self.store.delete_genre(id).await?;
        tracing::info!("Deleted genre id={}", id);
        Ok(())
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    /// Field checks plus existence of the referenced author and genres
    async fn check_book_form(&self, form: &BookForm) -> AppResult<()> {
        let mut errors = validate_fields(form);

        match self.store.get_author(form.author).await {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => errors.add(
                "author",
                field_error("invalid_choice", "Select a valid author."),
            ),
            Err(e) => return Err(e),
        }

        let known: BTreeSet<i32> = self
            .store
            .list_genres()
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();
        if let Some(unknown) = form.genre.iter().find(|id| !known.contains(id)) {
            errors.add(
                "genre",
                field_error(
                    "invalid_choice",
                    format!("Select a valid genre. {} is not one of the available choices.", unknown),
                ),
            );
        }

        into_result(errors)
    }

    pub async fn create_book(&self, form: &BookForm) -> AppResult<Book> {
        self.check_book_form(form).await?;
        let book = self.store.create_book(form).await?;
        tracing::info!("Created book id={} ({})", book.id, book);
        Ok(book)
    }

    pub async fn update_book(&self, id: i32, form: &BookForm) -> AppResult<Book> {
        self.store.get_book(id).await?;
        self.check_book_form(form).await?;
        let book = self.store.update_book(id, form).await?;
        tracing::info!("Updated book id={}", id);
        Ok(book)
    }

    /// Delete a book together with its copies
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.store.delete_book(id).await?;
        tracing::info!("Deleted book id={}", id);
        Ok(())
    }
}

/// Genres of a book, in name order
fn genres_of(book: &Book, genres: &[Genre]) -> Vec<Genre> {
    genres
        .iter()
        .filter(|g| book.genre_ids.contains(&g.id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{seed_author, seed_book, seed_copy, seed_user, Fixture};

    fn service(fixture: &Fixture) -> CatalogService {
        CatalogService::new(fixture.store.clone(), CatalogConfig::default())
    }

    #[tokio::test]
    async fn test_index_counts_only_available_copies() {
        let fixture = Fixture::new();
        let author = seed_author(&fixture, "Asimov").await;
        let book = seed_book(&fixture, "A Tale of Stars", author.id).await;
        seed_book(&fixture, "Foundation", author.id).await;
        let patron = seed_user(&fixture, "patron", vec![]).await;

        seed_copy(&fixture, book.id, LoanStatus::Available, None, None).await;
        seed_copy(&fixture, book.id, LoanStatus::Available, None, None).await;
        seed_copy(&fixture, book.id, LoanStatus::Maintenance, None, None).await;
        seed_copy(&fixture, book.id, LoanStatus::Reserved, None, None).await;
        seed_copy(
            &fixture,
            book.id,
            LoanStatus::OnLoan,
            Some(patron.id),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1),
        )
        .await;

        let counts = service(&fixture).index_counts().await.unwrap();
        assert_eq!(
            counts,
            IndexCounts {
                num_books: 2,
                num_instances: 5,
                num_instances_available: 2,
                num_authors: 1,
                num_books_with_title: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_title_search_ignores_case() {
        let fixture = Fixture::new();
        let author = seed_author(&fixture, "Asimov").await;
        seed_book(&fixture, "A Tale of Stars", author.id).await;
        seed_book(&fixture, "Starling", author.id).await;
        seed_book(&fixture, "Dune", author.id).await;

        let catalog = service(&fixture);
        assert_eq!(catalog.count_books_with_title("stars").await.unwrap(), 1);
        assert_eq!(catalog.count_books_with_title("STARS").await.unwrap(), 1);
        assert_eq!(catalog.count_books_with_title("star").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_books_paginate_by_five() {
        let fixture = Fixture::new();
        let author = seed_author(&fixture, "Christie").await;
        for n in 0..7 {
            seed_book(&fixture, &format!("Mystery {}", n), author.id).await;
        }

        let catalog = service(&fixture);
        let first = catalog.list_books(PageQuery { page: None }).await.unwrap();
        assert_eq!(first.items.len(), 5);
        assert_eq!(first.num_pages, 2);
        assert!(first.has_next);
        assert_eq!(first.items[0].author.as_ref().unwrap().last_name, "Christie");

        let second = catalog.list_books(PageQuery { page: Some(2) }).await.unwrap();
        assert_eq!(second.items.len(), 2);

        assert!(matches!(
            catalog.list_books(PageQuery { page: Some(3) }).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_detail_of_unknown_ids_is_not_found() {
        let fixture = Fixture::new();
        let catalog = service(&fixture);
        assert!(matches!(catalog.book_detail(99).await, Err(AppError::NotFound(_))));
        assert!(matches!(catalog.author_detail(99).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_book_detail_includes_copies_and_genres() {
        let fixture = Fixture::new();
        let catalog = service(&fixture);
        let scifi = catalog
            .create_genre(&GenreForm { name: "Science Fiction".to_string() })
            .await
            .unwrap();
        catalog
            .create_genre(&GenreForm { name: "Romance".to_string() })
            .await
            .unwrap();
        let author = seed_author(&fixture, "Le Guin").await;
        let book = catalog
            .create_book(&BookForm {
                title: "The Dispossessed".to_string(),
                author: author.id,
                summary: "Anarres.".to_string(),
                isbn: "9780061054884".to_string(),
                genre: vec![scifi.id],
            })
            .await
            .unwrap();
        seed_copy(&fixture, book.id, LoanStatus::Available, None, None).await;

        let detail = service(&fixture).book_detail(book.id).await.unwrap();
        assert_eq!(detail.author.id, author.id);
        assert_eq!(detail.genres, vec![scifi]);
        assert_eq!(detail.instances.len(), 1);
    }

    #[tokio::test]
    async fn test_create_book_rejects_unknown_references() {
        let fixture = Fixture::new();
        let result = service(&fixture)
            .create_book(&BookForm {
                title: "Orphan".to_string(),
                author: 42,
                summary: "No author.".to_string(),
                isbn: "123".to_string(),
                genre: vec![7],
            })
            .await;

        match result {
            Err(AppError::InvalidForm(errors)) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("author"));
                assert!(fields.contains_key("genre"));
                assert!(fields.contains_key("isbn"));
            }
            other => panic!("expected invalid form, got {:?}", other),
        }
        assert_eq!(fixture.store.count_books().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_genre_maintenance() {
        let fixture = Fixture::new();
        let catalog = service(&fixture);

        let empty = catalog.create_genre(&GenreForm { name: String::new() }).await;
        match empty {
            Err(AppError::InvalidForm(errors)) => {
                assert!(errors.field_errors().contains_key("name"));
            }
            other => panic!("expected invalid form, got {:?}", other),
        }

        let horror = catalog
            .create_genre(&GenreForm { name: "Horror".to_string() })
            .await
            .unwrap();
        assert!(matches!(
            catalog.create_genre(&GenreForm { name: "Horror".to_string() }).await,
            Err(AppError::Conflict(_))
        ));

        let renamed = catalog
            .update_genre(horror.id, &GenreForm { name: "Gothic Horror".to_string() })
            .await
            .unwrap();
        assert_eq!(renamed.name, "Gothic Horror");
        assert!(matches!(
            catalog.update_genre(99, &GenreForm { name: "Western".to_string() }).await,
            Err(AppError::NotFound(_))
        ));

        catalog.delete_genre(horror.id).await.unwrap();
        assert!(catalog.list_genres().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_author_keeps_record_on_invalid_form() {
        let fixture = Fixture::new();
        let author = seed_author(&fixture, "Woolf").await;
        let mut form = AuthorForm::from(&author);
        form.last_name = String::new();

        let catalog = service(&fixture);
        assert!(matches!(
            catalog.update_author(author.id, &form).await,
            Err(AppError::InvalidForm(_))
        ));
        assert_eq!(catalog.get_author(author.id).await.unwrap().last_name, "Woolf");
    }

    #[tokio::test]
    async fn test_author_detail_lists_books() {
        let fixture = Fixture::new();
        let author = seed_author(&fixture, "Tolkien").await;
        seed_book(&fixture, "The Hobbit", author.id).await;
        seed_book(&fixture, "Silmarillion", author.id).await;

        let detail = service(&fixture).author_detail(author.id).await.unwrap();
        let titles: Vec<&str> = detail.books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Silmarillion", "The Hobbit"]);
    }
}
