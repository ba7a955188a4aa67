//! In-memory catalog store
//!
//! Mirrors the PostgreSQL repository's ordering and deletion policy so that
//! services behave the same against both backends.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::CatalogStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorForm},
        book::{Book, BookForm},
        book_instance::{BookInstance, BookInstanceFilter, BookInstanceForm, BorrowedCopy, LoanStatus},
        genre::{Genre, GenreForm},
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct State {
    authors: BTreeMap<i32, Author>,
    genres: BTreeMap<i32, Genre>,
    books: BTreeMap<i32, Book>,
    instances: HashMap<Uuid, BookInstance>,
    users: BTreeMap<i32, User>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn genre_name_taken(&self, name: &str, exclude_id: Option<i32>) -> bool {
        self.genres
            .values()
            .any(|g| g.name == name && Some(g.id) != exclude_id)
    }

    fn borrowed(&self, mut copies: Vec<&BookInstance>) -> Vec<BorrowedCopy> {
        copies.sort_by_key(|i| (i.due_back, i.id));
        copies
            .into_iter()
            .map(|instance| BorrowedCopy {
                instance: instance.clone(),
                book_title: self
                    .books
                    .get(&instance.book_id)
                    .map(|b| b.title.clone())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

fn window<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

fn sorted_authors<'a>(authors: impl Iterator<Item = &'a Author>) -> Vec<Author> {
    let mut authors: Vec<Author> = authors.cloned().collect();
    authors.sort_by(|a, b| {
        (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
    });
    authors
}

fn sorted_books<'a>(books: impl Iterator<Item = &'a Book>) -> Vec<Book> {
    let mut books: Vec<Book> = books.cloned().collect();
    books.sort_by(|a, b| (&a.title, a.id).cmp(&(&b.title, b.id)));
    books
}

fn sorted_instances<'a>(instances: impl Iterator<Item = &'a BookInstance>) -> Vec<BookInstance> {
    let mut instances: Vec<BookInstance> = instances.cloned().collect();
    // NULLS LAST, like the SQL ordering
    instances.sort_by_key(|i| (i.due_back.is_none(), i.due_back, i.id));
    instances
}

/// Catalog store kept entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn count_authors(&self) -> AppResult<i64> {
        Ok(self.state.read().await.authors.len() as i64)
    }

    async fn list_authors(&self, limit: i64, offset: i64) -> AppResult<Vec<Author>> {
        let state = self.state.read().await;
        Ok(window(sorted_authors(state.authors.values()), limit, offset))
    }

    async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.state
            .read()
            .await
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn get_authors(&self, ids: &[i32]) -> AppResult<Vec<Author>> {
        let state = self.state.read().await;
        Ok(sorted_authors(
            state.authors.values().filter(|a| ids.contains(&a.id)),
        ))
    }

    async fn create_author(&self, form: &AuthorForm) -> AppResult<Author> {
        let mut state = self.state.write().await;
        let author = Author {
            id: state.next_id(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            date_of_birth: form.date_of_birth,
            date_of_death: form.date_of_death,
        };
        state.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, id: i32, form: &AuthorForm) -> AppResult<Author> {
        let mut state = self.state.write().await;
        let author = state
            .authors
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))?;
        author.first_name = form.first_name.clone();
        author.last_name = form.last_name.clone();
        author.date_of_birth = form.date_of_birth;
        author.date_of_death = form.date_of_death;
        Ok(author.clone())
    }

    async fn delete_author(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        let books = state.books.values().filter(|b| b.author_id == id).count();
        if books > 0 {
            return Err(AppError::Conflict(format!(
                "Author {} still has {} book(s)",
                id, books
            )));
        }
        state
            .authors
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let state = self.state.read().await;
        let mut genres: Vec<Genre> = state.genres.values().cloned().collect();
        genres.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        Ok(genres)
    }

    async fn get_genre(&self, id: i32) -> AppResult<Genre> {
        self.state
            .read()
            .await
            .genres
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    async fn create_genre(&self, form: &GenreForm) -> AppResult<Genre> {
        let mut state = self.state.write().await;
        if state.genre_name_taken(&form.name, None) {
            return Err(AppError::Conflict(format!("Genre '{}' already exists", form.name)));
        }
        let genre = Genre {
            id: state.next_id(),
            name: form.name.clone(),
        };
        state.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    async fn update_genre(&self, id: i32, form: &GenreForm) -> AppResult<Genre> {
        let mut state = self.state.write().await;
        if state.genre_name_taken(&form.name, Some(id)) {
            return Err(AppError::Conflict(format!("Genre '{}' already exists", form.name)));
        }
        let genre = state
            .genres
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))?;
        genre.name = form.name.clone();
        Ok(genre.clone())
    }

    async fn delete_genre(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .genres
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))?;
        for book in state.books.values_mut() {
            book.genre_ids.retain(|genre_id| *genre_id != id);
        }
        Ok(())
    }

    async fn count_books(&self) -> AppResult<i64> {
        Ok(self.state.read().await.books.len() as i64)
    }

    async fn count_books_with_title(&self, needle: &str) -> AppResult<i64> {
        let needle = needle.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .filter(|b| b.title.to_lowercase().contains(&needle))
            .count() as i64)
    }

    async fn list_books(&self, limit: i64, offset: i64) -> AppResult<Vec<Book>> {
        let state = self.state.read().await;
        Ok(window(sorted_books(state.books.values()), limit, offset))
    }

    async fn books_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let state = self.state.read().await;
        Ok(sorted_books(
            state.books.values().filter(|b| b.author_id == author_id),
        ))
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.state
            .read()
            .await
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn create_book(&self, form: &BookForm) -> AppResult<Book> {
        let mut state = self.state.write().await;
        let mut genre_ids = form.genre.clone();
        genre_ids.sort_unstable();
        genre_ids.dedup();
        let book = Book {
            id: state.next_id(),
            title: form.title.clone(),
            summary: form.summary.clone(),
            isbn: form.isbn.clone(),
            author_id: form.author,
            genre_ids,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: i32, form: &BookForm) -> AppResult<Book> {
        let mut state = self.state.write().await;
        let book = state
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        let mut genre_ids = form.genre.clone();
        genre_ids.sort_unstable();
        genre_ids.dedup();
        book.title = form.title.clone();
        book.summary = form.summary.clone();
        book.isbn = form.isbn.clone();
        book.author_id = form.author;
        book.genre_ids = genre_ids;
        Ok(book.clone())
    }

    async fn delete_book(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .books
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        state.instances.retain(|_, i| i.book_id != id);
        Ok(())
    }

    async fn count_instances(&self) -> AppResult<i64> {
        Ok(self.state.read().await.instances.len() as i64)
    }

    async fn count_instances_with_status(&self, status: LoanStatus) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .instances
            .values()
            .filter(|i| i.status == status)
            .count() as i64)
    }

    async fn get_instance(&self, id: Uuid) -> AppResult<BookInstance> {
        self.state
            .read()
            .await
            .instances
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn instances_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let state = self.state.read().await;
        Ok(sorted_instances(
            state.instances.values().filter(|i| i.book_id == book_id),
        ))
    }

    async fn list_instances(&self, filter: &BookInstanceFilter) -> AppResult<Vec<BookInstance>> {
        let state = self.state.read().await;
        Ok(sorted_instances(state.instances.values().filter(|i| {
            filter.status.map_or(true, |s| i.status == s)
                && filter.due_back.map_or(true, |d| i.due_back == Some(d))
        })))
    }

    async fn count_on_loan_for_borrower(&self, borrower_id: i32) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .instances
            .values()
            .filter(|i| i.status == LoanStatus::OnLoan && i.borrower_id == Some(borrower_id))
            .count() as i64)
    }

    async fn on_loan_for_borrower(
        &self,
        borrower_id: i32,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BorrowedCopy>> {
        let state = self.state.read().await;
        let copies = state
            .instances
            .values()
            .filter(|i| i.status == LoanStatus::OnLoan && i.borrower_id == Some(borrower_id))
            .collect();
        Ok(window(state.borrowed(copies), limit, offset))
    }

    async fn all_on_loan(&self) -> AppResult<Vec<BorrowedCopy>> {
        let state = self.state.read().await;
        let copies = state
            .instances
            .values()
            .filter(|i| i.status == LoanStatus::OnLoan)
            .collect();
        Ok(state.borrowed(copies))
    }

    async fn create_instance(&self, book_id: i32, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&book_id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        let instance = BookInstance {
            id: Uuid::new_v4(),
            book_id,
            imprint: form.imprint.clone(),
            due_back: form.due_back,
            status: form.status,
            borrower_id: form.borrower,
        };
        state.instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    async fn update_instance(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let mut state = self.state.write().await;
        let instance = state
            .instances
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))?;
        instance.imprint = form.imprint.clone();
        instance.due_back = form.due_back;
        instance.status = form.status;
        instance.borrower_id = form.borrower;
        Ok(instance.clone())
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        let mut state = self.state.write().await;
        let instance = state
            .instances
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))?;
        instance.due_back = Some(due_back);
        Ok(instance.clone())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "User '{}' already exists",
                user.username
            )));
        }
        let created = User {
            id: state.next_id(),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            permissions: user.permissions.clone(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }
}
