//! Business logic services

pub mod auth;
pub mod catalog;
pub mod loans;
pub mod renewal;
pub mod sessions;

use std::sync::Arc;

use crate::{config::AppConfig, repository::CatalogStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub renewal: renewal::RenewalService,
    pub sessions: sessions::SessionService,
    store: Arc<dyn CatalogStore>,
}

impl Services {
    /// Create all services over the given catalog store and session backend
    pub fn new(
        store: Arc<dyn CatalogStore>,
        session_store: Arc<dyn sessions::SessionStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            auth: auth::AuthService::new(store.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(store.clone(), config.catalog.clone()),
            loans: loans::LoansService::new(store.clone(), config.catalog.loans_page_size),
            renewal: renewal::RenewalService::new(
                store.clone(),
                renewal::RenewalPolicy::from(&config.renewal),
            ),
            sessions: sessions::SessionService::new(session_store),
            store,
        }
    }

    /// Readiness probe against the catalog store
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Seeding helpers shared by the service tests

    use std::sync::Arc;

    use chrono::NaiveDate;

    use crate::{
        models::{
            author::{Author, AuthorForm},
            book::{Book, BookForm},
            book_instance::{BookInstance, BookInstanceForm, LoanStatus},
            user::{NewUser, Permission, User},
        },
        repository::{memory::MemoryStore, CatalogStore},
    };

    pub struct Fixture {
        pub store: Arc<MemoryStore>,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self {
                store: Arc::new(MemoryStore::new()),
            }
        }
    }

    pub async fn seed_author(fixture: &Fixture, last_name: &str) -> Author {
        fixture
            .store
            .create_author(&AuthorForm {
                first_name: "Test".to_string(),
                last_name: last_name.to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1950, 1, 1).unwrap(),
                date_of_death: None,
            })
            .await
            .unwrap()
    }

    pub async fn seed_book(fixture: &Fixture, title: &str, author_id: i32) -> Book {
        fixture
            .store
            .create_book(&BookForm {
                title: title.to_string(),
                author: author_id,
                summary: "A summary.".to_string(),
                isbn: "9780000000000".to_string(),
                genre: vec![],
            })
            .await
            .unwrap()
    }

    pub async fn seed_copy(
        fixture: &Fixture,
        book_id: i32,
        status: LoanStatus,
        borrower: Option<i32>,
        due_back: Option<NaiveDate>,
    ) -> BookInstance {
        fixture
            .store
            .create_instance(
                book_id,
                &BookInstanceForm {
                    imprint: "First edition".to_string(),
                    status,
                    due_back,
                    borrower,
                },
            )
            .await
            .unwrap()
    }

    pub async fn seed_user(fixture: &Fixture, username: &str, permissions: Vec<Permission>) -> User {
        fixture
            .store
            .create_user(&NewUser {
                username: username.to_string(),
                password_hash: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                permissions,
            })
            .await
            .unwrap()
    }
}
