//! Borrowed-book queries and copy administration

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book_instance::{BookInstance, BookInstanceFilter, BookInstanceForm, BorrowedCopy, LoanEntry},
        pagination::{Page, PageQuery, PageWindow},
        user::{Permission, UserClaims},
    },
    repository::CatalogStore,
};

fn loan_entry(copy: BorrowedCopy, today: NaiveDate) -> LoanEntry {
    LoanEntry {
        is_overdue: copy.instance.is_overdue(today),
        instance: copy.instance,
        book_title: copy.book_title,
    }
}

#[derive(Clone)]
pub struct LoansService {
    store: Arc<dyn CatalogStore>,
    page_size: i64,
}

impl LoansService {
    pub fn new(store: Arc<dyn CatalogStore>, page_size: i64) -> Self {
        Self { store, page_size }
    }

    /// Copies on loan to one borrower, due soonest first
    pub async fn loans_for_borrower(
        &self,
        borrower_id: i32,
        query: PageQuery,
        today: NaiveDate,
    ) -> AppResult<Page<LoanEntry>> {
        let total = self.store.count_on_loan_for_borrower(borrower_id).await?;
        let window = PageWindow::resolve(query.page, self.page_size, total)?;
        let copies = self
            .store
            .on_loan_for_borrower(borrower_id, window.limit(), window.offset())
            .await?;

        Ok(Page::new(copies, window).map(|copy| loan_entry(copy, today)))
    }

    /// Every copy currently on loan, due soonest first
    pub async fn all_borrowed(&self, today: NaiveDate) -> AppResult<Vec<LoanEntry>> {
        let copies = self.store.all_on_loan().await?;
        Ok(copies.into_iter().map(|copy| loan_entry(copy, today)).collect())
    }

    pub async fn list_instances(&self, filter: &BookInstanceFilter) -> AppResult<Vec<BookInstance>> {
        self.store.list_instances(filter).await
    }

    pub async fn get_instance(&self, id: Uuid) -> AppResult<BookInstance> {
        self.store.get_instance(id).await
    }

    async fn check_form(&self, form: &BookInstanceForm) -> AppResult<()> {
        form.check()?;
        if let Some(borrower) = form.borrower {
            match self.store.get_user(borrower).await {
                Ok(_) => {}
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::Validation(format!(
                        "Borrower {} does not exist",
                        borrower
                    )))
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Add a copy of a book
    pub async fn create_instance(
        &self,
        actor: &UserClaims,
        book_id: i32,
        form: &BookInstanceForm,
    ) -> AppResult<BookInstance> {
        actor.require(Permission::CanMarkReturned)?;
        self.store.get_book(book_id).await?;
        self.check_form(form).await?;

        let instance = self.store.create_instance(book_id, form).await?;
        tracing::info!(
            "Created book instance {} for book {} by {}",
            instance.id,
            book_id,
            actor.sub
        );
        Ok(instance)
    }

    /// Replace a copy's imprint, status, due-back date and borrower
    pub async fn update_instance(
        &self,
        actor: &UserClaims,
        id: Uuid,
        form: &BookInstanceForm,
    ) -> AppResult<BookInstance> {
        actor.require(Permission::CanMarkReturned)?;
        let previous = self.store.get_instance(id).await?;
        self.check_form(form).await?;

        let instance = self.store.update_instance(id, form).await?;
        tracing::info!(
            "Updated book instance {} by {}: status {} -> {}",
            id,
            actor.sub,
            previous.status.code(),
            instance.status.code()
        );
        Ok(instance)
    }
}
