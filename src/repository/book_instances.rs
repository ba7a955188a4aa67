//! Book instances repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book_instance::{
        BookInstance, BookInstanceFilter, BookInstanceForm, BorrowedCopy, LoanStatus,
    },
};

const INSTANCE_COLUMNS: &str = "bi.id, bi.book_id, bi.imprint, bi.due_back, bi.status, bi.borrower_id";

#[derive(Clone)]
pub struct BookInstancesRepository {
    pool: Pool<Postgres>,
}

impl BookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_with_status(&self, status: LoanStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Get instance by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        let query = format!("SELECT {} FROM book_instances bi WHERE bi.id = $1", INSTANCE_COLUMNS);
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    pub async fn for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let query = format!(
            "SELECT {} FROM book_instances bi WHERE bi.book_id = $1 ORDER BY bi.due_back NULLS LAST, bi.id",
            INSTANCE_COLUMNS
        );
        let instances = sqlx::query_as::<_, BookInstance>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(instances)
    }

    /// List instances, optionally filtered by status and due-back date
    pub async fn list(&self, filter: &BookInstanceFilter) -> AppResult<Vec<BookInstance>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if filter.status.is_some() {
            conditions.push(format!("bi.status = ${}", idx));
            idx += 1;
        }
        if filter.due_back.is_some() {
            conditions.push(format!("bi.due_back = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {} FROM book_instances bi {} ORDER BY bi.due_back NULLS LAST, bi.id",
            INSTANCE_COLUMNS, where_clause
        );

        let mut builder = sqlx::query_as::<_, BookInstance>(&query);
        if let Some(status) = filter.status {
            builder = builder.bind(status);
        }
        if let Some(due_back) = filter.due_back {
            builder = builder.bind(due_back);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn count_on_loan_for_borrower(&self, borrower_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_instances WHERE borrower_id = $1 AND status = $2",
        )
        .bind(borrower_id)
        .bind(LoanStatus::OnLoan)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// On-loan copies of one borrower, due soonest first
    pub async fn on_loan_for_borrower(
        &self,
        borrower_id: i32,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BorrowedCopy>> {
        let query = format!(
            r#"
            SELECT {}, b.title AS book_title
            FROM book_instances bi
            JOIN books b ON b.id = bi.book_id
            WHERE bi.borrower_id = $1 AND bi.status = $2
            ORDER BY bi.due_back
            LIMIT $3 OFFSET $4
            "#,
            INSTANCE_COLUMNS
        );
        let rows = sqlx::query_as::<_, BorrowedCopy>(&query)
            .bind(borrower_id)
            .bind(LoanStatus::OnLoan)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Every on-loan copy, due soonest first
    pub async fn all_on_loan(&self) -> AppResult<Vec<BorrowedCopy>> {
        let query = format!(
            r#"
            SELECT {}, b.title AS book_title
            FROM book_instances bi
            JOIN books b ON b.id = bi.book_id
            WHERE bi.status = $1
            ORDER BY bi.due_back
            "#,
            INSTANCE_COLUMNS
        );
        let rows = sqlx::query_as::<_, BorrowedCopy>(&query)
            .bind(LoanStatus::OnLoan)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn create(&self, book_id: i32, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let query = format!(
            r#"
            INSERT INTO book_instances AS bi (id, book_id, imprint, due_back, status, borrower_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        );
        let instance = sqlx::query_as::<_, BookInstance>(&query)
            .bind(Uuid::new_v4())
            .bind(book_id)
            .bind(&form.imprint)
            .bind(form.due_back)
            .bind(form.status)
            .bind(form.borrower)
            .fetch_one(&self.pool)
            .await?;
        Ok(instance)
    }

    pub async fn update(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let query = format!(
            r#"
            UPDATE book_instances AS bi SET
                imprint = $1,
                due_back = $2,
                status = $3,
                borrower_id = $4
            WHERE bi.id = $5
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        );
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(&form.imprint)
            .bind(form.due_back)
            .bind(form.status)
            .bind(form.borrower)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    /// Set the due-back date of one copy
    pub async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        let query = format!(
            "UPDATE book_instances AS bi SET due_back = $1 WHERE bi.id = $2 RETURNING {}",
            INSTANCE_COLUMNS
        );
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(due_back)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }
}
