//! Page-number pagination

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// `?page=N` query parameter (1-based)
#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// Resolved slice of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub num_pages: i64,
    pub total: i64,
}

impl PageWindow {
    /// Page 1 always exists, even for an empty list; any other page
    /// outside `1..=num_pages` is not found.
    pub fn resolve(requested: Option<i64>, per_page: i64, total: i64) -> AppResult<Self> {
        let per_page = per_page.max(1);
        let page = requested.unwrap_or(1);
        let num_pages = ((total + per_page - 1) / per_page).max(1);

        if page < 1 || page > num_pages {
            return Err(AppError::NotFound(format!("Invalid page ({})", page)));
        }

        Ok(Self {
            page,
            per_page,
            num_pages,
            total,
        })
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

/// Paginated list
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub num_pages: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            total: window.total,
            page: window.page,
            per_page: window.per_page,
            num_pages: window.num_pages,
            has_previous: window.page > 1,
            has_next: window.page < window.num_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            num_pages: self.num_pages,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_windows() {
        let w = PageWindow::resolve(None, 5, 12).unwrap();
        assert_eq!((w.page, w.num_pages, w.offset(), w.limit()), (1, 3, 0, 5));

        let w = PageWindow::resolve(Some(3), 5, 12).unwrap();
        assert_eq!(w.offset(), 10);
    }

    #[test]
    fn test_empty_list_has_first_page() {
        let w = PageWindow::resolve(Some(1), 5, 0).unwrap();
        assert_eq!(w.num_pages, 1);
        let page = Page::<i32>::new(vec![], w);
        assert!(!page.has_next && !page.has_previous);
    }

    #[test]
    fn test_out_of_range_is_not_found() {
        assert!(matches!(PageWindow::resolve(Some(4), 5, 12), Err(AppError::NotFound(_))));
        assert!(matches!(PageWindow::resolve(Some(0), 5, 12), Err(AppError::NotFound(_))));
        assert!(matches!(PageWindow::resolve(Some(2), 5, 0), Err(AppError::NotFound(_))));
    }
}
