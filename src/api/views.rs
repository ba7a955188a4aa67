//! Template views returned by page handlers
//!
//! A page handler answers with the template it would render and the context
//! it would render it with. Forms share one context layout:
//! `{ form, fields, errors }`, plus whatever choices the template needs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;
use validator::ValidationErrors;

use super::routes::Route;
use crate::{
    error::{field_errors, AppError, AppResult, FieldErrors},
    models::pagination::Page,
};

/// Template id plus rendering context
#[derive(Debug, Serialize, ToSchema)]
pub struct View {
    pub template: &'static str,
    #[schema(value_type = Object)]
    pub context: Value,
    #[serde(skip)]
    status: StatusCode,
}

impl View {
    pub fn new(template: &'static str, context: Value) -> Self {
        Self {
            template,
            context,
            status: StatusCode::OK,
        }
    }

    /// Same view answered with 422, for forms re-presented with errors
    pub fn unprocessable(mut self) -> Self {
        self.status = StatusCode::UNPROCESSABLE_ENTITY;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Form view context: submitted or initial values, the editable field list,
/// per-field errors and template-specific extras merged at the top level
pub fn form_view<F: Serialize>(
    template: &'static str,
    fields: &[&str],
    values: &F,
    errors: Option<&ValidationErrors>,
    extra: Value,
) -> View {
    let mut context = Map::new();
    context.insert("form".to_string(), json!(values));
    context.insert("fields".to_string(), json!(fields));
    context.insert(
        "errors".to_string(),
        json!(errors.map(field_errors).unwrap_or_else(FieldErrors::new)),
    );
    if let Value::Object(extra) = extra {
        context.extend(extra);
    }

    let view = View::new(template, Value::Object(context));
    match errors {
        Some(_) => view.unprocessable(),
        None => view,
    }
}

/// Serialize a record with the path of its page under `url`
pub fn linked<T: Serialize>(item: &T, route: Route) -> Value {
    let mut value = json!(item);
    if let Value::Object(map) = &mut value {
        map.insert("url".to_string(), json!(route.path()));
    }
    value
}

/// Context of a paginated list template
pub fn list_context<T>(key: &str, page: Page<T>, item: impl Fn(&T) -> Value) -> Value {
    let mut context = Map::new();
    context.insert(
        key.to_string(),
        Value::Array(page.items.iter().map(item).collect()),
    );
    context.insert("is_paginated".to_string(), json!(page.num_pages > 1));
    context.insert(
        "page_obj".to_string(),
        json!({
            "number": page.page,
            "num_pages": page.num_pages,
            "per_page": page.per_page,
            "count": page.total,
            "has_previous": page.has_previous,
            "has_next": page.has_next,
        }),
    );
    Value::Object(context)
}

/// Separate form rejections from other failures so the caller can re-present
/// the form
pub fn split_invalid<T>(result: AppResult<T>) -> AppResult<Result<T, ValidationErrors>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(AppError::InvalidForm(errors)) => Ok(Err(errors)),
        Err(e) => Err(e),
    }
}
