//! Author pages and forms

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde_json::json;
use validator::ValidationErrors;

use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorForm, AuthorFormInitial},
        form::DecodeForm,
        pagination::PageQuery,
    },
    AppState,
};

use super::{
    routes::Route,
    views::{form_view, linked, list_context, split_invalid, View},
    RequestContext,
};

const LIST_TEMPLATE: &str = "authors/author_list.html";
const DETAIL_TEMPLATE: &str = "authors/author_detail.html";
const FORM_TEMPLATE: &str = "authors/author_form.html";
const CONFIRM_DELETE_TEMPLATE: &str = "authors/author_confirm_delete.html";

fn author_form(
    values: &impl serde::Serialize,
    object: Option<&Author>,
    errors: Option<&ValidationErrors>,
) -> View {
    form_view(
        FORM_TEMPLATE,
        AuthorForm::FIELDS,
        values,
        errors,
        json!({ "object": object }),
    )
}

/// Paginated author list
#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    params(PageQuery),
    responses(
        (status = 200, description = "authors/author_list.html view", body = View),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<View> {
    let page = state.services.catalog.list_authors(query).await?;
    let context = list_context("author_list", page, |author| {
        linked(author, Route::AuthorDetail(author.id))
    });
    Ok(View::new(LIST_TEMPLATE, context))
}

/// Author with their books
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "authors",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "authors/author_detail.html view", body = View),
        (status = 404, description = "Author not found")
    )
)]
pub async fn author_detail(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<View> {
    let detail = state.services.catalog.author_detail(id).await?;

    Ok(View::new(
        DETAIL_TEMPLATE,
        json!({
            "author": detail.author,
            "books": detail
                .books
                .iter()
                .map(|book| linked(book, Route::BookDetail(book.id)))
                .collect::<Vec<_>>(),
        }),
    ))
}

/// Empty creation form with suggested initial values
#[utoipa::path(
    get,
    path = "/authors/create",
    tag = "authors",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "authors/author_form.html view", body = View),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_form(ctx: RequestContext) -> AppResult<View> {
    ctx.require_login()?;
    Ok(author_form(&AuthorFormInitial::default(), None, None))
}

/// Create an author and redirect to them
#[utoipa::path(
    post,
    path = "/authors/create",
    tag = "authors",
    security(("bearer_auth" = [])),
    request_body = AuthorForm,
    responses(
        (status = 303, description = "Created; redirect to the author"),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Form re-presented with errors", body = View)
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> AppResult<Response> {
    ctx.require_login()?;
    let form = match AuthorForm::decode(&body) {
        Ok(form) => form,
        Err(rejected) => {
            return Ok(author_form(&rejected.values, None, Some(&rejected.errors)).into_response())
        }
    };

    match split_invalid(state.services.catalog.create_author(&form).await)? {
        Ok(author) => Ok(Route::AuthorDetail(author.id).redirect().into_response()),
        Err(errors) => Ok(author_form(&form, None, Some(&errors)).into_response()),
    }
}

/// Update form with the current values
#[utoipa::path(
    get,
    path = "/authors/{id}/update",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "authors/author_form.html view", body = View),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_form(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<View> {
    ctx.require_login()?;
    let author = state.services.catalog.get_author(id).await?;
    Ok(author_form(&AuthorForm::from(&author), Some(&author), None))
}

/// Update an author and redirect to them
#[utoipa::path(
    post,
    path = "/authors/{id}/update",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    request_body = AuthorForm,
    responses(
        (status = 303, description = "Updated; redirect to the author"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Author not found"),
        (status = 422, description = "Form re-presented with errors", body = View)
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
    body: Bytes,
) -> AppResult<Response> {
    ctx.require_login()?;
    let form = match AuthorForm::decode(&body) {
        Ok(form) => form,
        Err(rejected) => {
            let author = state.services.catalog.get_author(id).await?;
            return Ok(
                author_form(&rejected.values, Some(&author), Some(&rejected.errors))
                    .into_response(),
            );
        }
    };

    match split_invalid(state.services.catalog.update_author(id, &form).await)? {
        Ok(author) => Ok(Route::AuthorDetail(author.id).redirect().into_response()),
        Err(errors) => {
            let author = state.services.catalog.get_author(id).await?;
            Ok(author_form(&form, Some(&author), Some(&errors)).into_response())
        }
    }
}

/// Deletion confirmation
#[utoipa::path(
    get,
    path = "/authors/{id}/delete",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "authors/author_confirm_delete.html view", body = View),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<View> {
    ctx.require_login()?;
    let author = state.services.catalog.get_author(id).await?;
    Ok(View::new(CONFIRM_DELETE_TEMPLATE, json!({ "author": author })))
}

/// Delete an author without books and redirect to the author list
#[utoipa::path(
    post,
    path = "/authors/{id}/delete",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 303, description = "Deleted; redirect to the author list"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Author not found"),
        (status = 409, description = "Author still has books", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_author(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    ctx.require_login()?;
    state.services.catalog.delete_author(id).await?;
    Ok(Route::Authors.redirect().into_response())
}
