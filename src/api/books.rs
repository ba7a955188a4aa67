//! Book pages and forms

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};
use validator::ValidationErrors;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookForm},
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

const LIST_TEMPLATE: &str = "books/book_list.html";
const DETAIL_TEMPLATE: &str = "books/book_detail.html";
const FORM_TEMPLATE: &str = "books/book_form.html";
const CONFIRM_DELETE_TEMPLATE: &str = "books/book_confirm_delete.html";

/// Book form with author and genre choices
async fn book_form(
    state: &AppState,
    values: &impl serde::Serialize,
    object: Option<&Book>,
    errors: Option<&ValidationErrors>,
) -> AppResult<View> {
    let authors: Vec<Value> = state
        .services
        .catalog
        .all_authors()
        .await?
        .into_iter()
        .map(|a| json!({ "id": a.id, "name": a.to_string() }))
        .collect();
    let genres = state.services.catalog.list_genres().await?;

    Ok(form_view(
        FORM_TEMPLATE,
        BookForm::FIELDS,
        values,
        errors,
        json!({ "object": object, "authors": authors, "genres": genres }),
    ))
}

/// Paginated book list
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(PageQuery),
    responses(
        (status = 200, description = "books/book_list.html view", body = View),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<View> {
    let page = state.services.catalog.list_books(query).await?;
    let context = list_context("book_list", page, |book| {
        linked(book, Route::BookDetail(book.id))
    });
    Ok(View::new(LIST_TEMPLATE, context))
}

/// Book with author, genres and copies
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "books/book_detail.html view", body = View),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_detail(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<View> {
    let detail = state.services.catalog.book_detail(id).await?;

    Ok(View::new(
        DETAIL_TEMPLATE,
        json!({
            "book": detail.book,
            "author": linked(&detail.author, Route::AuthorDetail(detail.author.id)),
            "genres": detail.genres,
            "instances": detail
                .instances
                .iter()
                .map(|copy| json!({
                    "instance": copy,
                    "status_display": copy.status.label(),
                }))
                .collect::<Vec<_>>(),
        }),
    ))
}

/// Empty creation form
#[utoipa::path(
    get,
    path = "/books/create",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "books/book_form.html view", body = View),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_form(State(state): State<AppState>, ctx: RequestContext) -> AppResult<View> {
    ctx.require_login()?;
    book_form(&state, &json!({}), None, None).await
}

/// Create a book and redirect to it
#[utoipa::path(
    post,
    path = "/books/create",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookForm,
    responses(
        (status = 303, description = "Created; redirect to the book"),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Form re-presented with errors", body = View)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> AppResult<Response> {
    ctx.require_login()?;
    let form = match BookForm::decode(&body) {
        Ok(form) => form,
        Err(rejected) => {
            return Ok(book_form(&state, &rejected.values, None, Some(&rejected.errors))
                .await?
                .into_response())
        }
    };

    match split_invalid(state.services.catalog.create_book(&form).await)? {
        Ok(book) => Ok(Route::BookDetail(book.id).redirect().into_response()),
        Err(errors) => Ok(book_form(&state, &form, None, Some(&errors))
            .await?
            .into_response()),
    }
}

/// Update form with the current values
#[utoipa::path(
    get,
    path = "/books/{id}/update",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "books/book_form.html view", body = View),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_form(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<View> {
    ctx.require_login()?;
    let book = state.services.catalog.get_book(id).await?;
    book_form(&state, &BookForm::from(&book), Some(&book), None).await
}

/// Update a book and redirect to it
#[utoipa::path(
    post,
    path = "/books/{id}/update",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookForm,
    responses(
        (status = 303, description = "Updated; redirect to the book"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Form re-presented with errors", body = View)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
    body: Bytes,
) -> AppResult<Response> {
    ctx.require_login()?;
    let form = match BookForm::decode(&body) {
        Ok(form) => form,
        Err(rejected) => {
            let book = state.services.catalog.get_book(id).await?;
            return Ok(
                book_form(&state, &rejected.values, Some(&book), Some(&rejected.errors))
                    .await?
                    .into_response(),
            );
        }
    };

    match split_invalid(state.services.catalog.update_book(id, &form).await)? {
        Ok(book) => Ok(Route::BookDetail(book.id).redirect().into_response()),
        Err(errors) => {
            let book = state.services.catalog.get_book(id).await?;
            Ok(book_form(&state, &form, Some(&book), Some(&errors))
                .await?
                .into_response())
        }
    }
}

/// Deletion confirmation
#[utoipa::path(
    get,
    path = "/books/{id}/delete",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "books/book_confirm_delete.html view", body = View),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<View> {
    ctx.require_login()?;
    let book = state.services.catalog.get_book(id).await?;
    Ok(View::new(CONFIRM_DELETE_TEMPLATE, json!({ "book": book })))
}

/// Delete a book with its copies and redirect to the home page
#[utoipa::path(
    post,
    path = "/books/{id}/delete",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 303, description = "Deleted; redirect to the index"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    ctx.require_login()?;
    state.services.catalog.delete_book(id).await?;
    Ok(Route::Index.redirect().into_response())
}
