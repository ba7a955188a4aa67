//! Loan lists, renewal and copy administration

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book_instance::{BookInstance, BookInstanceFilter, BookInstanceForm, LoanEntry},
        form::DecodeForm,
        pagination::PageQuery,
        user::Permission,
    },
    services::renewal::{RenewalForm, RenewalOutcome},
    AppState,
};

use super::{
    routes::Route,
    today,
    views::{form_view, linked, list_context, View},
    RequestContext,
};

const MY_BORROWED_TEMPLATE: &str =
    "catalog/library_worker_templates/bookinstance_list_borrowed_user.html";
const ALL_BORROWED_TEMPLATE: &str = "catalog/library_worker_templates/all_borrowed_books.html";
const RENEW_TEMPLATE: &str = "catalog/library_worker_templates/book_renew_librarian.html";
const ADMIN_LIST_TEMPLATE: &str = "catalog/bookinstance_list.html";

/// Copies on loan to the current user
#[utoipa::path(
    get,
    path = "/mybooks",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "bookinstance_list_borrowed_user.html view", body = View),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_borrowed(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<PageQuery>,
) -> AppResult<View> {
    let actor = ctx.require_login()?;
    let page = state
        .services
        .loans
        .loans_for_borrower(actor.user_id, query, today())
        .await?;

    let context = list_context("bookinstance_list", page, |entry| json!(entry));
    Ok(View::new(MY_BORROWED_TEMPLATE, context))
}

/// Every copy on loan, with renewal links
#[utoipa::path(
    get,
    path = "/borrowed",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "all_borrowed_books.html view", body = View),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn all_borrowed(State(state): State<AppState>, ctx: RequestContext) -> AppResult<View> {
    ctx.require_login()?;
    let entries = state.services.loans.all_borrowed(today()).await?;

    Ok(View::new(
        ALL_BORROWED_TEMPLATE,
        json!({
            "bookinstance_list": entries
                .iter()
                .map(|entry: &LoanEntry| {
                    let mut value = json!(entry);
                    value["renew_url"] = json!(Route::RenewBookLibrarian(entry.instance.id).path());
                    value
                })
                .collect::<Vec<_>>(),
        }),
    ))
}

fn renewal_response(outcome: RenewalOutcome) -> Response {
    match outcome {
        RenewalOutcome::Unsubmitted { instance, proposed } => form_view(
            RENEW_TEMPLATE,
            RenewalForm::FIELDS,
            &RenewalForm {
                renewal_date: Some(proposed),
            },
            None,
            json!({ "book_instance": instance }),
        )
        .into_response(),
        RenewalOutcome::Invalid {
            instance,
            submitted,
            errors,
        } => form_view(
            RENEW_TEMPLATE,
            RenewalForm::FIELDS,
            &submitted,
            Some(&errors),
            json!({ "book_instance": instance }),
        )
        .into_response(),
        RenewalOutcome::Applied { .. } => Route::AllBorrowed.redirect().into_response(),
    }
}

/// Renewal form with the proposed date
#[utoipa::path(
    get,
    path = "/bookinstances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 200, description = "book_renew_librarian.html view", body = View),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing can_mark_returned"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renew_form(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let actor = ctx.require_login()?;
    let outcome = state
        .services
        .renewal
        .renew(actor, id, None, today())
        .await?;
    Ok(renewal_response(outcome))
}

/// Apply a renewal and redirect to the borrowed list
#[utoipa::path(
    post,
    path = "/bookinstances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body = RenewalForm,
    responses(
        (status = 303, description = "Renewed; redirect to all borrowed books"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing can_mark_returned"),
        (status = 404, description = "Book instance not found"),
        (status = 422, description = "Form re-presented with errors", body = View)
    )
)]
pub async fn renew_submit(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Response> {
    let actor = ctx.require_login()?;
    actor.require(Permission::CanMarkReturned)?;
    let outcome = state
        .services
        .renewal
        .renew(actor, id, Some(RenewalForm::decode(&body)), today())
        .await?;
    Ok(renewal_response(outcome))
}

/// Administrative list of copies
#[utoipa::path(
    get,
    path = "/bookinstances",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(BookInstanceFilter),
    responses(
        (status = 200, description = "catalog/bookinstance_list.html view", body = View),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing can_mark_returned")
    )
)]
pub async fn list_instances(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(filter): Query<BookInstanceFilter>,
) -> AppResult<View> {
    ctx.require_login()?.require(Permission::CanMarkReturned)?;
    let instances = state.services.loans.list_instances(&filter).await?;

    Ok(View::new(
        ADMIN_LIST_TEMPLATE,
        json!({
            "bookinstance_list": instances
                .iter()
                .map(|copy| linked(copy, Route::BookDetail(copy.book_id)))
                .collect::<Vec<_>>(),
            "filter": { "status": filter.status, "due_back": filter.due_back },
        }),
    ))
}

/// Add a copy of a book
#[utoipa::path(
    post,
    path = "/books/{id}/instances",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookInstanceForm,
    responses(
        (status = 201, description = "Copy created", body = BookInstance),
        (status = 400, description = "Loan state is inconsistent", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing can_mark_returned"),
        (status = 422, description = "Field errors", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_instance(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(book_id): Path<i32>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<BookInstance>)> {
    let actor = ctx.require_login()?;
    actor.require(Permission::CanMarkReturned)?;
    let form = BookInstanceForm::decode(&body)?;
    let instance = state
        .services
        .loans
        .create_instance(actor, book_id, &form)
        .await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

/// Replace a copy's imprint, status, due-back date and borrower
#[utoipa::path(
    put,
    path = "/bookinstances/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body = BookInstanceForm,
    responses(
        (status = 200, description = "Copy updated", body = BookInstance),
        (status = 400, description = "Loan state is inconsistent", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing can_mark_returned"),
        (status = 422, description = "Field errors", body = crate::error::ErrorResponse),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn update_instance(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<BookInstance>> {
    let actor = ctx.require_login()?;
    actor.require(Permission::CanMarkReturned)?;
    let form = BookInstanceForm::decode(&body)?;
    let instance = state.services.loans.update_instance(actor, id, &form).await?;
    Ok(Json(instance))
}
