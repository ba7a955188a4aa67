//! Genre endpoints and maintenance forms

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::ValidationErrors;

use crate::{
    error::AppResult,
    models::{
        form::DecodeForm,
        genre::{Genre, GenreForm},
    },
    AppState,
};

use super::{
    routes::Route,
    views::{form_view, split_invalid, View},
    RequestContext,
};

const DETAIL_TEMPLATE: &str = "catalog/genre_detail.html";
const FORM_TEMPLATE: &str = "catalog/genre_form.html";
const CONFIRM_DELETE_TEMPLATE: &str = "catalog/genre_confirm_delete.html";

fn genre_form(
    values: &impl serde::Serialize,
    object: Option<&Genre>,
    errors: Option<&ValidationErrors>,
) -> View {
    form_view(
        FORM_TEMPLATE,
        GenreForm::FIELDS,
        values,
        errors,
        json!({ "object": object }),
    )
}

/// List genres by name
#[utoipa::path(
    get,
    path = "/genres",
    tag = "catalog",
    responses(
        (status = 200, description = "All genres", body = Vec<Genre>)
    )
)]
pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.services.catalog.list_genres().await?))
}

#[utoipa::path(
    get,
    path = "/genres/{id}",
    tag = "catalog",
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 200, description = "catalog/genre_detail.html view", body = View),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn genre_detail(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<View> {
    let genre = state.services.catalog.get_genre(id).await?;
    Ok(View::new(DETAIL_TEMPLATE, json!({ "genre": genre })))
}

/// Empty creation form
#[utoipa::path(
    get,
    path = "/genres/create",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "catalog/genre_form.html view", body = View),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_form(ctx: RequestContext) -> AppResult<View> {
    ctx.require_login()?;
    Ok(genre_form(&json!({}), None, None))
}

/// Create a genre and redirect to it
#[utoipa::path(
    post,
    path = "/genres/create",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = GenreForm,
    responses(
        (status = 303, description = "Created; redirect to the genre"),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Name already taken", body = crate::error::ErrorResponse),
        (status = 422, description = "Form re-presented with errors", body = View)
    )
)]
pub async fn create_genre(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> AppResult<Response> {
    ctx.require_login()?;
    let form = match GenreForm::decode(&body) {
        Ok(form) => form,
        Err(rejected) => {
            return Ok(genre_form(&rejected.values, None, Some(&rejected.errors)).into_response())
        }
    };

    match split_invalid(state.services.catalog.create_genre(&form).await)? {
        Ok(genre) => Ok(Route::GenreDetail(genre.id).redirect().into_response()),
        Err(errors) => Ok(genre_form(&form, None, Some(&errors)).into_response()),
    }
}

/// Update form with the current name
#[utoipa::path(
    get,
    path = "/genres/{id}/update",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 200, description = "catalog/genre_form.html view", body = View),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn update_form(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<View> {
    ctx.require_login()?;
    let genre = state.services.catalog.get_genre(id).await?;
    Ok(genre_form(&GenreForm::from(&genre), Some(&genre), None))
}

/// Rename a genre and redirect to it
#[utoipa::path(
    post,
    path = "/genres/{id}/update",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    request_body = GenreForm,
    responses(
        (status = 303, description = "Updated; redirect to the genre"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Genre not found"),
        (status = 409, description = "Name already taken", body = crate::error::ErrorResponse),
        (status = 422, description = "Form re-presented with errors", body = View)
    )
)]
pub async fn update_genre(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
    body: Bytes,
) -> AppResult<Response> {
    ctx.require_login()?;
    let form = match GenreForm::decode(&body) {
        Ok(form) => form,
        Err(rejected) => {
            let genre = state.services.catalog.get_genre(id).await?;
            return Ok(
                genre_form(&rejected.values, Some(&genre), Some(&rejected.errors)).into_response(),
            );
        }
    };

    match split_invalid(state.services.catalog.update_genre(id, &form).await)? {
        Ok(genre) => Ok(Route::GenreDetail(genre.id).redirect().into_response()),
        Err(errors) => {
            let genre = state.services.catalog.get_genre(id).await?;
            Ok(genre_form(&form, Some(&genre), Some(&errors)).into_response())
        }
    }
}

/// Deletion confirmation
#[utoipa::path(
    get,
    path = "/genres/{id}/delete",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 200, description = "catalog/genre_confirm_delete.html view", body = View),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<View> {
    ctx.require_login()?;
    let genre = state.services.catalog.get_genre(id).await?;
    Ok(View::new(CONFIRM_DELETE_TEMPLATE, json!({ "genre": genre })))
}

/// Delete a genre and redirect to the genre list
#[utoipa::path(
    post,
    path = "/genres/{id}/delete",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 303, description = "Deleted; redirect to the genre list"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn delete_genre(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    ctx.require_login()?;
    state.services.catalog.delete_genre(id).await?;
    Ok(Route::Genres.redirect().into_response())
}
