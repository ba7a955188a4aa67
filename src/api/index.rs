//! Catalog home page

use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{error::AppResult, AppState};

use super::{session_cookie, views::View, RequestContext};

/// Catalog counts and the visitor's visit count
#[utoipa::path(
    get,
    path = "/index",
    tag = "catalog",
    responses(
        (status = 200, description = "books/index.html view", body = View)
    )
)]
pub async fn index(
    State(state): State<AppState>,
    ctx: RequestContext,
    jar: CookieJar,
) -> AppResult<(CookieJar, View)> {
    let counts = state.services.catalog.index_counts().await?;
    let num_visits = state.services.sessions.record_visit(&ctx.session).await?;

    let jar = if ctx.session.is_new {
        jar.add(session_cookie(&state.config.session, &ctx.session))
    } else {
        jar
    };

    let view = View::new(
        "books/index.html",
        json!({
            "num_books": counts.num_books,
            "num_instances": counts.num_instances,
            "num_instances_available": counts.num_instances_available,
            "num_authors": counts.num_authors,
            "num_books_with_title": counts.num_books_with_title,
            "num_visits": num_visits,
        }),
    );

    Ok((jar, view))
}
