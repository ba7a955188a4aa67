//! API integration tests
//!
//! Drive the router in-process over the in-memory catalog and session stores.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use tower::ServiceExt;

use libris_server::{
    api,
    config::AppConfig,
    models::{
        author::AuthorForm,
        book::BookForm,
        book_instance::{BookInstance, BookInstanceForm, LoanStatus},
        user::{Permission, User},
    },
    repository::{memory::MemoryStore, CatalogStore},
    services::{sessions::MemorySessionStore, Services},
    AppState,
};

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    services: Arc<Services>,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

fn setup() -> TestApp {
    let config = AppConfig::default();
    let store = Arc::new(MemoryStore::new());
    let services = Arc::new(Services::new(
        store.clone(),
        Arc::new(MemorySessionStore::new(config.session.ttl_seconds)),
        &config,
    ));
    let state = AppState {
        config: Arc::new(config),
        services: services.clone(),
    };

    TestApp {
        router: api::router(state),
        store,
        services,
    }
}

impl TestApp {
    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        cookie: Option<&str>,
        body: Option<String>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, None, Some(body.to_string()))
            .await
    }

    /// POST a body that need not be valid JSON
    async fn post_raw(&self, uri: &str, token: Option<&str>, body: &str) -> TestResponse {
        self.request(Method::POST, uri, token, None, Some(body.to_string()))
            .await
    }

    async fn user(&self, username: &str, permissions: Vec<Permission>) -> (User, String) {
        let user = self
            .services
            .auth
            .register(username, "password", permissions)
            .await
            .unwrap();
        let token = self.services.auth.create_token_for_user(&user).unwrap();
        (user, token)
    }

    async fn book(&self, title: &str) -> i32 {
        let author = self
            .store
            .create_author(&AuthorForm {
                first_name: "Frank".to_string(),
                last_name: "Herbert".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1920, 10, 8).unwrap(),
                date_of_death: NaiveDate::from_ymd_opt(1986, 2, 11),
            })
            .await
            .unwrap();
        self.store
            .create_book(&BookForm {
                title: title.to_string(),
                author: author.id,
                summary: "Desert planet.".to_string(),
                isbn: "9780441013593".to_string(),
                genre: vec![],
            })
            .await
            .unwrap()
            .id
    }

    async fn loaned_copy(&self, book_id: i32, borrower: i32, due_back: NaiveDate) -> BookInstance {
        self.store
            .create_instance(
                book_id,
                &BookInstanceForm {
                    imprint: "Ace, 1990".to_string(),
                    status: LoanStatus::OnLoan,
                    due_back: Some(due_back),
                    borrower: Some(borrower),
                },
            )
            .await
            .unwrap()
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let response = app.get("/api/v1/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");

    let response = app.get("/api/v1/ready", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ready");
}

#[tokio::test]
async fn test_login() {
    let app = setup();
    app.user("librarian", vec![Permission::CanMarkReturned]).await;

    let response = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "username": "librarian", "password": "password" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["token"].is_string());
    assert_eq!(response.body["token_type"], "Bearer");
    assert_eq!(response.body["user"]["permissions"], json!(["can_mark_returned"]));
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = setup();
    app.user("librarian", vec![]).await;

    let response = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "username": "librarian", "password": "wrong" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let app = setup();
    let response = app.get("/api/v1/mybooks", Some("garbage")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_index_counts_visits_per_session() {
    let app = setup();
    app.book("A Tale of Stars").await;

    let first = app.get("/api/v1/index", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["template"], "books/index.html");
    assert_eq!(first.body["context"]["num_visits"], 0);
    assert_eq!(first.body["context"]["num_books"], 1);
    assert_eq!(first.body["context"]["num_books_with_title"], 1);

    let set_cookie = first.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("sessionid="));
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let second = app
        .request(Method::GET, "/api/v1/index", None, Some(&cookie), None)
        .await;
    assert_eq!(second.body["context"]["num_visits"], 1);
    assert!(second.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_book_list_pages() {
    let app = setup();
    for n in 0..6 {
        app.book(&format!("Dune {}", n)).await;
    }

    let first = app.get("/api/v1/books", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["template"], "books/book_list.html");
    assert_eq!(first.body["context"]["book_list"].as_array().unwrap().len(), 5);
    assert_eq!(first.body["context"]["is_paginated"], true);
    assert!(first.body["context"]["book_list"][0]["url"]
        .as_str()
        .unwrap()
        .starts_with("/api/v1/books/"));

    let second = app.get("/api/v1/books?page=2", None).await;
    assert_eq!(second.body["context"]["book_list"].as_array().unwrap().len(), 1);

    let missing = app.get("/api/v1/books?page=3", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_book_crud_flow() {
    let app = setup();
    let (_, token) = app.user("patron", vec![]).await;
    let author = app
        .store
        .create_author(&AuthorForm {
            first_name: "Mary".to_string(),
            last_name: "Shelley".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1797, 8, 30).unwrap(),
            date_of_death: NaiveDate::from_ymd_opt(1851, 2, 1),
        })
        .await
        .unwrap();
    let form = json!({
        "title": "Frankenstein",
        "author": author.id,
        "summary": "A modern Prometheus.",
        "isbn": "9780141439471",
        "genre": [],
    });

    let anonymous = app.post("/api/v1/books/create", None, form.clone()).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let created = app.post("/api/v1/books/create", Some(&token), form.clone()).await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    let location = created.headers[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with("/api/v1/books/"));

    let detail = app.get(&location, None).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["context"]["book"]["title"], "Frankenstein");
    assert_eq!(detail.body["context"]["author"]["last_name"], "Shelley");

    let mut invalid = form.clone();
    invalid["isbn"] = json!("123");
    let rejected = app
        .post(&format!("{}/update", location), Some(&token), invalid)
        .await;
    assert_eq!(rejected.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(rejected.body["template"], "books/book_form.html");
    assert!(rejected.body["context"]["errors"]["isbn"].is_array());
    assert_eq!(rejected.body["context"]["form"]["isbn"], "123");

    let deleted = app
        .post(&format!("{}/delete", location), Some(&token), json!({}))
        .await;
    assert_eq!(deleted.status, StatusCode::SEE_OTHER);
    assert_eq!(deleted.headers[header::LOCATION], "/api/v1/index");

    assert_eq!(app.get(&location, None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_author_create_form_and_delete_conflict() {
    let app = setup();
    let (_, token) = app.user("patron", vec![]).await;

    let form = app.get("/api/v1/authors/create", Some(&token)).await;
    assert_eq!(form.status, StatusCode::OK);
    assert_eq!(form.body["context"]["form"]["date_of_death"], "2016-12-10");

    let book_id = app.book("Dune").await;
    let book = app.store.get_book(book_id).await.unwrap();
    let conflict = app
        .post(
            &format!("/api/v1/authors/{}/delete", book.author_id),
            Some(&token),
            json!({}),
        )
        .await;
    assert_eq!(conflict.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_my_borrowed_lists_own_loans() {
    let app = setup();
    let (alice, alice_token) = app.user("alice", vec![]).await;
    let (bob, _) = app.user("bob", vec![]).await;
    let book_id = app.book("Dune").await;
    app.loaned_copy(book_id, alice.id, today() + Duration::days(3)).await;
    app.loaned_copy(book_id, bob.id, today() + Duration::days(1)).await;

    let response = app.get("/api/v1/mybooks", Some(&alice_token)).await;
    assert_eq!(response.status, StatusCode::OK);
    let loans = response.body["context"]["bookinstance_list"].as_array().unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0]["instance"]["borrower_id"], alice.id);
    assert_eq!(loans[0]["is_overdue"], false);

    assert_eq!(
        app.get("/api/v1/mybooks", None).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_renewal_flow() {
    let app = setup();
    let (patron, patron_token) = app.user("patron", vec![]).await;
    let (_, librarian_token) = app.user("librarian", vec![Permission::CanMarkReturned]).await;
    let book_id = app.book("Dune").await;
    let original_due = today() - Duration::days(2);
    let copy = app.loaned_copy(book_id, patron.id, original_due).await;
    let uri = format!("/api/v1/bookinstances/{}/renew", copy.id);

    let target = today() + Duration::days(9);
    let denied = app
        .post(&uri, Some(&patron_token), json!({ "renewal_date": target }))
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.store.get_instance(copy.id).await.unwrap().due_back,
        Some(original_due)
    );

    let form = app.get(&uri, Some(&librarian_token)).await;
    assert_eq!(form.status, StatusCode::OK);
    assert_eq!(
        form.body["template"],
        "catalog/library_worker_templates/book_renew_librarian.html"
    );
    assert_eq!(
        form.body["context"]["form"]["renewal_date"],
        json!(today() + Duration::days(21))
    );

    let applied = app
        .post(&uri, Some(&librarian_token), json!({ "renewal_date": target }))
        .await;
    assert_eq!(applied.status, StatusCode::SEE_OTHER);
    assert_eq!(applied.headers[header::LOCATION], "/api/v1/borrowed");
    assert_eq!(
        app.store.get_instance(copy.id).await.unwrap().due_back,
        Some(target)
    );

    let too_far = app
        .post(
            &uri,
            Some(&librarian_token),
            json!({ "renewal_date": today() + Duration::days(40) }),
        )
        .await;
    assert_eq!(too_far.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(too_far.body["context"]["errors"]["renewal_date"].is_array());
    assert_eq!(
        app.store.get_instance(copy.id).await.unwrap().due_back,
        Some(target)
    );

    let borrowed = app.get("/api/v1/borrowed", Some(&librarian_token)).await;
    assert_eq!(
        borrowed.body["context"]["bookinstance_list"][0]["renew_url"],
        uri.as_str()
    );
}

#[tokio::test]
async fn test_renewal_of_unknown_copy_is_not_found() {
    let app = setup();
    let (_, token) = app.user("librarian", vec![Permission::CanMarkReturned]).await;

    let response = app
        .get(
            &format!("/api/v1/bookinstances/{}/renew", uuid::Uuid::new_v4()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_copy_administration() {
    let app = setup();
    let (patron, patron_token) = app.user("patron", vec![]).await;
    let (_, librarian_token) = app.user("librarian", vec![Permission::CanMarkReturned]).await;
    let book_id = app.book("Dune").await;
    let uri = format!("/api/v1/books/{}/instances", book_id);

    let form = json!({ "imprint": "Ace, 1990", "status": "available" });
    assert_eq!(
        app.post(&uri, Some(&patron_token), form.clone()).await.status,
        StatusCode::FORBIDDEN
    );

    let created = app.post(&uri, Some(&librarian_token), form).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["id"].as_str().unwrap().to_string();

    let inconsistent = app
        .request(
            Method::PUT,
            &format!("/api/v1/bookinstances/{}", id),
            Some(&librarian_token),
            None,
            Some(json!({ "imprint": "Ace, 1990", "status": "on_loan", "borrower": patron.id }).to_string()),
        )
        .await;
    assert_eq!(inconsistent.status, StatusCode::BAD_REQUEST);

    let listed = app
        .get("/api/v1/bookinstances?status=available", Some(&librarian_token))
        .await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(
        listed.body["context"]["bookinstance_list"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_renewal_checks_permission_before_reading_the_form() {
    let app = setup();
    let (patron, patron_token) = app.user("patron", vec![]).await;
    let (_, librarian_token) = app.user("librarian", vec![Permission::CanMarkReturned]).await;
    let book_id = app.book("Dune").await;
    let original_due = today() + Duration::days(1);
    let copy = app.loaned_copy(book_id, patron.id, original_due).await;
    let uri = format!("/api/v1/bookinstances/{}/renew", copy.id);

    let malformed = app
        .post(&uri, Some(&patron_token), json!({ "renewal_date": "not-a-date" }))
        .await;
    assert_eq!(malformed.status, StatusCode::FORBIDDEN);
    let not_json = app.post_raw(&uri, Some(&patron_token), "renewal_date=").await;
    assert_eq!(not_json.status, StatusCode::FORBIDDEN);

    let impossible = app
        .post(&uri, Some(&librarian_token), json!({ "renewal_date": "2024-02-30" }))
        .await;
    assert_eq!(impossible.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        impossible.body["template"],
        "catalog/library_worker_templates/book_renew_librarian.html"
    );
    assert_eq!(
        impossible.body["context"]["errors"]["renewal_date"],
        json!(["Enter a valid date."])
    );
    assert_eq!(impossible.body["context"]["form"]["renewal_date"], "2024-02-30");

    let missing = app.post(&uri, Some(&librarian_token), json!({})).await;
    assert_eq!(missing.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        missing.body["context"]["errors"]["renewal_date"],
        json!(["This field is required."])
    );

    assert_eq!(
        app.store.get_instance(copy.id).await.unwrap().due_back,
        Some(original_due)
    );
}

#[tokio::test]
async fn test_author_form_with_bad_date_is_re_presented() {
    let app = setup();
    let (_, token) = app.user("patron", vec![]).await;
    let form = json!({
        "first_name": "Octavia",
        "last_name": "Butler",
        "date_of_birth": "yesterday",
        "date_of_death": null,
    });

    let anonymous = app.post("/api/v1/authors/create", None, form.clone()).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let rejected = app.post("/api/v1/authors/create", Some(&token), form).await;
    assert_eq!(rejected.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(rejected.body["template"], "authors/author_form.html");
    assert_eq!(
        rejected.body["context"]["errors"]["date_of_birth"],
        json!(["Enter a valid date."])
    );
    assert_eq!(rejected.body["context"]["form"]["last_name"], "Butler");
    assert_eq!(app.store.count_authors().await.unwrap(), 0);

    let book_id = app.book("Kindred").await;
    let bad_author = app
        .post(
            &format!("/api/v1/books/{}/update", book_id),
            Some(&token),
            json!({
                "title": "Kindred",
                "author": "Butler",
                "summary": "Time travel.",
                "isbn": "9780807083697",
            }),
        )
        .await;
    assert_eq!(bad_author.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        bad_author.body["context"]["errors"]["author"],
        json!(["Select a valid choice."])
    );
}

#[tokio::test]
async fn test_genre_maintenance() {
    let app = setup();
    let (_, token) = app.user("patron", vec![]).await;

    let anonymous = app
        .post("/api/v1/genres/create", None, json!({ "name": "Poetry" }))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let created = app
        .post("/api/v1/genres/create", Some(&token), json!({ "name": "Poetry" }))
        .await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    let location = created.headers[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with("/api/v1/genres/"));

    let detail = app.get(&location, None).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["context"]["genre"]["name"], "Poetry");

    let duplicate = app
        .post("/api/v1/genres/create", Some(&token), json!({ "name": "Poetry" }))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let empty = app
        .post(&format!("{}/update", location), Some(&token), json!({ "name": "" }))
        .await;
    assert_eq!(empty.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(empty.body["template"], "catalog/genre_form.html");
    assert!(empty.body["context"]["errors"]["name"].is_array());

    let renamed = app
        .post(&format!("{}/update", location), Some(&token), json!({ "name": "Verse" }))
        .await;
    assert_eq!(renamed.status, StatusCode::SEE_OTHER);

    let genre_id = detail.body["context"]["genre"]["id"].clone();
    let listed = app.get("/api/v1/genres", None).await;
    assert_eq!(listed.body, json!([{ "id": genre_id, "name": "Verse" }]));

    let book_form = app.get("/api/v1/books/create", Some(&token)).await;
    assert_eq!(book_form.body["context"]["genres"][0]["name"], "Verse");

    let deleted = app
        .post(&format!("{}/delete", location), Some(&token), json!({}))
        .await;
    assert_eq!(deleted.status, StatusCode::SEE_OTHER);
    assert_eq!(deleted.headers[header::LOCATION], "/api/v1/genres");
    assert_eq!(app.get(&location, None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_copy_administration_checks_permission_before_the_form() {
    let app = setup();
    let (_, patron_token) = app.user("patron", vec![]).await;
    let (_, librarian_token) = app.user("librarian", vec![Permission::CanMarkReturned]).await;
    let book_id = app.book("Dune").await;
    let uri = format!("/api/v1/books/{}/instances", book_id);

    let denied = app.post_raw(&uri, Some(&patron_token), "{").await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let empty_imprint = app
        .post(&uri, Some(&librarian_token), json!({ "imprint": "", "status": "available" }))
        .await;
    assert_eq!(empty_imprint.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(empty_imprint.body["fields"]["imprint"].is_array());

    let bad_date = app
        .post(&uri, Some(&librarian_token), json!({ "imprint": "Ace", "due_back": "soon" }))
        .await;
    assert_eq!(bad_date.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(bad_date.body["fields"]["due_back"], json!(["Enter a valid date."]));
}
