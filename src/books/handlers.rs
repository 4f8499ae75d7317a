use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{extractors::CurrentUser, model::Role, model::User},
    books::{
        dto::{BookPayload, BookResponse, ListQuery, ListResponse, PageDescriptor, Pagination, SelectQuery},
        model::Book,
        validate::validate_book,
    },
    config::BooksPolicy,
    error::ApiError,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books))
        .route("/books/:id", get(get_book))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/books", axum::routing::post(create_book))
        .route(
            "/books/:id",
            axum::routing::put(update_book).delete(delete_book),
        )
}

/// Path ids are rejected before the store is touched.
fn parse_book_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid book id \"{raw}\"")))
}

/// Applies `select=a,b,c` field projection; `id` is always kept.
fn project(book: &Book, select: Option<&str>) -> Result<Value, ApiError> {
    let value = serde_json::to_value(book).map_err(anyhow::Error::new)?;
    let Some(select) = select else {
        return Ok(value);
    };
    let keep: HashSet<&str> = select
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    match value {
        Value::Object(map) => Ok(Value::Object(
            map.into_iter()
                .filter(|(key, _)| key == "id" || keep.contains(key.as_str()))
                .collect(),
        )),
        other => Ok(other),
    }
}

/// Under the protected policy, mutations require a session with an
/// allowed role. Under the open policy anyone may write; an
/// authenticated caller still gets recorded as owner.
fn require_writer(
    state: &AppState,
    current: Option<&CurrentUser>,
) -> Result<Option<User>, ApiError> {
    match state.config.books_policy {
        BooksPolicy::Open => Ok(current.map(|c| c.0.clone())),
        BooksPolicy::Protected => {
            let current = current.ok_or(ApiError::Unauthorized)?;
            current.require_role(&[Role::User, Role::Admin])?;
            Ok(Some(current.0.clone()))
        }
    }
}

fn ensure_owner(
    state: &AppState,
    writer: Option<&User>,
    book: &Book,
    action: &str,
) -> Result<(), ApiError> {
    if state.config.books_policy == BooksPolicy::Open {
        return Ok(());
    }
    let user = writer.ok_or(ApiError::Unauthorized)?;
    if user.role == Role::Admin || book.user == Some(user.id) {
        return Ok(());
    }
    warn!(user_id = %user.id, book_id = %book.id, "ownership check failed");
    Err(ApiError::Forbidden(format!(
        "User \"{}\" is not authorized to {action} this book",
        user.id
    )))
}

fn duplicate_error(title: &str, author: &str) -> ApiError {
    ApiError::Duplicate(format!("Book \"{title}\" by {author} already exists!"))
}

#[instrument(skip(state))]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let books = state.books.list().await?;
    let total = books.len();

    let limit = (query.limit.max(1)) as usize;
    let page = (query.page.max(1)) as usize;
    let start = (page - 1) * limit;
    let end = (start + limit).min(total);
    let slice: &[Book] = if start >= total { &[] } else { &books[start..end] };

    let mut pagination = Pagination::default();
    if end < total {
        pagination.next = Some(PageDescriptor {
            page: (page + 1) as u64,
            limit: limit as u64,
        });
    }
    if start > 0 {
        pagination.prev = Some(PageDescriptor {
            page: (page - 1) as u64,
            limit: limit as u64,
        });
    }

    let data = slice
        .iter()
        .map(|b| project(b, query.select.as_deref()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ListResponse {
        status: true,
        count: data.len(),
        pagination,
        data,
    }))
}

#[instrument(skip(state))]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SelectQuery>,
) -> Result<Json<BookResponse>, ApiError> {
    let id = parse_book_id(&id)?;
    let book = state
        .books
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book with id \"{id}\" not found")))?;
    Ok(Json(BookResponse {
        status: true,
        data: project(&book, query.select.as_deref())?,
    }))
}

#[instrument(skip(state, current, payload))]
pub async fn create_book(
    State(state): State<AppState>,
    current: Option<CurrentUser>,
    Json(payload): Json<BookPayload>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let writer = require_writer(&state, current.as_ref())?;
    let owner = writer.as_ref().map(|u| u.id);

    let book = payload.into_book(Uuid::new_v4(), owner)?;

    let books = state.books.list().await?;
    if books
        .iter()
        .any(|b| b.same_title_and_author(&book.title, &book.author))
    {
        return Err(duplicate_error(&book.title, &book.author));
    }

    // A non-admin may own at most one book under the protected policy.
    if state.config.books_policy == BooksPolicy::Protected {
        if let Some(user) = writer.as_ref().filter(|u| u.role != Role::Admin) {
            if books.iter().any(|b| b.user == Some(user.id)) {
                return Err(ApiError::BadRequest(format!(
                    "The user with ID \"{}\" has already added a book",
                    user.id
                )));
            }
        }
    }

    state.books.put(book.clone()).await?;
    info!(book_id = %book.id, title = %book.title, "book created");

    Ok((
        StatusCode::CREATED,
        Json(BookResponse {
            status: true,
            data: serde_json::to_value(&book).map_err(anyhow::Error::new)?,
        }),
    ))
}

#[instrument(skip(state, current, payload))]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    current: Option<CurrentUser>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<BookResponse>, ApiError> {
    let id = parse_book_id(&id)?;
    let writer = require_writer(&state, current.as_ref())?;

    let mut book = state
        .books
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book with id \"{id}\" not found")))?;
    ensure_owner(&state, writer.as_ref(), &book, "update")?;

    payload.apply(&mut book);

    let messages = validate_book(&book);
    if !messages.is_empty() {
        return Err(ApiError::validation(messages));
    }

    let books = state.books.list().await?;
    if books
        .iter()
        .any(|b| b.id != book.id && b.same_title_and_author(&book.title, &book.author))
    {
        return Err(duplicate_error(&book.title, &book.author));
    }

    state.books.put(book.clone()).await?;
    info!(book_id = %book.id, "book updated");

    Ok(Json(BookResponse {
        status: true,
        data: serde_json::to_value(&book).map_err(anyhow::Error::new)?,
    }))
}

#[instrument(skip(state, current))]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    current: Option<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_book_id(&id)?;
    let writer = require_writer(&state, current.as_ref())?;

    let book = state
        .books
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book with id \"{id}\" not found")))?;
    ensure_owner(&state, writer.as_ref(), &book, "delete")?;

    state.books.delete(id).await?;
    info!(book_id = %id, "book deleted");

    Ok(Json(json!({ "status": true, "data": {} })))
}
