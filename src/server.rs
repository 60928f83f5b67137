//! The admin HTTP surface: JSON CRUD over the book and notes stores,
//! multipart cover upload, and static serving of the site asset tree.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::books::{BookStore, COVER_URL_PREFIX};
use crate::error::StoreError;
use crate::model::{Book, CreateBookRequest, Note, NoteRequest, UpdateBookRequest};
use crate::notes::NoteStore;

#[derive(Clone)]
pub struct AppState {
    pub book_store: Arc<dyn BookStore>,
    pub note_store: Arc<dyn NoteStore>,
    pub covers_dir: PathBuf,
}

pub fn router(state: AppState, assets_dir: impl Into<PathBuf>) -> Router {
    let assets_dir = assets_dir.into();
    let admin_dir = assets_dir.join("admin");

    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/books", get(list_books).post(create_book))
        .route(
            "/api/books/:slug",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/api/books/:slug/notes", get(list_notes).post(add_note))
        .route(
            "/api/books/:slug/notes/:index",
            put(update_note).delete(delete_note),
        )
        .route("/api/upload-cover", post(upload_cover))
        .nest_service("/admin", ServeDir::new(admin_dir))
        .nest_service("/assets", ServeDir::new(assets_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler-boundary error: every store failure maps to a status here, and
/// anything unexpected answers as a fixed-message 500.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_owned(),
            ),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => ApiError::BadRequest(msg),
            StoreError::NotFound(msg) => ApiError::NotFound(msg),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Yaml(_) | StoreError::Io(_) => {
                tracing::error!(error = %err, "unexpected i/o failure");
                ApiError::Internal
            }
        }
    }
}

#[derive(Serialize)]
struct BookMessage {
    message: &'static str,
    slug: String,
}

#[derive(Serialize)]
struct NoteAdded {
    message: &'static str,
    index: usize,
}

#[derive(Serialize)]
struct NoteMessage {
    message: &'static str,
}

#[derive(Serialize)]
struct CoverUploaded {
    message: &'static str,
    path: String,
}

async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.book_store.list().await?))
}

async fn get_book(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.book_store.get(&slug).await?))
}

async fn create_book(
    State(state): State<AppState>,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookMessage>), ApiError> {
    let book = state.book_store.create(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookMessage {
            message: "Book created",
            slug: book.slug,
        }),
    ))
}

async fn update_book(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<BookMessage>, ApiError> {
    state.book_store.update(&slug, req).await?;
    Ok(Json(BookMessage {
        message: "Book updated",
        slug,
    }))
}

async fn delete_book(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BookMessage>, ApiError> {
    state.book_store.delete(&slug).await?;
    Ok(Json(BookMessage {
        message: "Book deleted",
        slug,
    }))
}

async fn list_notes(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.note_store.list(&slug).await?))
}

async fn add_note(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<NoteRequest>,
) -> Result<(StatusCode, Json<NoteAdded>), ApiError> {
    let index = state.note_store.append(&slug, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(NoteAdded {
            message: "Note added",
            index,
        }),
    ))
}

async fn update_note(
    State(state): State<AppState>,
    Path((slug, index)): Path<(String, usize)>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<NoteMessage>, ApiError> {
    state.note_store.replace(&slug, index, req).await?;
    Ok(Json(NoteMessage {
        message: "Note updated",
    }))
}

async fn delete_note(
    State(state): State<AppState>,
    Path((slug, index)): Path<(String, usize)>,
) -> Result<Json<NoteMessage>, ApiError> {
    state.note_store.remove(&slug, index).await?;
    Ok(Json(NoteMessage {
        message: "Note deleted",
    }))
}

/// Multipart upload with a text field `slug` and a file field `cover`. The
/// stored name is the slug plus the upload's original extension, silently
/// overwriting an existing cover of the same name.
async fn upload_cover(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CoverUploaded>, ApiError> {
    let mut slug: Option<String> = None;
    let mut cover: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        let name = field.name().map(ToOwned::to_owned);
        match name.as_deref() {
            Some("slug") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?;
                slug = Some(text);
            }
            Some("cover") => {
                let original_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?;
                cover = Some((original_name, bytes));
            }
            _ => {}
        }
    }

    let Some((original_name, bytes)) = cover else {
        return Err(ApiError::BadRequest("No file uploaded".to_owned()));
    };
    let slug = slug
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "book".to_owned());
    let ext = std::path::Path::new(&original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let file_name = format!("{slug}{ext}");

    tokio::fs::write(state.covers_dir.join(&file_name), &bytes)
        .await
        .map_err(StoreError::from)?;

    Ok(Json(CoverUploaded {
        message: "Cover uploaded",
        path: format!("{COVER_URL_PREFIX}/{file_name}"),
    }))
}
