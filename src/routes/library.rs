//! Author and book HTTP endpoints.
//!
//! - GET/POST /api/v1/authors, GET/PUT /api/v1/authors/:id
//! - GET /api/v1/authors/:id/books
//! - GET/POST /api/v1/books, GET/PUT /api/v1/books/:id

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::{IntoParams, ToSchema};

use crate::db::{models, queries};
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::slugify;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuthorListQuery {
    /// Filter by active flag; omit for all authors
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BookListQuery {
    /// Filter by active flag; omit for all books
    pub is_active: Option<bool>,
    /// Filter by author; omit for all authors
    pub author_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub biography: String,
    /// ISO 8601 date
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub nationality: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<models::Author> for AuthorResponse {
    fn from(a: models::Author) -> Self {
        Self {
            id: a.id,
            first_name: a.first_name,
            last_name: a.last_name,
            biography: a.biography,
            birth_date: a.birth_date.map(|d| d.to_string()),
            death_date: a.death_date.map(|d| d.to_string()),
            nationality: a.nationality,
            is_active: a.is_active,
            created_at: a.created_at.to_rfc3339(),
            updated_at: a.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub author_id: i64,
    /// ISO 8601 date
    pub publication_date: Option<String>,
    pub isbn: String,
    pub page_count: Option<i32>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<models::Book> for BookResponse {
    fn from(b: models::Book) -> Self {
        Self {
            id: b.id,
            title: b.title,
            slug: b.slug,
            description: b.description,
            author_id: b.author_id,
            publication_date: b.publication_date.map(|d| d.to_string()),
            isbn: b.isbn,
            page_count: b.page_count,
            is_active: b.is_active,
            created_at: b.created_at.to_rfc3339(),
            updated_at: b.updated_at.to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthorRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub biography: String,
    pub birth_date: Option<chrono::NaiveDate>,
    pub death_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub nationality: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookRequest {
    pub title: String,
    /// Derived from `title` when omitted
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub author_id: i64,
    pub publication_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub isbn: String,
    pub page_count: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl AuthorRequest {
    fn into_params(self) -> Result<queries::AuthorParams, AppError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(AppError::Validation(
                "first_name and last_name must not be empty".to_string(),
            ));
        }
        if let (Some(birth), Some(death)) = (self.birth_date, self.death_date) {
            if death < birth {
                return Err(AppError::Validation(
                    "death_date must not precede birth_date".to_string(),
                ));
            }
        }
        Ok(queries::AuthorParams {
            first_name: self.first_name,
            last_name: self.last_name,
            biography: self.biography,
            birth_date: self.birth_date,
            death_date: self.death_date,
            nationality: self.nationality,
            is_active: self.is_active,
        })
    }
}

impl BookRequest {
    fn into_params(self) -> Result<queries::BookParams, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        if let Some(pages) = self.page_count {
            if pages < 1 {
                return Err(AppError::Validation(format!(
                    "page_count {} must be at least 1",
                    pages
                )));
            }
        }
        let slug = match self.slug {
            Some(s) if !s.trim().is_empty() => s,
            _ => slugify(&self.title),
        };
        Ok(queries::BookParams {
            title: self.title,
            slug,
            description: self.description,
            author_id: self.author_id,
            publication_date: self.publication_date,
            isbn: self.isbn,
            page_count: self.page_count,
            is_active: self.is_active,
        })
    }
}

// ---------------------------------------------------------------------------
// Author handlers
// ---------------------------------------------------------------------------

/// List authors.
#[utoipa::path(
    get,
    path = "/api/v1/authors",
    tag = "Library",
    params(AuthorListQuery),
    responses(
        (status = 200, description = "List of authors", body = Vec<AuthorResponse>),
    )
)]
pub async fn list_authors(
    State(pool): State<PgPool>,
    Query(query): Query<AuthorListQuery>,
) -> Result<Json<Vec<AuthorResponse>>, AppError> {
    let authors = queries::list_authors(&pool, query.is_active).await?;
    Ok(Json(authors.into_iter().map(AuthorResponse::from).collect()))
}

/// Get an author by id.
#[utoipa::path(
    get,
    path = "/api/v1/authors/{id}",
    tag = "Library",
    params(("id" = i64, Path, description = "Author id")),
    responses(
        (status = 200, description = "The author", body = AuthorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse),
    )
)]
pub async fn get_author(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<Json<AuthorResponse>, AppError> {
    let author = queries::get_author(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))?;
    Ok(Json(author.into()))
}

/// List all books of an author.
#[utoipa::path(
    get,
    path = "/api/v1/authors/{id}/books",
    tag = "Library",
    params(("id" = i64, Path, description = "Author id")),
    responses(
        (status = 200, description = "The author's books", body = Vec<BookResponse>),
        (status = 404, description = "Author not found", body = ErrorResponse),
    )
)]
pub async fn get_author_books(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<BookResponse>>, AppError> {
    queries::get_author(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))?;

    let books = queries::list_books(&pool, None, Some(id)).await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// Create an author.
#[utoipa::path(
    post,
    path = "/api/v1/authors",
    tag = "Library",
    request_body = AuthorRequest,
    responses(
        (status = 201, description = "Author created", body = AuthorResponse),
        (status = 400, description = "Invalid field", body = ErrorResponse),
    )
)]
pub async fn create_author(
    State(pool): State<PgPool>,
    Json(request): Json<AuthorRequest>,
) -> Result<(StatusCode, Json<AuthorResponse>), AppError> {
    let author = queries::insert_author(&pool, request.into_params()?).await?;
    Ok((StatusCode::CREATED, Json(author.into())))
}

/// Update an author in place.
#[utoipa::path(
    put,
    path = "/api/v1/authors/{id}",
    tag = "Library",
    params(("id" = i64, Path, description = "Author id")),
    request_body = AuthorRequest,
    responses(
        (status = 200, description = "Author updated", body = AuthorResponse),
        (status = 400, description = "Invalid field", body = ErrorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse),
    )
)]
pub async fn update_author(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(request): Json<AuthorRequest>,
) -> Result<Json<AuthorResponse>, AppError> {
    let author = queries::update_author(&pool, id, request.into_params()?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))?;
    Ok(Json(author.into()))
}

// ---------------------------------------------------------------------------
// Book handlers
// ---------------------------------------------------------------------------

/// List books.
#[utoipa::path(
    get,
    path = "/api/v1/books",
    tag = "Library",
    params(BookListQuery),
    responses(
        (status = 200, description = "List of books", body = Vec<BookResponse>),
    )
)]
pub async fn list_books(
    State(pool): State<PgPool>,
    Query(query): Query<BookListQuery>,
) -> Result<Json<Vec<BookResponse>>, AppError> {
    let books = queries::list_books(&pool, query.is_active, query.author_id).await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// Get a book by id.
#[utoipa::path(
    get,
    path = "/api/v1/books/{id}",
    tag = "Library",
    params(("id" = i64, Path, description = "Book id")),
    responses(
        (status = 200, description = "The book", body = BookResponse),
        (status = 404, description = "Book not found", body = ErrorResponse),
    )
)]
pub async fn get_book(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<Json<BookResponse>, AppError> {
    let book = queries::get_book(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;
    Ok(Json(book.into()))
}

/// Create a book.
#[utoipa::path(
    post,
    path = "/api/v1/books",
    tag = "Library",
    request_body = BookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Duplicate slug or invalid field", body = ErrorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse),
    )
)]
pub async fn create_book(
    State(pool): State<PgPool>,
    Json(request): Json<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let params = request.into_params()?;
    queries::get_author(&pool, params.author_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author {} not found", params.author_id)))?;

    let book = queries::insert_book(&pool, params).await?;
    Ok((StatusCode::CREATED, Json(book.into())))
}

/// Update a book in place.
#[utoipa::path(
    put,
    path = "/api/v1/books/{id}",
    tag = "Library",
    params(("id" = i64, Path, description = "Book id")),
    request_body = BookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Duplicate slug or invalid field", body = ErrorResponse),
        (status = 404, description = "Book or author not found", body = ErrorResponse),
    )
)]
pub async fn update_book(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(request): Json<BookRequest>,
) -> Result<Json<BookResponse>, AppError> {
    let params = request.into_params()?;
    queries::get_author(&pool, params.author_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author {} not found", params.author_id)))?;

    let book = queries::update_book(&pool, id, params)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;
    Ok(Json(book.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author_request() -> AuthorRequest {
        AuthorRequest {
            first_name: "Leo".to_string(),
            last_name: "Tolstoy".to_string(),
            biography: String::new(),
            birth_date: chrono::NaiveDate::from_ymd_opt(1828, 9, 9),
            death_date: chrono::NaiveDate::from_ymd_opt(1910, 11, 20),
            nationality: "Russian".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_author_request_valid() {
        assert!(author_request().into_params().is_ok());
    }

    #[test]
    fn test_author_request_rejects_death_before_birth() {
        let mut request = author_request();
        request.death_date = chrono::NaiveDate::from_ymd_opt(1800, 1, 1);
        assert!(matches!(
            request.into_params(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_book_request_slug_derived_from_title() {
        let request = BookRequest {
            title: "War and Peace".to_string(),
            slug: None,
            description: String::new(),
            author_id: 1,
            publication_date: None,
            isbn: String::new(),
            page_count: Some(1225),
            is_active: true,
        };
        assert_eq!(request.into_params().unwrap().slug, "war-and-peace");
    }

    #[test]
    fn test_book_request_rejects_zero_pages() {
        let request = BookRequest {
            title: "Pamphlet".to_string(),
            slug: None,
            description: String::new(),
            author_id: 1,
            publication_date: None,
            isbn: String::new(),
            page_count: Some(0),
            is_active: true,
        };
        assert!(matches!(
            request.into_params(),
            Err(AppError::Validation(_))
        ));
    }
}
