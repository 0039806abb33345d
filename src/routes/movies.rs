//! Movie and movie-category HTTP endpoints.
//!
//! - GET/POST /api/v1/categories, GET/PUT /api/v1/categories/:id
//! - GET/POST /api/v1/movies, GET/PUT /api/v1/movies/:id
//! - GET /api/v1/active-movie — take the next active movie

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
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
pub struct CategoryListQuery {
    /// Filter by active flag; omit for all categories
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MovieListQuery {
    /// Filter by active flag; omit for all movies
    pub is_active: Option<bool>,
    /// Filter by category; omit for all categories
    pub category_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub is_active: bool,
    /// ISO 8601 / RFC 3339
    pub created_at: String,
    pub updated_at: String,
}

impl From<models::MovieCategory> for CategoryResponse {
    fn from(c: models::MovieCategory) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            is_active: c.is_active,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovieResponse {
    pub id: i64,
    pub title: String,
    pub original_title: String,
    pub slug: String,
    pub description: String,
    /// ISO 8601 date, e.g. "2010-07-16"
    pub release_date: Option<String>,
    pub duration_minutes: Option<i32>,
    /// 0–10, one decimal place
    pub rating: Option<f64>,
    pub director: String,
    pub category_id: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<models::Movie> for MovieResponse {
    fn from(m: models::Movie) -> Self {
        Self {
            id: m.id,
            title: m.title,
            original_title: m.original_title,
            slug: m.slug,
            description: m.description,
            release_date: m.release_date.map(|d| d.to_string()),
            duration_minutes: m.duration_minutes,
            rating: m.rating.and_then(|r| r.to_f64()),
            director: m.director,
            category_id: m.category_id,
            is_active: m.is_active,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    /// Derived from `name` when omitted
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MovieRequest {
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    /// Derived from `title` when omitted
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    /// ISO 8601 date
    pub release_date: Option<chrono::NaiveDate>,
    pub duration_minutes: Option<i32>,
    pub rating: Option<Decimal>,
    #[serde(default)]
    pub director: String,
    pub category_id: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl CategoryRequest {
    fn into_params(self) -> Result<queries::CategoryParams, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        let slug = match self.slug {
            Some(s) if !s.trim().is_empty() => s,
            _ => slugify(&self.name),
        };
        Ok(queries::CategoryParams {
            name: self.name,
            slug,
            description: self.description,
            is_active: self.is_active,
        })
    }
}

impl MovieRequest {
    fn into_params(self) -> Result<queries::MovieParams, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        if let Some(minutes) = self.duration_minutes {
            if !(1..=600).contains(&minutes) {
                return Err(AppError::Validation(format!(
                    "duration_minutes {} out of range [1, 600]",
                    minutes
                )));
            }
        }
        if let Some(rating) = self.rating {
            if rating < Decimal::ZERO || rating > Decimal::from(10) {
                return Err(AppError::Validation(format!(
                    "rating {} out of range [0, 10]",
                    rating
                )));
            }
        }
        let slug = match self.slug {
            Some(s) if !s.trim().is_empty() => s,
            _ => slugify(&self.title),
        };
        Ok(queries::MovieParams {
            title: self.title,
            original_title: self.original_title,
            slug,
            description: self.description,
            release_date: self.release_date,
            duration_minutes: self.duration_minutes,
            rating: self.rating,
            director: self.director,
            category_id: self.category_id,
            is_active: self.is_active,
        })
    }
}

// ---------------------------------------------------------------------------
// Category handlers
// ---------------------------------------------------------------------------

/// List movie categories.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Movies",
    params(CategoryListQuery),
    responses(
        (status = 200, description = "List of categories", body = Vec<CategoryResponse>),
    )
)]
pub async fn list_categories(
    State(pool): State<PgPool>,
    Query(query): Query<CategoryListQuery>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = queries::list_categories(&pool, query.is_active).await?;
    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

/// Get a category by id.
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    tag = "Movies",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "The category", body = CategoryResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
    )
)]
pub async fn get_category(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryResponse>, AppError> {
    let category = queries::get_category(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;
    Ok(Json(category.into()))
}

/// Create a category.
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "Movies",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Duplicate slug/name or invalid field", body = ErrorResponse),
    )
)]
pub async fn create_category(
    State(pool): State<PgPool>,
    Json(request): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), AppError> {
    let category = queries::insert_category(&pool, request.into_params()?).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Update a category in place.
#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    tag = "Movies",
    params(("id" = i64, Path, description = "Category id")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 400, description = "Duplicate slug/name or invalid field", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
    )
)]
pub async fn update_category(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    let category = queries::update_category(&pool, id, request.into_params()?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;
    Ok(Json(category.into()))
}

// ---------------------------------------------------------------------------
// Movie handlers
// ---------------------------------------------------------------------------

/// List movies.
#[utoipa::path(
    get,
    path = "/api/v1/movies",
    tag = "Movies",
    params(MovieListQuery),
    responses(
        (status = 200, description = "List of movies", body = Vec<MovieResponse>),
    )
)]
pub async fn list_movies(
    State(pool): State<PgPool>,
    Query(query): Query<MovieListQuery>,
) -> Result<Json<Vec<MovieResponse>>, AppError> {
    let movies = queries::list_movies(&pool, query.is_active, query.category_id).await?;
    Ok(Json(movies.into_iter().map(MovieResponse::from).collect()))
}

/// Get a movie by id.
#[utoipa::path(
    get,
    path = "/api/v1/movies/{id}",
    tag = "Movies",
    params(("id" = i64, Path, description = "Movie id")),
    responses(
        (status = 200, description = "The movie", body = MovieResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse),
    )
)]
pub async fn get_movie(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<Json<MovieResponse>, AppError> {
    let movie = queries::get_movie(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))?;
    Ok(Json(movie.into()))
}

/// Create a movie.
#[utoipa::path(
    post,
    path = "/api/v1/movies",
    tag = "Movies",
    request_body = MovieRequest,
    responses(
        (status = 201, description = "Movie created", body = MovieResponse),
        (status = 400, description = "Duplicate slug or out-of-range field", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
    )
)]
pub async fn create_movie(
    State(pool): State<PgPool>,
    Json(request): Json<MovieRequest>,
) -> Result<(StatusCode, Json<MovieResponse>), AppError> {
    let params = request.into_params()?;
    // Verify the category exists first so a bad reference is a 404, not a
    // raw FK violation.
    queries::get_category(&pool, params.category_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", params.category_id)))?;

    let movie = queries::insert_movie(&pool, params).await?;
    Ok((StatusCode::CREATED, Json(movie.into())))
}

/// Update a movie in place.
#[utoipa::path(
    put,
    path = "/api/v1/movies/{id}",
    tag = "Movies",
    params(("id" = i64, Path, description = "Movie id")),
    request_body = MovieRequest,
    responses(
        (status = 200, description = "Movie updated", body = MovieResponse),
        (status = 400, description = "Duplicate slug or out-of-range field", body = ErrorResponse),
        (status = 404, description = "Movie or category not found", body = ErrorResponse),
    )
)]
pub async fn update_movie(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(request): Json<MovieRequest>,
) -> Result<Json<MovieResponse>, AppError> {
    let params = request.into_params()?;
    queries::get_category(&pool, params.category_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", params.category_id)))?;

    let movie = queries::update_movie(&pool, id, params)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))?;
    Ok(Json(movie.into()))
}

/// Take the next active movie.
///
/// Returns the first active movie by insertion order and deactivates it in
/// the same atomic statement, so repeated calls walk through the active
/// set and concurrent calls never see the same movie.
#[utoipa::path(
    get,
    path = "/api/v1/active-movie",
    tag = "Movies",
    responses(
        (status = 200, description = "The movie that was active (now deactivated)", body = MovieResponse),
        (status = 404, description = "No active movies left", body = ErrorResponse),
    )
)]
pub async fn take_active_movie(
    State(pool): State<PgPool>,
) -> Result<Json<MovieResponse>, AppError> {
    let movie = queries::take_next_active_movie(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("NO MOVIES".to_string()))?;
    Ok(Json(movie.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_movie() -> models::Movie {
        models::Movie {
            id: 7,
            title: "Inception".to_string(),
            original_title: "".to_string(),
            slug: "inception".to_string(),
            description: "Dreams within dreams".to_string(),
            release_date: chrono::NaiveDate::from_ymd_opt(2010, 7, 16),
            duration_minutes: Some(148),
            rating: Some(Decimal::new(88, 1)),
            director: "Christopher Nolan".to_string(),
            category_id: 1,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_movie_response_mapping() {
        let response = MovieResponse::from(sample_movie());
        assert_eq!(response.id, 7);
        assert_eq!(response.rating, Some(8.8));
        assert_eq!(response.release_date.as_deref(), Some("2010-07-16"));
        assert!(response.created_at.starts_with("2025-06-01T12:00:00"));
    }

    #[test]
    fn test_movie_request_slug_derived_from_title() {
        let request = MovieRequest {
            title: "The Dark Knight".to_string(),
            original_title: String::new(),
            slug: None,
            description: String::new(),
            release_date: None,
            duration_minutes: None,
            rating: None,
            director: String::new(),
            category_id: 1,
            is_active: true,
        };
        let params = request.into_params().unwrap();
        assert_eq!(params.slug, "the-dark-knight");
    }

    #[test]
    fn test_movie_request_rejects_bad_duration() {
        let request = MovieRequest {
            title: "Too Long".to_string(),
            original_title: String::new(),
            slug: None,
            description: String::new(),
            release_date: None,
            duration_minutes: Some(601),
            rating: None,
            director: String::new(),
            category_id: 1,
            is_active: true,
        };
        assert!(matches!(
            request.into_params(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_movie_request_rejects_bad_rating() {
        let request = MovieRequest {
            title: "Overrated".to_string(),
            original_title: String::new(),
            slug: None,
            description: String::new(),
            release_date: None,
            duration_minutes: None,
            rating: Some(Decimal::new(105, 1)),
            director: String::new(),
            category_id: 1,
            is_active: true,
        };
        assert!(matches!(
            request.into_params(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_category_request_rejects_empty_name() {
        let request = CategoryRequest {
            name: "  ".to_string(),
            slug: None,
            description: String::new(),
            is_active: true,
        };
        assert!(matches!(
            request.into_params(),
            Err(AppError::Validation(_))
        ));
    }
}
