use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::models::{Author, Book, Movie, MovieCategory, NewWeatherRecord, WeatherRecord};

// ---------------------------------------------------------------------------
// Movie categories
// ---------------------------------------------------------------------------

/// Fields accepted when creating or updating a movie category.
pub struct CategoryParams {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub is_active: bool,
}

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, is_active, created_at, updated_at";

/// List categories, optionally filtered by active flag.
pub async fn list_categories(
    pool: &PgPool,
    is_active: Option<bool>,
) -> Result<Vec<MovieCategory>, sqlx::Error> {
    sqlx::query_as::<_, MovieCategory>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM movie_categories
         WHERE ($1::boolean IS NULL OR is_active = $1)
         ORDER BY name",
    ))
    .bind(is_active)
    .fetch_all(pool)
    .await
}

pub async fn get_category(pool: &PgPool, id: i64) -> Result<Option<MovieCategory>, sqlx::Error> {
    sqlx::query_as::<_, MovieCategory>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM movie_categories WHERE id = $1",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_category(
    pool: &PgPool,
    params: CategoryParams,
) -> Result<MovieCategory, sqlx::Error> {
    sqlx::query_as::<_, MovieCategory>(&format!(
        "INSERT INTO movie_categories (name, slug, description, is_active)
         VALUES ($1, $2, $3, $4)
         RETURNING {CATEGORY_COLUMNS}",
    ))
    .bind(&params.name)
    .bind(&params.slug)
    .bind(&params.description)
    .bind(params.is_active)
    .fetch_one(pool)
    .await
}

/// Update a category in place. Returns None when the id does not exist.
pub async fn update_category(
    pool: &PgPool,
    id: i64,
    params: CategoryParams,
) -> Result<Option<MovieCategory>, sqlx::Error> {
    sqlx::query_as::<_, MovieCategory>(&format!(
        "UPDATE movie_categories
         SET name = $2, slug = $3, description = $4, is_active = $5, updated_at = NOW()
         WHERE id = $1
         RETURNING {CATEGORY_COLUMNS}",
    ))
    .bind(id)
    .bind(&params.name)
    .bind(&params.slug)
    .bind(&params.description)
    .bind(params.is_active)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Movies
// ---------------------------------------------------------------------------

pub struct MovieParams {
    pub title: String,
    pub original_title: String,
    pub slug: String,
    pub description: String,
    pub release_date: Option<NaiveDate>,
    pub duration_minutes: Option<i32>,
    pub rating: Option<Decimal>,
    pub director: String,
    pub category_id: i64,
    pub is_active: bool,
}

const MOVIE_COLUMNS: &str = "id, title, original_title, slug, description, release_date, \
     duration_minutes, rating, director, category_id, is_active, created_at, updated_at";

/// List movies, optionally filtered by active flag and/or category.
pub async fn list_movies(
    pool: &PgPool,
    is_active: Option<bool>,
    category_id: Option<i64>,
) -> Result<Vec<Movie>, sqlx::Error> {
    sqlx::query_as::<_, Movie>(&format!(
        "SELECT {MOVIE_COLUMNS} FROM movies
         WHERE ($1::boolean IS NULL OR is_active = $1)
           AND ($2::bigint IS NULL OR category_id = $2)
         ORDER BY release_date DESC NULLS LAST, title",
    ))
    .bind(is_active)
    .bind(category_id)
    .fetch_all(pool)
    .await
}

pub async fn get_movie(pool: &PgPool, id: i64) -> Result<Option<Movie>, sqlx::Error> {
    sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_movie(pool: &PgPool, params: MovieParams) -> Result<Movie, sqlx::Error> {
    sqlx::query_as::<_, Movie>(&format!(
        "INSERT INTO movies (title, original_title, slug, description, release_date,
                             duration_minutes, rating, director, category_id, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {MOVIE_COLUMNS}",
    ))
    .bind(&params.title)
    .bind(&params.original_title)
    .bind(&params.slug)
    .bind(&params.description)
    .bind(params.release_date)
    .bind(params.duration_minutes)
    .bind(params.rating)
    .bind(&params.director)
    .bind(params.category_id)
    .bind(params.is_active)
    .fetch_one(pool)
    .await
}

/// Update a movie in place. Returns None when the id does not exist.
pub async fn update_movie(
    pool: &PgPool,
    id: i64,
    params: MovieParams,
) -> Result<Option<Movie>, sqlx::Error> {
    sqlx::query_as::<_, Movie>(&format!(
        "UPDATE movies
         SET title = $2, original_title = $3, slug = $4, description = $5,
             release_date = $6, duration_minutes = $7, rating = $8, director = $9,
             category_id = $10, is_active = $11, updated_at = NOW()
         WHERE id = $1
         RETURNING {MOVIE_COLUMNS}",
    ))
    .bind(id)
    .bind(&params.title)
    .bind(&params.original_title)
    .bind(&params.slug)
    .bind(&params.description)
    .bind(params.release_date)
    .bind(params.duration_minutes)
    .bind(params.rating)
    .bind(&params.director)
    .bind(params.category_id)
    .bind(params.is_active)
    .fetch_optional(pool)
    .await
}

/// Atomically take the next active movie: return the first active movie by
/// insertion order and flip its flag in the same statement.
///
/// The `FOR UPDATE SKIP LOCKED` subquery guarantees two concurrent callers
/// never receive the same row: the second caller skips the row locked by
/// the first and picks the next active movie (or none).
pub async fn take_next_active_movie(pool: &PgPool) -> Result<Option<Movie>, sqlx::Error> {
    sqlx::query_as::<_, Movie>(&format!(
        "UPDATE movies
         SET is_active = FALSE, updated_at = NOW()
         WHERE id = (
             SELECT id FROM movies
             WHERE is_active = TRUE
             ORDER BY created_at, id
             LIMIT 1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING {MOVIE_COLUMNS}",
    ))
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Authors
// ---------------------------------------------------------------------------

pub struct AuthorParams {
    pub first_name: String,
    pub last_name: String,
    pub biography: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub nationality: String,
    pub is_active: bool,
}

const AUTHOR_COLUMNS: &str = "id, first_name, last_name, biography, birth_date, death_date, \
     nationality, is_active, created_at, updated_at";

pub async fn list_authors(
    pool: &PgPool,
    is_active: Option<bool>,
) -> Result<Vec<Author>, sqlx::Error> {
    sqlx::query_as::<_, Author>(&format!(
        "SELECT {AUTHOR_COLUMNS} FROM authors
         WHERE ($1::boolean IS NULL OR is_active = $1)
         ORDER BY last_name, first_name",
    ))
    .bind(is_active)
    .fetch_all(pool)
    .await
}

pub async fn get_author(pool: &PgPool, id: i64) -> Result<Option<Author>, sqlx::Error> {
    sqlx::query_as::<_, Author>(&format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_author(pool: &PgPool, params: AuthorParams) -> Result<Author, sqlx::Error> {
    sqlx::query_as::<_, Author>(&format!(
        "INSERT INTO authors (first_name, last_name, biography, birth_date, death_date,
                              nationality, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {AUTHOR_COLUMNS}",
    ))
    .bind(&params.first_name)
    .bind(&params.last_name)
    .bind(&params.biography)
    .bind(params.birth_date)
    .bind(params.death_date)
    .bind(&params.nationality)
    .bind(params.is_active)
    .fetch_one(pool)
    .await
}

pub async fn update_author(
    pool: &PgPool,
    id: i64,
    params: AuthorParams,
) -> Result<Option<Author>, sqlx::Error> {
    sqlx::query_as::<_, Author>(&format!(
        "UPDATE authors
         SET first_name = $2, last_name = $3, biography = $4, birth_date = $5,
             death_date = $6, nationality = $7, is_active = $8, updated_at = NOW()
         WHERE id = $1
         RETURNING {AUTHOR_COLUMNS}",
    ))
    .bind(id)
    .bind(&params.first_name)
    .bind(&params.last_name)
    .bind(&params.biography)
    .bind(params.birth_date)
    .bind(params.death_date)
    .bind(&params.nationality)
    .bind(params.is_active)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

pub struct BookParams {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub author_id: i64,
    pub publication_date: Option<NaiveDate>,
    pub isbn: String,
    pub page_count: Option<i32>,
    pub is_active: bool,
}

const BOOK_COLUMNS: &str = "id, title, slug, description, author_id, publication_date, isbn, \
     page_count, is_active, created_at, updated_at";

pub async fn list_books(
    pool: &PgPool,
    is_active: Option<bool>,
    author_id: Option<i64>,
) -> Result<Vec<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>(&format!(
        "SELECT {BOOK_COLUMNS} FROM books
         WHERE ($1::boolean IS NULL OR is_active = $1)
           AND ($2::bigint IS NULL OR author_id = $2)
         ORDER BY title",
    ))
    .bind(is_active)
    .bind(author_id)
    .fetch_all(pool)
    .await
}

pub async fn get_book(pool: &PgPool, id: i64) -> Result<Option<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_book(pool: &PgPool, params: BookParams) -> Result<Book, sqlx::Error> {
    sqlx::query_as::<_, Book>(&format!(
        "INSERT INTO books (title, slug, description, author_id, publication_date, isbn,
                            page_count, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {BOOK_COLUMNS}",
    ))
    .bind(&params.title)
    .bind(&params.slug)
    .bind(&params.description)
    .bind(params.author_id)
    .bind(params.publication_date)
    .bind(&params.isbn)
    .bind(params.page_count)
    .bind(params.is_active)
    .fetch_one(pool)
    .await
}

pub async fn update_book(
    pool: &PgPool,
    id: i64,
    params: BookParams,
) -> Result<Option<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>(&format!(
        "UPDATE books
         SET title = $2, slug = $3, description = $4, author_id = $5,
             publication_date = $6, isbn = $7, page_count = $8, is_active = $9,
             updated_at = NOW()
         WHERE id = $1
         RETURNING {BOOK_COLUMNS}",
    ))
    .bind(id)
    .bind(&params.title)
    .bind(&params.slug)
    .bind(&params.description)
    .bind(params.author_id)
    .bind(params.publication_date)
    .bind(&params.isbn)
    .bind(params.page_count)
    .bind(params.is_active)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Weather records
// ---------------------------------------------------------------------------

const WEATHER_COLUMNS: &str = "id, city_name, country_code, longitude, latitude, weather_id, \
     weather_main, weather_description, weather_icon, temperature, feels_like, temp_min, \
     temp_max, pressure, humidity, visibility, wind_speed, wind_degree, wind_gust, clouds, \
     sunrise, sunset, api_timestamp, timezone_offset, created_at";

/// Insert one observation (append-only, single atomic statement).
pub async fn insert_weather_record(
    pool: &PgPool,
    record: &NewWeatherRecord,
) -> Result<WeatherRecord, sqlx::Error> {
    sqlx::query_as::<_, WeatherRecord>(&format!(
        "INSERT INTO weather_records (
            city_name, country_code, longitude, latitude, weather_id, weather_main,
            weather_description, weather_icon, temperature, feels_like, temp_min, temp_max,
            pressure, humidity, visibility, wind_speed, wind_degree, wind_gust, clouds,
            sunrise, sunset, api_timestamp, timezone_offset
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
            $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
        )
        RETURNING {WEATHER_COLUMNS}",
    ))
    .bind(&record.city_name)
    .bind(&record.country_code)
    .bind(record.longitude)
    .bind(record.latitude)
    .bind(record.weather_id)
    .bind(&record.weather_main)
    .bind(&record.weather_description)
    .bind(&record.weather_icon)
    .bind(record.temperature)
    .bind(record.feels_like)
    .bind(record.temp_min)
    .bind(record.temp_max)
    .bind(record.pressure)
    .bind(record.humidity)
    .bind(record.visibility)
    .bind(record.wind_speed)
    .bind(record.wind_degree)
    .bind(record.wind_gust)
    .bind(record.clouds)
    .bind(record.sunrise)
    .bind(record.sunset)
    .bind(record.api_timestamp)
    .bind(record.timezone_offset)
    .fetch_one(pool)
    .await
}

/// List observations, newest first.
pub async fn list_weather_records(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<WeatherRecord>, sqlx::Error> {
    sqlx::query_as::<_, WeatherRecord>(&format!(
        "SELECT {WEATHER_COLUMNS} FROM weather_records ORDER BY created_at DESC, id DESC LIMIT $1",
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_latest_weather_record(
    pool: &PgPool,
) -> Result<Option<WeatherRecord>, sqlx::Error> {
    sqlx::query_as::<_, WeatherRecord>(&format!(
        "SELECT {WEATHER_COLUMNS} FROM weather_records ORDER BY created_at DESC, id DESC LIMIT 1",
    ))
    .fetch_optional(pool)
    .await
}

/// Delete observations created strictly before the cutoff. Returns the
/// number of rows deleted; zero matching rows is a no-op.
pub async fn delete_weather_records_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM weather_records WHERE created_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
