use axum::routing::{get, post};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::health::HealthState;
use routes::weather::WeatherState;
use services::owm::OwmClient;
use services::scheduler::{JobGuard, JobRegistry, WEEKLY};

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 2;

/// Catalog API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "0.1.0",
        description = "Catalog management backend for movies, categories, authors and \
            books, plus a recurring weather-ingestion job that fetches observations \
            from OpenWeatherMap, validates them and keeps a 30-day history.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Movies", description = "Movie and category management"),
        (name = "Library", description = "Author and book management"),
        (name = "Weather", description = "Weather observations and manual job triggers"),
        (name = "Jobs", description = "Background job scheduler status"),
    ),
    paths(
        routes::health::health_check,
        routes::movies::list_categories,
        routes::movies::get_category,
        routes::movies::create_category,
        routes::movies::update_category,
        routes::movies::list_movies,
        routes::movies::get_movie,
        routes::movies::create_movie,
        routes::movies::update_movie,
        routes::movies::take_active_movie,
        routes::library::list_authors,
        routes::library::get_author,
        routes::library::get_author_books,
        routes::library::create_author,
        routes::library::update_author,
        routes::library::list_books,
        routes::library::get_book,
        routes::library::create_book,
        routes::library::update_book,
        routes::weather::list_weather,
        routes::weather::get_latest_weather,
        routes::weather::trigger_fetch,
        routes::weather::trigger_purge,
        routes::jobs::get_jobs_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::movies::CategoryResponse,
            routes::movies::CategoryRequest,
            routes::movies::MovieResponse,
            routes::movies::MovieRequest,
            routes::library::AuthorResponse,
            routes::library::AuthorRequest,
            routes::library::BookResponse,
            routes::library::BookRequest,
            routes::weather::WeatherResponse,
            routes::weather::PurgeResponse,
            services::ingest::IngestReport,
            services::scheduler::JobStatus,
            services::scheduler::RegistryState,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Set up database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Seed the demo catalog when asked to (safe to repeat)
    if config.seed_demo_data {
        if let Err(e) = db::seed::seed_demo_data(&pool).await {
            tracing::error!("Failed to seed demo data: {}", e);
        }
    }

    if !config.has_api_key() {
        tracing::warn!(
            "OPENWEATHER_API_KEY is not set; scheduled weather fetches will fail until it is"
        );
    }

    // Create OpenWeatherMap client
    let owm_client = OwmClient::new(&config.openweather_api_key);

    // In-flight guards, shared between the scheduler and the manual triggers
    let fetch_guard = JobGuard::new();
    let purge_guard = JobGuard::new();

    // Register and start the recurring jobs
    let mut registry = JobRegistry::new();
    {
        let pool = pool.clone();
        let client = owm_client.clone();
        let config = config.clone();
        registry.register(
            "fetch_weather",
            config.weather_fetch_interval,
            fetch_guard.clone(),
            move || {
                let pool = pool.clone();
                let client = client.clone();
                let config = config.clone();
                async move {
                    let report = services::ingest::run(&pool, &client, &config).await;
                    if report.success {
                        Ok(report.message)
                    } else {
                        Err(report.message)
                    }
                }
            },
        );
    }
    {
        let pool = pool.clone();
        let retention_days = config.weather_retention_days;
        registry.register(
            "purge_weather_records",
            WEEKLY,
            purge_guard.clone(),
            move || {
                let pool = pool.clone();
                async move {
                    match services::ingest::purge_older_than(
                        &pool,
                        chrono::Duration::days(retention_days),
                    )
                    .await
                    {
                        Ok(n) => Ok(format!("purged {} record(s)", n)),
                        Err(e) => Err(format!("purge failed: {}", e)),
                    }
                }
            },
        );
    }
    registry.start().await;
    let jobs_state = registry.state();

    // Build shared state for weather endpoints
    let weather_state = WeatherState {
        pool: pool.clone(),
        client: owm_client,
        config: config.clone(),
        fetch_guard,
        purge_guard,
    };

    // CORS — read/write JSON API; no cookies or auth headers involved
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
        ])
        .allow_headers(Any);

    // Build router
    // Catalog routes use PgPool state directly; weather routes use WeatherState.
    let catalog_routes = Router::new()
        .route(
            "/api/v1/categories",
            get(routes::movies::list_categories).post(routes::movies::create_category),
        )
        .route(
            "/api/v1/categories/:id",
            get(routes::movies::get_category).put(routes::movies::update_category),
        )
        .route(
            "/api/v1/movies",
            get(routes::movies::list_movies).post(routes::movies::create_movie),
        )
        .route(
            "/api/v1/movies/:id",
            get(routes::movies::get_movie).put(routes::movies::update_movie),
        )
        // Distinct prefix: a static segment beside /movies/:id would
        // conflict in the route tree.
        .route(
            "/api/v1/active-movie",
            get(routes::movies::take_active_movie),
        )
        .route(
            "/api/v1/authors",
            get(routes::library::list_authors).post(routes::library::create_author),
        )
        .route(
            "/api/v1/authors/:id",
            get(routes::library::get_author).put(routes::library::update_author),
        )
        .route(
            "/api/v1/authors/:id/books",
            get(routes::library::get_author_books),
        )
        .route(
            "/api/v1/books",
            get(routes::library::list_books).post(routes::library::create_book),
        )
        .route(
            "/api/v1/books/:id",
            get(routes::library::get_book).put(routes::library::update_book),
        )
        .with_state(pool.clone());

    let weather_routes = Router::new()
        .route("/api/v1/weather", get(routes::weather::list_weather))
        .route("/api/v1/weather/latest", get(routes::weather::get_latest_weather))
        .route("/api/v1/weather/fetch", post(routes::weather::trigger_fetch))
        .route("/api/v1/weather/purge", post(routes::weather::trigger_purge))
        .with_state(weather_state);

    // Health check probes the DB and reads the registry's running flag
    let health_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(HealthState {
            pool,
            jobs: jobs_state.clone(),
        });

    // Scheduler status uses SharedRegistryState
    let jobs_routes = Router::new()
        .route("/api/v1/jobs/status", get(routes::jobs::get_jobs_status))
        .with_state(jobs_state);

    let app = Router::new()
        .merge(health_routes)
        .merge(catalog_routes)
        .merge(weather_routes)
        .merge(jobs_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server terminated unexpectedly");

    // Stop the job loops; a run already in flight finishes its single
    // atomic write before the task exits.
    registry.shutdown().await;
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
