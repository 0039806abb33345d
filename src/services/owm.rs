//! OpenWeatherMap current-weather client.
//!
//! Performs one HTTP GET per call with a hard timeout, parses the JSON
//! body into typed structs, and maps the fields onto the weather-record
//! shape. Missing optional fields substitute zero/empty defaults;
//! `wind.gust` and `visibility` stay absent when the provider omits them.
//! See: https://openweathermap.org/current

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::db::models::NewWeatherRecord;
use crate::errors::FetchError;

const OWM_API_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Hard bound on a single provider request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the OpenWeatherMap current-weather API.
#[derive(Debug, Clone)]
pub struct OwmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

// --- OpenWeatherMap JSON response types ---

#[derive(Debug, Deserialize)]
struct OwmResponse {
    /// Provider status code; 200 in the body means "ok". Arrives as a
    /// number on success and as a string in some error payloads.
    #[serde(default, deserialize_with = "de_cod")]
    cod: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    coord: OwmCoord,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    main: OwmMain,
    #[serde(default)]
    visibility: Option<i32>,
    #[serde(default)]
    wind: OwmWind,
    #[serde(default)]
    clouds: OwmClouds,
    #[serde(default)]
    sys: OwmSys,
    #[serde(default)]
    dt: i64,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Default, Deserialize)]
struct OwmCoord {
    #[serde(default)]
    lon: f64,
    #[serde(default)]
    lat: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    #[serde(default)]
    id: i32,
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwmMain {
    #[serde(default)]
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    temp_min: f64,
    #[serde(default)]
    temp_max: f64,
    #[serde(default)]
    pressure: i32,
    #[serde(default)]
    humidity: i32,
}

#[derive(Debug, Default, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: i32,
    #[serde(default)]
    gust: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwmClouds {
    #[serde(default)]
    all: i32,
}

#[derive(Debug, Default, Deserialize)]
struct OwmSys {
    #[serde(default)]
    country: String,
    #[serde(default)]
    sunrise: i64,
    #[serde(default)]
    sunset: i64,
}

/// The provider reports `cod` as a JSON number on success and as a string
/// in some error payloads. Accept both.
fn de_cod<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Number(n) => n.as_i64().ok_or_else(|| {
            serde::de::Error::custom(format!("non-integer cod: {}", n))
        }),
        serde_json::Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("non-numeric cod: {:?}", s))),
        _ => Err(serde::de::Error::custom("unexpected cod type")),
    }
}

fn unix_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

impl OwmClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, OWM_API_URL, FETCH_TIMEOUT)
    }

    /// Client against a custom base URL and timeout (for tests).
    pub fn with_base_url(api_key: &str, base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        }
    }

    /// Fetch the current observation for a fixed location.
    ///
    /// One GET, no retries. Any failure mode (network, timeout, non-2xx
    /// status, provider error code, malformed body) comes back as a tagged
    /// `FetchError` with a human-readable reason.
    pub async fn fetch_current(&self, lat: f64, lon: f64) -> Result<NewWeatherRecord, FetchError> {
        let url = format!(
            "{}/weather?lat={}&lon={}&appid={}",
            self.base_url, lat, lon, self.api_key
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Network("request to OpenWeatherMap timed out".to_string())
            } else {
                FetchError::Network(format!("request to OpenWeatherMap failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies usually carry a "message" field worth surfacing.
            let detail = match response.text().await {
                Ok(body) => serde_json::from_str::<OwmResponse>(&body)
                    .ok()
                    .and_then(|r| r.message)
                    .unwrap_or_else(|| status.to_string()),
                Err(_) => status.to_string(),
            };
            return Err(FetchError::Provider {
                status: Some(status.as_u16()),
                detail,
            });
        }

        let body: OwmResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(format!("malformed OpenWeatherMap response: {}", e)))?;

        parse_observation(body)
    }
}

/// Map a provider payload onto the weather-record shape.
fn parse_observation(body: OwmResponse) -> Result<NewWeatherRecord, FetchError> {
    if body.cod != 200 {
        return Err(FetchError::Provider {
            status: None,
            detail: format!(
                "provider returned code {}: {}",
                body.cod,
                body.message.unwrap_or_else(|| "Unknown error".to_string())
            ),
        });
    }

    let condition = body.weather.first();

    Ok(NewWeatherRecord {
        city_name: body.name,
        country_code: body.sys.country,
        longitude: body.coord.lon,
        latitude: body.coord.lat,
        weather_id: condition.map(|c| c.id).unwrap_or(0),
        weather_main: condition.map(|c| c.main.clone()).unwrap_or_default(),
        weather_description: condition.map(|c| c.description.clone()).unwrap_or_default(),
        weather_icon: condition.map(|c| c.icon.clone()).unwrap_or_default(),
        temperature: body.main.temp,
        feels_like: body.main.feels_like,
        temp_min: body.main.temp_min,
        temp_max: body.main.temp_max,
        pressure: body.main.pressure,
        humidity: body.main.humidity,
        visibility: body.visibility,
        wind_speed: body.wind.speed,
        wind_degree: body.wind.deg,
        wind_gust: body.wind.gust,
        clouds: body.clouds.all,
        sunrise: unix_to_datetime(body.sys.sunrise),
        sunset: unix_to_datetime(body.sys.sunset),
        api_timestamp: unix_to_datetime(body.dt),
        timezone_offset: body.timezone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn full_payload() -> serde_json::Value {
        serde_json::json!({
            "coord": { "lon": 37.61, "lat": 55.75 },
            "weather": [
                { "id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d" }
            ],
            "main": {
                "temp": 280.32,
                "feels_like": 277.1,
                "temp_min": 279.15,
                "temp_max": 281.15,
                "pressure": 1012,
                "humidity": 81
            },
            "visibility": 10000,
            "wind": { "speed": 4.1, "deg": 80, "gust": 7.2 },
            "clouds": { "all": 75 },
            "dt": 1700000000,
            "sys": { "country": "RU", "sunrise": 1699990000, "sunset": 1700020000 },
            "timezone": 10800,
            "name": "Moscow",
            "cod": 200
        })
    }

    #[test]
    fn test_parse_full_payload() {
        let body: OwmResponse = serde_json::from_value(full_payload()).unwrap();
        let record = parse_observation(body).unwrap();

        assert_eq!(record.city_name, "Moscow");
        assert_eq!(record.country_code, "RU");
        assert_eq!(record.longitude, 37.61);
        assert_eq!(record.latitude, 55.75);
        assert_eq!(record.weather_id, 803);
        assert_eq!(record.weather_main, "Clouds");
        assert_eq!(record.temperature, 280.32);
        assert_eq!(record.pressure, 1012);
        assert_eq!(record.humidity, 81);
        assert_eq!(record.visibility, Some(10000));
        assert_eq!(record.wind_gust, Some(7.2));
        assert_eq!(record.clouds, 75);
        assert_eq!(record.api_timestamp.timestamp(), 1700000000);
        assert_eq!(record.sunrise.timestamp(), 1699990000);
        assert_eq!(record.timezone_offset, 10800);
    }

    #[test]
    fn test_parse_missing_optionals_substitutes_defaults() {
        let body: OwmResponse = serde_json::from_value(serde_json::json!({
            "cod": 200,
            "name": "Nowhere",
            "main": { "temp": 290.0, "feels_like": 289.0, "temp_min": 290.0, "temp_max": 290.0,
                      "pressure": 1000, "humidity": 50 },
            "dt": 1700000000
        }))
        .unwrap();
        let record = parse_observation(body).unwrap();

        assert_eq!(record.country_code, "");
        assert_eq!(record.weather_id, 0);
        assert_eq!(record.weather_main, "");
        assert_eq!(record.visibility, None);
        assert_eq!(record.wind_gust, None);
        assert_eq!(record.wind_speed, 0.0);
        assert_eq!(record.wind_degree, 0);
        assert_eq!(record.clouds, 0);
        assert_eq!(record.sunrise.timestamp(), 0);
    }

    #[test]
    fn test_provider_error_code_in_body() {
        let body: OwmResponse = serde_json::from_value(serde_json::json!({
            "cod": 429,
            "message": "Your account is temporarily blocked"
        }))
        .unwrap();
        let err = parse_observation(body).unwrap_err();
        match err {
            FetchError::Provider { status, detail } => {
                assert_eq!(status, None);
                assert!(detail.contains("429"));
                assert!(detail.contains("temporarily blocked"));
            }
            other => panic!("expected Provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_cod_as_string_accepted() {
        let body: OwmResponse =
            serde_json::from_value(serde_json::json!({ "cod": "404", "message": "city not found" }))
                .unwrap();
        let err = parse_observation(body).unwrap_err();
        assert!(matches!(err, FetchError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_fetch_current_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "55.75"))
            .and(query_param("lon", "37.61"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_payload()))
            .mount(&server)
            .await;

        let client = OwmClient::with_base_url("test-key", &server.uri(), Duration::from_secs(2));
        let record = client.fetch_current(55.75, 37.61).await.unwrap();
        assert_eq!(record.city_name, "Moscow");
        assert_eq!(record.temperature, 280.32);
    }

    #[tokio::test]
    async fn test_fetch_current_http_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "cod": 401,
                "message": "Invalid API key"
            })))
            .mount(&server)
            .await;

        let client = OwmClient::with_base_url("bad-key", &server.uri(), Duration::from_secs(2));
        let err = client.fetch_current(55.75, 37.61).await.unwrap_err();
        match err {
            FetchError::Provider { status, detail } => {
                assert_eq!(status, Some(401));
                assert_eq!(detail, "Invalid API key");
            }
            other => panic!("expected Provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_current_timeout_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(full_payload())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client =
            OwmClient::with_base_url("test-key", &server.uri(), Duration::from_millis(200));
        let start = std::time::Instant::now();
        let err = client.fetch_current(55.75, 37.61).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        assert!(
            start.elapsed() < Duration::from_secs(3),
            "timeout must bound the request well below the mock delay"
        );
    }

    #[tokio::test]
    async fn test_fetch_current_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
            .mount(&server)
            .await;

        let client = OwmClient::with_base_url("test-key", &server.uri(), Duration::from_secs(2));
        let err = client.fetch_current(55.75, 37.61).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
