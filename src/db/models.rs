use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// A movie genre/category. Movies reference exactly one category.
#[derive(Debug, Clone, FromRow)]
pub struct MovieCategory {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A movie. `category_id` is delete-protected at the schema level.
#[derive(Debug, Clone, FromRow)]
pub struct Movie {
    pub id: i64,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub biography: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub nationality: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub author_id: i64,
    pub publication_date: Option<NaiveDate>,
    pub isbn: String,
    pub page_count: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One persisted weather observation. Created exclusively by the ingestion
/// job, never mutated afterwards; removed only by the retention purge.
#[derive(Debug, Clone, FromRow)]
pub struct WeatherRecord {
    pub id: i64,
    pub city_name: String,
    pub country_code: String,
    pub longitude: f64,
    pub latitude: f64,
    pub weather_id: i32,
    pub weather_main: String,
    pub weather_description: String,
    pub weather_icon: String,
    /// Kelvin, as reported by the provider.
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// hPa.
    pub pressure: i32,
    /// Percent.
    pub humidity: i32,
    /// Metres; absent when the provider omits it.
    pub visibility: Option<i32>,
    /// Metres per second.
    pub wind_speed: f64,
    /// Degrees.
    pub wind_degree: i32,
    pub wind_gust: Option<f64>,
    /// Percent cloud cover.
    pub clouds: i32,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    /// Observation time reported by the provider.
    pub api_timestamp: DateTime<Utc>,
    /// Seconds from UTC at the observed location.
    pub timezone_offset: i32,
    pub created_at: DateTime<Utc>,
}

/// Candidate weather record, built from a provider observation and
/// validated before it is allowed anywhere near the database.
#[derive(Debug, Clone)]
pub struct NewWeatherRecord {
    pub city_name: String,
    pub country_code: String,
    pub longitude: f64,
    pub latitude: f64,
    pub weather_id: i32,
    pub weather_main: String,
    pub weather_description: String,
    pub weather_icon: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i32,
    pub humidity: i32,
    pub visibility: Option<i32>,
    pub wind_speed: f64,
    pub wind_degree: i32,
    pub wind_gust: Option<f64>,
    pub clouds: i32,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub api_timestamp: DateTime<Utc>,
    pub timezone_offset: i32,
}

impl NewWeatherRecord {
    /// Check every numeric range the record must satisfy, plus the
    /// temperature ordering invariant. Returns the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("longitude {} out of range [-180, 180]", self.longitude));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} out of range [-90, 90]", self.latitude));
        }
        if !(800..=1100).contains(&self.pressure) {
            return Err(format!("pressure {} hPa out of range [800, 1100]", self.pressure));
        }
        if !(0..=100).contains(&self.humidity) {
            return Err(format!("humidity {}% out of range [0, 100]", self.humidity));
        }
        if self.wind_speed < 0.0 {
            return Err(format!("wind speed {} m/s is negative", self.wind_speed));
        }
        if !(0..=360).contains(&self.wind_degree) {
            return Err(format!("wind degree {} out of range [0, 360]", self.wind_degree));
        }
        if let Some(gust) = self.wind_gust {
            if gust < 0.0 {
                return Err(format!("wind gust {} m/s is negative", gust));
            }
        }
        if let Some(vis) = self.visibility {
            if vis < 0 {
                return Err(format!("visibility {} m is negative", vis));
            }
        }
        if !(0..=100).contains(&self.clouds) {
            return Err(format!("cloudiness {}% out of range [0, 100]", self.clouds));
        }
        if self.temp_min > self.temperature || self.temperature > self.temp_max {
            return Err(format!(
                "temperature ordering violated: temp_min {} <= temperature {} <= temp_max {} does not hold",
                self.temp_min, self.temperature, self.temp_max
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> NewWeatherRecord {
        NewWeatherRecord {
            city_name: "Moscow".to_string(),
            country_code: "RU".to_string(),
            longitude: 37.61,
            latitude: 55.75,
            weather_id: 800,
            weather_main: "Clear".to_string(),
            weather_description: "clear sky".to_string(),
            weather_icon: "01d".to_string(),
            temperature: 290.0,
            feels_like: 288.5,
            temp_min: 288.0,
            temp_max: 292.0,
            pressure: 1015,
            humidity: 60,
            visibility: Some(10000),
            wind_speed: 3.5,
            wind_degree: 180,
            wind_gust: Some(6.0),
            clouds: 20,
            sunrise: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            sunset: DateTime::from_timestamp(1_700_040_000, 0).unwrap(),
            api_timestamp: DateTime::from_timestamp(1_700_020_000, 0).unwrap(),
            timezone_offset: 10800,
        }
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(valid_record().validate().is_ok());
    }

    #[test]
    fn test_longitude_out_of_range() {
        let mut r = valid_record();
        r.longitude = 181.0;
        assert!(r.validate().unwrap_err().contains("longitude"));
    }

    #[test]
    fn test_latitude_out_of_range() {
        let mut r = valid_record();
        r.latitude = -90.5;
        assert!(r.validate().unwrap_err().contains("latitude"));
    }

    #[test]
    fn test_pressure_too_low() {
        let mut r = valid_record();
        r.pressure = 799;
        assert!(r.validate().unwrap_err().contains("pressure"));
    }

    #[test]
    fn test_pressure_too_high() {
        let mut r = valid_record();
        r.pressure = 1101;
        assert!(r.validate().unwrap_err().contains("pressure"));
    }

    #[test]
    fn test_humidity_out_of_range() {
        let mut r = valid_record();
        r.humidity = 101;
        assert!(r.validate().unwrap_err().contains("humidity"));
    }

    #[test]
    fn test_negative_wind_speed() {
        let mut r = valid_record();
        r.wind_speed = -0.1;
        assert!(r.validate().unwrap_err().contains("wind speed"));
    }

    #[test]
    fn test_wind_degree_out_of_range() {
        let mut r = valid_record();
        r.wind_degree = 361;
        assert!(r.validate().unwrap_err().contains("wind degree"));
    }

    #[test]
    fn test_negative_gust_rejected_but_none_allowed() {
        let mut r = valid_record();
        r.wind_gust = Some(-1.0);
        assert!(r.validate().is_err());
        r.wind_gust = None;
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_clouds_out_of_range() {
        let mut r = valid_record();
        r.clouds = 120;
        assert!(r.validate().unwrap_err().contains("cloudiness"));
    }

    #[test]
    fn test_temperature_below_min_rejected() {
        let mut r = valid_record();
        r.temperature = 287.9; // below temp_min 288.0
        assert!(r.validate().unwrap_err().contains("temperature ordering"));
    }

    #[test]
    fn test_temperature_above_max_rejected() {
        let mut r = valid_record();
        r.temperature = 292.1; // above temp_max 292.0
        assert!(r.validate().unwrap_err().contains("temperature ordering"));
    }

    #[test]
    fn test_temperature_at_bounds_accepted() {
        let mut r = valid_record();
        r.temperature = r.temp_min;
        assert!(r.validate().is_ok());
        r.temperature = r.temp_max;
        assert!(r.validate().is_ok());
    }
}
