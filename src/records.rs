use serde::Deserialize;

/// A measurement as the upstream returns it: sometimes a number, sometimes a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
}

impl Reading {
    /// Upstream feeds use `-99`/`-999`, blanks and dashes for "no data".
    pub fn is_missing(&self) -> bool {
        match self {
            Reading::Number(n) => *n <= -99.0,
            Reading::Text(s) => {
                let s = s.trim();
                s.is_empty()
                    || s == "-"
                    || s == "ND"
                    || s.parse::<f64>().is_ok_and(|n| n <= -99.0)
            }
        }
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reading::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Reading::Number(n) => write!(f, "{}", n),
            Reading::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

/// An observation station with its latest readings.
#[derive(Debug, Clone, Deserialize)]
pub struct StationRecord {
    #[serde(alias = "locationName")]
    pub name: String,
    #[serde(default, alias = "COUNTY", alias = "CITY")]
    pub county: Option<String>,
    #[serde(default, alias = "TOWN")]
    pub town: Option<String>,
    #[serde(default, alias = "obsTime")]
    pub time: Option<String>,
    #[serde(default, alias = "TEMP")]
    pub temperature: Option<Reading>,
    #[serde(default, alias = "HUMD")]
    pub humidity: Option<Reading>,
    #[serde(default, alias = "WDSD")]
    pub wind_speed: Option<Reading>,
    #[serde(default, alias = "WDIR")]
    pub wind_direction: Option<Reading>,
    #[serde(default, alias = "PRES")]
    pub pressure: Option<Reading>,
    #[serde(default, alias = "H_24R")]
    pub rain: Option<Reading>,
}

/// An air-quality monitoring site from the EPA feed.
#[derive(Debug, Clone, Deserialize)]
pub struct AirRecord {
    #[serde(rename = "SiteName")]
    pub site_name: String,
    #[serde(rename = "County", default)]
    pub county: Option<String>,
    #[serde(rename = "AQI", default)]
    pub aqi: Option<Reading>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Pollutant", default)]
    pub pollutant: Option<String>,
    #[serde(rename = "PM25", alias = "PM2.5", default)]
    pub pm25: Option<Reading>,
    #[serde(rename = "PM10", default)]
    pub pm10: Option<Reading>,
    #[serde(rename = "O3", default)]
    pub o3: Option<Reading>,
    #[serde(rename = "PublishTime", default)]
    pub publish_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AirFeed {
    #[serde(rename = "Data", default)]
    pub data: Vec<AirRecord>,
}

/// Air quality for a city abroad.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignAirRecord {
    /// Display name from the keyword table.
    pub city: String,
    /// Station name reported by the provider.
    pub station: Option<String>,
    pub aqi: Option<Reading>,
    pub pm25: Option<Reading>,
    pub pm10: Option<Reading>,
    pub o3: Option<Reading>,
    pub time: Option<String>,
}

/// One area's forecast for the nearest period.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub area: String,
    pub time: String,
    pub weather_description: String,
    pub feeling_description: Option<String>,
    pub max_temp: String,
    pub min_temp: String,
    pub rain_probability: Option<String>,
}

/// The most recent significant earthquake report.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeReport {
    pub number: String,
    pub image_url: String,
}
