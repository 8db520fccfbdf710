use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::SourcesConfig;
use crate::error::BotError;
use crate::keywords::ForeignCity;
use crate::records::{
    AirFeed, AirRecord, EarthquakeReport, ForecastRecord, ForeignAirRecord, Reading,
    StationRecord,
};

/// Two-pass lookup: an exact name match wins, otherwise the first record
/// whose name contains the query.
pub fn find_station<'a, T>(
    records: &'a [T],
    query: &str,
    name_of: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    records
        .iter()
        .find(|&r| name_of(r) == query)
        .or_else(|| records.iter().find(|&r| name_of(r).contains(query)))
}

/// `find_station`, reporting a miss as `BotError::NoMatchFound`.
pub fn require_station<'a, T>(
    records: &'a [T],
    query: &str,
    name_of: impl Fn(&T) -> &str,
) -> Result<&'a T, BotError> {
    find_station(records, query, name_of).ok_or_else(|| BotError::NoMatchFound(query.to_string()))
}

/// Collapse the regional bulletin's markup into plain text.
pub fn clean_overview(raw: &str) -> String {
    let text = raw.replace("<BR>", "\n");
    match text.find("<div") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}

// -- Open-data forecast payload --

#[derive(Debug, Deserialize)]
struct ForecastFeed {
    records: ForecastLocations,
}

#[derive(Debug, Deserialize)]
struct ForecastLocations {
    #[serde(default)]
    location: Vec<ForecastLocation>,
}

#[derive(Debug, Deserialize)]
struct ForecastLocation {
    #[serde(rename = "locationName")]
    location_name: String,
    #[serde(rename = "weatherElement", default)]
    weather_element: Vec<WeatherElement>,
}

#[derive(Debug, Deserialize)]
struct WeatherElement {
    #[serde(rename = "elementName")]
    element_name: String,
    #[serde(default)]
    time: Vec<ElementSlot>,
}

#[derive(Debug, Deserialize)]
struct ElementSlot {
    #[serde(rename = "startTime")]
    start_time: String,
    #[serde(rename = "endTime")]
    end_time: String,
    parameter: ElementParameter,
}

#[derive(Debug, Deserialize)]
struct ElementParameter {
    #[serde(rename = "parameterName")]
    parameter_name: String,
}

impl ForecastLocation {
    fn first_slot(&self, element: &str) -> Option<&ElementSlot> {
        self.weather_element
            .iter()
            .find(|e| e.element_name == element)
            .and_then(|e| e.time.first())
    }

    fn value(&self, element: &str) -> Option<String> {
        self.first_slot(element)
            .map(|slot| slot.parameter.parameter_name.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// `Wx`, `MaxT` and `MinT` are required; `PoP` and `CI` are optional.
    fn into_record(self) -> Option<ForecastRecord> {
        let wx = self.first_slot("Wx")?;
        let time = format!("{} ~ {}", wx.start_time, wx.end_time);
        let weather_description = wx.parameter.parameter_name.clone();
        Some(ForecastRecord {
            time,
            weather_description,
            feeling_description: self.value("CI"),
            max_temp: self.value("MaxT")?,
            min_temp: self.value("MinT")?,
            rain_probability: self.value("PoP"),
            area: self.location_name,
        })
    }
}

// -- Open-data earthquake payload --

#[derive(Debug, Deserialize)]
struct EarthquakeFeed {
    records: EarthquakeRecords,
}

#[derive(Debug, Deserialize)]
struct EarthquakeRecords {
    #[serde(rename = "Earthquake", default)]
    earthquake: Vec<EarthquakeEntry>,
}

#[derive(Debug, Deserialize)]
struct EarthquakeEntry {
    #[serde(rename = "EarthquakeNo")]
    number: Reading,
    #[serde(rename = "ReportImageURI")]
    image_url: String,
}

// -- WAQI payload --

#[derive(Debug, Deserialize)]
struct WaqiResponse {
    status: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WaqiData {
    aqi: Option<Reading>,
    city: Option<WaqiCity>,
    time: Option<WaqiTime>,
    #[serde(default)]
    iaqi: WaqiIaqi,
}

#[derive(Debug, Deserialize)]
struct WaqiCity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WaqiTime {
    s: String,
}

#[derive(Debug, Deserialize, Default)]
struct WaqiIaqi {
    pm25: Option<WaqiValue>,
    pm10: Option<WaqiValue>,
    o3: Option<WaqiValue>,
}

#[derive(Debug, Deserialize)]
struct WaqiValue {
    v: Reading,
}

/// HTTP access to every upstream data source. One request per call, no retries.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    sources: SourcesConfig,
}

impl Fetcher {
    pub fn new(sources: SourcesConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            sources,
        }
    }

    pub fn sources(&self) -> &SourcesConfig {
        &self.sources
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response, BotError> {
        debug!("GET {}", url);
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|e| BotError::upstream(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::upstream(url, format!("HTTP {}", status)));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, BotError> {
        self.get(url, query)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BotError::upstream(url, format!("invalid payload: {}", e)))
    }

    pub async fn observation_stations(&self) -> Result<Vec<StationRecord>, BotError> {
        self.get_json(&self.sources.observation_url, &[]).await
    }

    pub async fn air_stations(&self) -> Result<Vec<AirRecord>, BotError> {
        let ts = chrono::Utc::now().timestamp_millis().to_string();
        let query = [
            ("lang", "tw".to_string()),
            ("act", "aqi-epa".to_string()),
            ("ts", ts),
        ];
        let feed: AirFeed = self.get_json(&self.sources.air_quality_url, &query).await?;
        Ok(feed.data)
    }

    /// Regional weather bulletin for one area ID, as plain text.
    pub async fn area_overview(&self, area_id: &str) -> Result<String, BotError> {
        let url = format!(
            "{}/{}.txt",
            self.sources.overview_base_url.trim_end_matches('/'),
            area_id
        );
        let raw = self
            .get(&url, &[])
            .await?
            .text()
            .await
            .map_err(|e| BotError::upstream(&url, e))?;
        Ok(clean_overview(&raw))
    }

    /// 36-hour county forecast, one record per location.
    pub async fn area_forecast(&self) -> Result<Vec<ForecastRecord>, BotError> {
        let url = format!(
            "{}/F-C0032-001",
            self.sources.open_data_base_url.trim_end_matches('/')
        );
        let query = [("Authorization", self.sources.open_data_key.clone())];
        let feed: ForecastFeed = self.get_json(&url, &query).await?;
        Ok(feed
            .records
            .location
            .into_iter()
            .filter_map(ForecastLocation::into_record)
            .collect())
    }

    pub async fn latest_earthquake(&self) -> Result<EarthquakeReport, BotError> {
        let url = format!(
            "{}/E-A0015-001",
            self.sources.open_data_base_url.trim_end_matches('/')
        );
        let query = [
            ("Authorization", self.sources.open_data_key.clone()),
            ("limit", "1".to_string()),
        ];
        let feed: EarthquakeFeed = self.get_json(&url, &query).await?;
        let entry = feed
            .records
            .earthquake
            .into_iter()
            .next()
            .ok_or_else(|| BotError::upstream(&url, "no earthquake report"))?;
        Ok(EarthquakeReport {
            number: entry.number.to_string(),
            image_url: entry.image_url,
        })
    }

    pub async fn foreign_air(&self, city: &ForeignCity) -> Result<ForeignAirRecord, BotError> {
        let url = format!(
            "{}/feed/{}/",
            self.sources.waqi_base_url.trim_end_matches('/'),
            city.slug
        );
        let query = [("token", self.sources.waqi_token.clone())];
        let response: WaqiResponse = self.get_json(&url, &query).await?;
        if response.status != "ok" {
            return Err(BotError::upstream(
                &url,
                format!("status '{}': {}", response.status, response.data),
            ));
        }
        let data: WaqiData = serde_json::from_value(response.data)
            .map_err(|e| BotError::upstream(&url, format!("invalid payload: {}", e)))?;

        Ok(ForeignAirRecord {
            city: city.name.to_string(),
            station: data.city.map(|c| c.name),
            aqi: data.aqi,
            pm25: data.iaqi.pm25.map(|v| v.v),
            pm10: data.iaqi.pm10.map(|v| v.v),
            o3: data.iaqi.o3.map(|v| v.v),
            time: data.time.map(|t| t.s),
        })
    }

    pub async fn image_bytes(&self, url: &str) -> Result<Vec<u8>, BotError> {
        let bytes = self
            .get(url, &[])
            .await?
            .bytes()
            .await
            .map_err(|e| BotError::upstream(url, e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn sources_for(base: &str) -> SourcesConfig {
        SourcesConfig {
            observation_url: format!("{}/obs.json", base),
            air_quality_url: format!("{}/aqs.ashx", base),
            overview_base_url: format!("{}/overview", base),
            open_data_base_url: format!("{}/opendata", base),
            waqi_base_url: format!("{}/waqi", base),
            open_data_key: "KEY".to_string(),
            waqi_token: "TOKEN".to_string(),
            ..SourcesConfig::default()
        }
    }

    #[derive(Debug)]
    struct Named(&'static str);

    #[test]
    fn test_find_station_prefers_exact_match() {
        let records = [Named("臺北南"), Named("臺北"), Named("新臺北")];
        let found = find_station(&records, "臺北", |r| r.0).unwrap();
        assert_eq!(found.0, "臺北");
    }

    #[test]
    fn test_find_station_falls_back_to_first_containing() {
        let records = [Named("板橋"), Named("臺北南"), Named("新臺北")];
        let found = find_station(&records, "臺北", |r| r.0).unwrap();
        assert_eq!(found.0, "臺北南");
        assert!(find_station(&records, "高雄", |r| r.0).is_none());
    }

    #[test]
    fn test_require_station_reports_miss() {
        let records = [Named("板橋")];
        let err = require_station(&records, "高雄", |r| r.0).unwrap_err();
        assert!(matches!(err, BotError::NoMatchFound(ref q) if q == "高雄"));
        assert!(require_station(&records, "板橋", |r| r.0).is_ok());
    }

    #[test]
    fn test_clean_overview() {
        let raw = "今天晴<BR>明天雨<BR><div class=\"foot\">x</div>";
        assert_eq!(clean_overview(raw), "今天晴\n明天雨\n");
    }

    #[tokio::test]
    async fn test_observation_stations() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/obs.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"name":"臺北","TEMP":25.1},{"name":"臺北南"}]"#)
            .create_async()
            .await;

        let fetcher = Fetcher::new(sources_for(&server.url()));
        let stations = fetcher.observation_stations().await.unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].temperature, Some(Reading::Number(25.1)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/obs.json")
            .with_status(503)
            .create_async()
            .await;

        let fetcher = Fetcher::new(sources_for(&server.url()));
        let err = fetcher.observation_stations().await.unwrap_err();
        assert!(matches!(err, BotError::UpstreamFetch { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/obs.json")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let fetcher = Fetcher::new(sources_for(&server.url()));
        assert!(matches!(
            fetcher.observation_stations().await,
            Err(BotError::UpstreamFetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_air_stations_sends_cache_busting_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/aqs.ashx")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("lang".into(), "tw".into()),
                Matcher::UrlEncoded("act".into(), "aqi-epa".into()),
                Matcher::Regex("ts=[0-9]+".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"Data":[{"SiteName":"板橋","AQI":"52"}]}"#)
            .create_async()
            .await;

        let fetcher = Fetcher::new(sources_for(&server.url()));
        let records = fetcher.air_stations().await.unwrap();
        assert_eq!(records[0].site_name, "板橋");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_area_overview_cleans_markup() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/overview/W50_63.txt")
            .with_status(200)
            .with_body("北部晴<BR>午後雷陣雨<div>footer</div>")
            .create_async()
            .await;

        let fetcher = Fetcher::new(sources_for(&server.url()));
        let text = fetcher.area_overview("W50_63").await.unwrap();
        assert_eq!(text, "北部晴\n午後雷陣雨");
    }

    #[tokio::test]
    async fn test_area_forecast_optional_rain_probability() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"records":{"location":[
            {"locationName":"臺北市","weatherElement":[
                {"elementName":"Wx","time":[{"startTime":"2026-10-18 18:00:00","endTime":"2026-10-19 06:00:00","parameter":{"parameterName":"多雲"}}]},
                {"elementName":"PoP","time":[{"startTime":"2026-10-18 18:00:00","endTime":"2026-10-19 06:00:00","parameter":{"parameterName":"20"}}]},
                {"elementName":"MinT","time":[{"startTime":"2026-10-18 18:00:00","endTime":"2026-10-19 06:00:00","parameter":{"parameterName":"21"}}]},
                {"elementName":"MaxT","time":[{"startTime":"2026-10-18 18:00:00","endTime":"2026-10-19 06:00:00","parameter":{"parameterName":"27"}}]},
                {"elementName":"CI","time":[{"startTime":"2026-10-18 18:00:00","endTime":"2026-10-19 06:00:00","parameter":{"parameterName":"舒適"}}]}
            ]},
            {"locationName":"澎湖縣","weatherElement":[
                {"elementName":"Wx","time":[{"startTime":"2026-10-18 18:00:00","endTime":"2026-10-19 06:00:00","parameter":{"parameterName":"晴"}}]},
                {"elementName":"MinT","time":[{"startTime":"2026-10-18 18:00:00","endTime":"2026-10-19 06:00:00","parameter":{"parameterName":"24"}}]},
                {"elementName":"MaxT","time":[{"startTime":"2026-10-18 18:00:00","endTime":"2026-10-19 06:00:00","parameter":{"parameterName":"28"}}]}
            ]}
        ]}}"#;
        let _mock = server
            .mock("GET", "/opendata/F-C0032-001")
            .match_query(Matcher::UrlEncoded("Authorization".into(), "KEY".into()))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let fetcher = Fetcher::new(sources_for(&server.url()));
        let records = fetcher.area_forecast().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].area, "臺北市");
        assert_eq!(records[0].rain_probability.as_deref(), Some("20"));
        assert_eq!(records[0].feeling_description.as_deref(), Some("舒適"));
        assert_eq!(records[0].time, "2026-10-18 18:00:00 ~ 2026-10-19 06:00:00");
        assert_eq!(records[1].rain_probability, None);
        assert_eq!(records[1].max_temp, "28");
    }

    #[tokio::test]
    async fn test_latest_earthquake() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/opendata/E-A0015-001")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"records":{"Earthquake":[{"EarthquakeNo":115042,"ReportImageURI":"https://example.org/eq.png"}]}}"#,
            )
            .create_async()
            .await;

        let fetcher = Fetcher::new(sources_for(&server.url()));
        let report = fetcher.latest_earthquake().await.unwrap();
        assert_eq!(report.number, "115042");
        assert_eq!(report.image_url, "https://example.org/eq.png");
    }

    #[tokio::test]
    async fn test_foreign_air_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/waqi/feed/tokyo/")
            .match_query(Matcher::UrlEncoded("token".into(), "TOKEN".into()))
            .with_status(200)
            .with_body(r#"{"status":"error","data":"Invalid key"}"#)
            .create_async()
            .await;

        let fetcher = Fetcher::new(sources_for(&server.url()));
        let city = crate::keywords::is_foreign_air_station("東京").unwrap();
        let err = fetcher.foreign_air(city).await.unwrap_err();
        assert!(err.to_string().contains("Invalid key"));
    }

    #[tokio::test]
    async fn test_foreign_air_ok() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/waqi/feed/tokyo/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"status":"ok","data":{"aqi":42,"city":{"name":"Tokyo"},"time":{"s":"2026-10-18 15:00:00"},"iaqi":{"pm25":{"v":42},"o3":{"v":18.4}}}}"#,
            )
            .create_async()
            .await;

        let fetcher = Fetcher::new(sources_for(&server.url()));
        let city = crate::keywords::is_foreign_air_station("東京").unwrap();
        let record = fetcher.foreign_air(city).await.unwrap();
        assert_eq!(record.city, "東京");
        assert_eq!(record.station.as_deref(), Some("Tokyo"));
        assert_eq!(record.aqi, Some(Reading::Number(42.0)));
        assert!(record.pm10.is_none());
    }
}
