use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BotError;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatPlatform {
    #[default]
    Line,
    Messenger,
}

impl std::fmt::Display for ChatPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatPlatform::Line => write!(f, "line"),
            ChatPlatform::Messenger => write!(f, "messenger"),
        }
    }
}

impl std::str::FromStr for ChatPlatform {
    type Err = BotError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChatPlatform::Line),
            "messenger" => Ok(ChatPlatform::Messenger),
            other => Err(BotError::Configuration(format!(
                "unknown chat platform '{}', expected 'line' or 'messenger'",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub line: LineConfig,
    #[serde(default)]
    pub messenger: MessengerConfig,
    #[serde(default = "default_storage_config")]
    pub storage: StorageConfig,
    pub imgur: Option<ImgurConfig>,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PlatformConfig {
    #[serde(default)]
    pub kind: ChatPlatform,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LineConfig {
    #[serde(default)]
    pub channel_secret: String,
    #[serde(default)]
    pub channel_access_token: String,
    #[serde(default = "default_line_api_base")]
    pub api_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessengerConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default)]
    pub verify_token: String,
    #[serde(default = "default_messenger_api_base")]
    pub api_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImgurConfig {
    pub client_id: String,
    #[serde(default = "default_imgur_api_base")]
    pub api_base: String,
}

/// Upstream endpoints. Image URLs are templates rendered against a time bucket.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    pub observation_url: String,
    pub air_quality_url: String,
    pub air_image_url: String,
    pub overview_base_url: String,
    pub forecast_image_url: String,
    pub weather_chart_url: String,
    pub radar_url: String,
    pub satellite_url: String,
    /// Minutes between files published for the hourly products.
    pub hourly_cadence: u32,
    /// Minutes between satellite images.
    pub satellite_cadence: u32,
    pub open_data_base_url: String,
    /// Authorization key for the open-data API (forecast, earthquake).
    pub open_data_key: String,
    pub waqi_base_url: String,
    pub waqi_token: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            observation_url: "http://140.112.67.183/mospc/returnJson.php?file=CWBOBS.json"
                .to_string(),
            air_quality_url: "https://taqm.epa.gov.tw/taqm/aqs.ashx".to_string(),
            air_image_url:
                "https://taqm.epa.gov.tw/taqm/Chart/AqMap/map2.aspx?lang=tw&ts={year}{month}{day}{hour}"
                    .to_string(),
            overview_base_url: "http://www.cwb.gov.tw/V7/forecast/taiwan/Data".to_string(),
            forecast_image_url: "http://www.cwb.gov.tw/V7/forecast/taiwan/Data/Forecast01.png"
                .to_string(),
            weather_chart_url: "http://www.cwb.gov.tw/V7/forecast/fcst/Data/I04.jpg".to_string(),
            radar_url:
                "http://www.cwb.gov.tw/V7/observe/radar/Data/HD_Radar/CV1_3600_{year}{month}{day}{hour}{minute}.png"
                    .to_string(),
            satellite_url:
                "http://www.cwb.gov.tw/V7/observe/satellite/Data/ts1p/ts1p-{year}-{month}-{day}-{hour}-{minute}.jpg"
                    .to_string(),
            hourly_cadence: 60,
            satellite_cadence: 10,
            open_data_base_url: "https://opendata.cwa.gov.tw/api/v1/rest/datastore".to_string(),
            open_data_key: String::new(),
            waqi_base_url: "https://api.waqi.info".to_string(),
            waqi_token: String::new(),
        }
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: String::new(),
            channel_access_token: String::new(),
            api_base: default_line_api_base(),
        }
    }
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            app_secret: String::new(),
            verify_token: String::new(),
            api_base: default_messenger_api_base(),
        }
    }
}

fn default_port() -> u16 {
    5000
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        port: default_port(),
        webhook_path: default_webhook_path(),
    }
}

fn default_line_api_base() -> String {
    "https://api.line.me".to_string()
}

fn default_messenger_api_base() -> String {
    "https://graph.facebook.com/v2.6".to_string()
}

fn default_imgur_api_base() -> String {
    "https://api.imgur.com".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("weatherbot.db")
}

fn default_storage_config() -> StorageConfig {
    StorageConfig {
        database_path: default_db_path(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::parse(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Environment variables take precedence over the file so deployments can
    /// keep credentials out of it.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }
        if let Some(kind) = lookup("CHATROOM_PLATFORM") {
            self.platform.kind = kind.parse()?;
        }

        let overrides: [(&str, &mut String); 6] = [
            ("LINE_CHANNEL_SECRET", &mut self.line.channel_secret),
            ("LINE_CHANNEL_ACCESS_TOKEN", &mut self.line.channel_access_token),
            ("MESSENGER_ACCESS_TOKEN", &mut self.messenger.access_token),
            ("MESSENGER_APP_SECRET", &mut self.messenger.app_secret),
            ("MESSENGER_VERIFY_TOKEN", &mut self.messenger.verify_token),
            ("OPEN_DATA_KEY", &mut self.sources.open_data_key),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }

        if let Some(client_id) = lookup("IMGUR_CLIENT_ID") {
            match self.imgur.as_mut() {
                Some(imgur) => imgur.client_id = client_id,
                None => {
                    self.imgur = Some(ImgurConfig {
                        client_id,
                        api_base: default_imgur_api_base(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Reject a config whose selected platform is missing credentials.
    pub fn validate(&self) -> std::result::Result<(), BotError> {
        let missing: Vec<&str> = match self.platform.kind {
            ChatPlatform::Line => [
                ("line.channel_secret", &self.line.channel_secret),
                ("line.channel_access_token", &self.line.channel_access_token),
            ]
            .into_iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| k)
            .collect(),
            ChatPlatform::Messenger => [
                ("messenger.access_token", &self.messenger.access_token),
                ("messenger.app_secret", &self.messenger.app_secret),
                ("messenger.verify_token", &self.messenger.verify_token),
            ]
            .into_iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| k)
            .collect(),
        };

        if !missing.is_empty() {
            return Err(BotError::Configuration(format!(
                "platform '{}' is missing: {}",
                self.platform.kind,
                missing.join(", ")
            )));
        }
        if !self.server.webhook_path.starts_with('/') {
            return Err(BotError::Configuration(format!(
                "server.webhook_path must start with '/': {}",
                self.server.webhook_path
            )));
        }
        Ok(())
    }
}
