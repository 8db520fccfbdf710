use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::error::BotError;
use crate::fetcher::{require_station, Fetcher};
use crate::format;
use crate::image_cache::ImageCache;
use crate::intent::{self, Intent};
use crate::keywords;
use crate::messages;
use crate::platform::{EventKind, IncomingEvent, IncomingMessage, ReplyAdapter, ReplyContext};
use crate::store::Store;
use crate::time_bucket::TimeBucket;

/// The single reply produced for a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Image(String),
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

/// How an image product's cache key is derived from its time bucket.
#[derive(Debug, Clone, Copy)]
enum KeyGranularity {
    Hour,
    Minute,
}

/// Routes each inbound event to its handler and sends at most one reply.
/// Holds no per-conversation state.
#[derive(Clone)]
pub struct Dispatcher {
    fetcher: Fetcher,
    images: ImageCache,
    store: Store,
    replier: Arc<dyn ReplyAdapter>,
}

impl Dispatcher {
    pub fn new(
        fetcher: Fetcher,
        images: ImageCache,
        store: Store,
        replier: Arc<dyn ReplyAdapter>,
    ) -> Self {
        Self {
            fetcher,
            images,
            store,
            replier,
        }
    }

    pub async fn dispatch(&self, event: IncomingEvent) {
        let ctx = event.context;
        match event.kind {
            EventKind::Follow => self.send(&ctx, Reply::text(messages::FOLLOW)).await,
            EventKind::Join => self.send(&ctx, Reply::text(messages::JOIN)).await,
            EventKind::Text(message) => self.handle_text(&ctx, message).await,
            EventKind::Other => debug!("Ignoring non-text event"),
        }
    }

    async fn handle_text(&self, ctx: &ReplyContext, message: IncomingMessage) {
        info!(
            "Message from {}: {}",
            ctx.user_id.as_deref().unwrap_or("unknown"),
            message.text
        );

        if let Err(e) = self.store.log_message(&message.text, message.received_at).await {
            warn!("Failed to log message: {:#}", e);
        }

        let normalized = keywords::normalize(&message.text);
        let intent = intent::classify(&normalized);
        debug!(
            "Classified '{}' via {:?} as {:?}",
            normalized,
            intent::route_name(&normalized),
            intent
        );

        match self.respond(&intent, message.received_at).await {
            Some(reply) => self.send(ctx, reply).await,
            None => debug!("No reply for '{}'", message.text),
        }
    }

    async fn send(&self, ctx: &ReplyContext, reply: Reply) {
        let result = match &reply {
            Reply::Text(text) => self.replier.send_text(ctx, text).await,
            Reply::Image(url) => self.replier.send_image(ctx, url).await,
        };
        if let Err(e) = result {
            error!("Failed to send reply {:?}: {:#}", reply, e);
        }
    }

    /// Produce the reply for a classified message received at `now`.
    pub async fn respond(&self, intent: &Intent, now: DateTime<Utc>) -> Option<Reply> {
        let sources = self.fetcher.sources();
        match intent {
            Intent::Help => Some(Reply::text(messages::HELP)),
            Intent::Issue => Some(Reply::text(messages::ISSUE)),
            Intent::Source => Some(Reply::text(messages::SOURCE_URL)),
            Intent::AgencyLink => Some(Reply::text(messages::AGENCY_URL)),
            Intent::ObservationList => Some(Reply::text(messages::OBSERVATION_STATIONS)),
            Intent::AirStationList => Some(Reply::Text(messages::air_stations())),
            Intent::ObservationDetail { station } => Some(self.observation(station).await),
            Intent::AirDetail { station } => self.air_detail(station).await,
            Intent::ForeignAir { city } => Some(match self.fetcher.foreign_air(city).await {
                Ok(record) => Reply::Text(format::foreign_air(&record)),
                Err(e) => fetch_failed(intent, e),
            }),
            Intent::AirImage => {
                let bucket = TimeBucket::at(now, sources.hourly_cadence);
                let url = bucket.render(&sources.air_image_url);
                Some(match self.images.resolve("air", &bucket.hour_key(), &url).await {
                    Some(link) => Reply::Image(link),
                    None => Reply::text(messages::AIR_IMAGE_FAILED),
                })
            }
            Intent::Forecast => Some(
                self.bucketed_image(
                    "forecast",
                    &sources.forecast_image_url,
                    sources.hourly_cadence,
                    KeyGranularity::Hour,
                    now,
                )
                .await,
            ),
            Intent::WeatherChart => Some(
                self.bucketed_image(
                    "weather",
                    &sources.weather_chart_url,
                    sources.hourly_cadence,
                    KeyGranularity::Hour,
                    now,
                )
                .await,
            ),
            Intent::Radar => Some(
                self.bucketed_image(
                    "radar",
                    &sources.radar_url,
                    sources.hourly_cadence,
                    KeyGranularity::Minute,
                    now,
                )
                .await,
            ),
            Intent::Satellite => Some(
                self.bucketed_image(
                    "satellite",
                    &sources.satellite_url,
                    sources.satellite_cadence,
                    KeyGranularity::Minute,
                    now,
                )
                .await,
            ),
            Intent::Earthquake => Some(self.earthquake().await),
            Intent::AreaOverview { area } => self.area_overview(area).await,
            Intent::Funny { reply } => Some(Reply::text(*reply)),
            Intent::AreaWeather { area } => self.area_weather(area).await,
            Intent::None => None,
        }
    }

    async fn observation(&self, station: &str) -> Reply {
        if station.is_empty() {
            return Reply::text(messages::NO_SUCH_STATION);
        }
        match self.fetcher.observation_stations().await {
            Ok(records) => match require_station(&records, station, |r| r.name.as_str()) {
                Ok(record) => Reply::Text(format::observation(record)),
                Err(e) => {
                    info!("{}", e);
                    Reply::text(messages::NO_SUCH_STATION)
                }
            },
            Err(e) => fetch_failed(station, e),
        }
    }

    async fn air_detail(&self, station: &str) -> Option<Reply> {
        match self.fetcher.air_stations().await {
            Ok(records) => require_station(&records, station, |r| r.site_name.as_str())
                .map(|record| Reply::Text(format::air_station(record)))
                .map_err(|e| info!("{}", e))
                .ok(),
            Err(e) => Some(fetch_failed(station, e)),
        }
    }

    /// Image products published on a fixed cadence. Falls back to the raw URL.
    async fn bucketed_image(
        &self,
        category: &str,
        template: &str,
        cadence: u32,
        granularity: KeyGranularity,
        now: DateTime<Utc>,
    ) -> Reply {
        let bucket = TimeBucket::at(now, cadence);
        let url = bucket.render(template);
        let key = match granularity {
            KeyGranularity::Hour => bucket.hour_key(),
            KeyGranularity::Minute => bucket.minute_key(),
        };
        match self.images.resolve(category, &key, &url).await {
            Some(link) => Reply::Image(link),
            None => Reply::Text(url),
        }
    }

    async fn earthquake(&self) -> Reply {
        let report = match self.fetcher.latest_earthquake().await {
            Ok(report) => report,
            Err(e) => {
                warn!("Earthquake report unavailable: {}", e);
                return Reply::text(messages::EARTHQUAKE_FAILED);
            }
        };
        match self
            .images
            .resolve("earthquake", &report.number, &report.image_url)
            .await
        {
            Some(link) => Reply::Image(link),
            None => Reply::Text(report.image_url),
        }
    }

    async fn area_overview(&self, area: &str) -> Option<Reply> {
        if area.is_empty() {
            return None;
        }
        let area_id = keywords::overview_area_id(area)?;
        Some(match self.fetcher.area_overview(area_id).await {
            Ok(text) => Reply::Text(text),
            Err(e) => fetch_failed(area, e),
        })
    }

    async fn area_weather(&self, area: &str) -> Option<Reply> {
        if area.is_empty() {
            return None;
        }
        match self.fetcher.area_forecast().await {
            Ok(records) => require_station(&records, area, |r| r.area.as_str())
                .map(|record| Reply::Text(format::forecast(record)))
                .map_err(|e| info!("{}", e))
                .ok(),
            Err(e) => Some(fetch_failed(area, e)),
        }
    }
}

fn fetch_failed(subject: impl std::fmt::Debug, err: BotError) -> Reply {
    warn!("Fetch for {:?} failed: {}", subject, err);
    Reply::text(messages::FETCH_FAILED)
}
