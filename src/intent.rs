use crate::keywords::{self, ForeignCity};

/// The single classified purpose of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Help,
    Issue,
    Source,
    AgencyLink,
    ObservationList,
    ObservationDetail { station: String },
    AirStationList,
    AirDetail { station: String },
    AirImage,
    ForeignAir { city: &'static ForeignCity },
    Forecast,
    WeatherChart,
    Radar,
    Satellite,
    Earthquake,
    AreaOverview { area: String },
    Funny { reply: &'static str },
    AreaWeather { area: String },
    None,
}

type Predicate = fn(&str) -> Option<Intent>;

/// Routes in priority order. The first predicate to return an intent wins.
pub const ROUTES: &[(&str, Predicate)] = &[
    ("help", help),
    ("issue", issue),
    ("source", source),
    ("agency", agency),
    ("observation_list", observation_list),
    ("observation", observation),
    ("air_station_list", air_station_list),
    ("air", air),
    ("forecast", forecast),
    ("weather_chart", weather_chart),
    ("radar", radar),
    ("satellite", satellite),
    ("earthquake", earthquake),
    ("overview", overview),
    ("funny", funny),
    ("weather", weather),
];

/// Classify a normalized message.
pub fn classify(msg: &str) -> Intent {
    ROUTES
        .iter()
        .find_map(|(_, predicate)| predicate(msg))
        .unwrap_or(Intent::None)
}

/// Name of the route that claims `msg`, for logging.
pub fn route_name(msg: &str) -> Option<&'static str> {
    ROUTES
        .iter()
        .find(|(_, predicate)| predicate(msg).is_some())
        .map(|(name, _)| *name)
}

fn help(msg: &str) -> Option<Intent> {
    keywords::contains_keyword(msg, "help").then_some(Intent::Help)
}

fn issue(msg: &str) -> Option<Intent> {
    keywords::contains_any(msg, &["issue", "回報問題"]).then_some(Intent::Issue)
}

fn source(msg: &str) -> Option<Intent> {
    keywords::contains_any(msg, &["github", "原始碼"]).then_some(Intent::Source)
}

fn agency(msg: &str) -> Option<Intent> {
    keywords::contains_any(msg, &["cwb", "氣象局"]).then_some(Intent::AgencyLink)
}

fn observation_list(msg: &str) -> Option<Intent> {
    keywords::contains_keyword(msg, "觀測站清單").then_some(Intent::ObservationList)
}

fn observation(msg: &str) -> Option<Intent> {
    keywords::prefix_before(msg, "觀測").map(|station| Intent::ObservationDetail {
        station: station.to_string(),
    })
}

fn air_station_list(msg: &str) -> Option<Intent> {
    keywords::contains_keyword(msg, "監測站清單").then_some(Intent::AirStationList)
}

fn air(msg: &str) -> Option<Intent> {
    if !keywords::is_air(msg) {
        return None;
    }
    if let Some(station) = keywords::is_air_station(msg) {
        return Some(Intent::AirDetail {
            station: station.to_string(),
        });
    }
    if let Some(city) = keywords::is_foreign_air_station(msg) {
        return Some(Intent::ForeignAir { city });
    }
    Some(Intent::AirImage)
}

fn forecast(msg: &str) -> Option<Intent> {
    keywords::contains_keyword(msg, "預報").then_some(Intent::Forecast)
}

fn weather_chart(msg: &str) -> Option<Intent> {
    keywords::contains_keyword(msg, "天氣圖").then_some(Intent::WeatherChart)
}

fn radar(msg: &str) -> Option<Intent> {
    keywords::contains_keyword(msg, "雷達").then_some(Intent::Radar)
}

fn satellite(msg: &str) -> Option<Intent> {
    keywords::contains_keyword(msg, "衛星雲").then_some(Intent::Satellite)
}

fn earthquake(msg: &str) -> Option<Intent> {
    keywords::contains_keyword(msg, "地震").then_some(Intent::Earthquake)
}

fn funny(msg: &str) -> Option<Intent> {
    keywords::is_funny(msg).map(|reply| Intent::Funny { reply })
}

fn overview(msg: &str) -> Option<Intent> {
    keywords::prefix_before(msg, "概況").map(|area| Intent::AreaOverview {
        area: area.to_string(),
    })
}

fn weather(msg: &str) -> Option<Intent> {
    let keyword = keywords::is_weather(msg)?;
    let area = match keywords::is_taiwan_area(msg) {
        Some(area) => area.to_string(),
        None => keywords::prefix_before(msg, keyword)
            .unwrap_or_default()
            .to_string(),
    };
    Some(Intent::AreaWeather { area })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::normalize;

    fn classify_raw(text: &str) -> Intent {
        classify(&normalize(text))
    }

    #[test]
    fn test_priority_order() {
        // "help" outranks everything after it
        assert_eq!(classify_raw("help 觀測 雷達"), Intent::Help);
        assert_eq!(classify_raw("HELP"), Intent::Help);
        assert_eq!(classify_raw("回報問題"), Intent::Issue);
        assert_eq!(classify_raw("GitHub"), Intent::Source);
        assert_eq!(classify_raw("氣象局"), Intent::AgencyLink);
        // the list keyword is checked before the bare observation keyword
        assert_eq!(classify_raw("觀測站清單"), Intent::ObservationList);
        assert_eq!(classify_raw("監測站清單"), Intent::AirStationList);
        // forecast comes before weather chart and weather
        assert_eq!(classify_raw("天氣預報"), Intent::Forecast);
        assert_eq!(classify_raw("天氣圖"), Intent::WeatherChart);
        assert_eq!(classify_raw("雷達回波"), Intent::Radar);
        assert_eq!(classify_raw("衛星雲圖"), Intent::Satellite);
        assert_eq!(classify_raw("最新地震"), Intent::Earthquake);
    }

    #[test]
    fn test_observation_extracts_prefix() {
        assert_eq!(
            classify_raw("台北 觀測"),
            Intent::ObservationDetail {
                station: "臺北".to_string()
            }
        );
    }

    #[test]
    fn test_air_branches() {
        assert_eq!(
            classify_raw("板橋空氣品質"),
            Intent::AirDetail {
                station: "板橋".to_string()
            }
        );
        match classify_raw("東京 AQI") {
            Intent::ForeignAir { city } => assert_eq!(city.slug, "tokyo"),
            other => panic!("unexpected intent {:?}", other),
        }
        assert_eq!(classify_raw("空氣品質"), Intent::AirImage);
    }

    #[test]
    fn test_overview_and_weather() {
        assert_eq!(
            classify_raw("臺北概況"),
            Intent::AreaOverview {
                area: "臺北".to_string()
            }
        );
        assert_eq!(
            classify_raw("台北天氣"),
            Intent::AreaWeather {
                area: "臺北市".to_string()
            }
        );
        assert_eq!(
            classify_raw("信義區天氣"),
            Intent::AreaWeather {
                area: "信義區".to_string()
            }
        );
    }

    #[test]
    fn test_funny_before_weather() {
        assert!(matches!(classify_raw("早安，今天天氣"), Intent::Funny { .. }));
    }

    #[test]
    fn test_unmatched_is_none() {
        assert_eq!(classify_raw("我想吃拉麵"), Intent::None);
        assert_eq!(classify_raw(""), Intent::None);
        assert_eq!(route_name("我想吃拉麵"), None);
        assert_eq!(route_name("雷達"), Some("radar"));
    }
}
