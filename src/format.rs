//! Reply templates. Every optional field drops its whole line when absent.

use std::fmt::Write;

use crate::records::{AirRecord, ForecastRecord, ForeignAirRecord, Reading, StationRecord};

const CWB_FOOTER: &str = "---\n資料來源：中央氣象局\n";
const EPA_FOOTER: &str = "---\n資料來源：環保署\n";
const WAQI_FOOTER: &str = "---\n資料來源：World Air Quality Index Project\n";

fn push_reading(out: &mut String, label: &str, reading: Option<&Reading>, unit: &str) {
    if let Some(r) = reading.filter(|r| !r.is_missing()) {
        let _ = writeln!(out, "{}：{}{}", label, r, unit);
    }
}

fn push_text(out: &mut String, label: &str, text: Option<&str>) {
    if let Some(t) = text.map(str::trim).filter(|t| !t.is_empty()) {
        let _ = writeln!(out, "{}：{}", label, t);
    }
}

pub fn observation(record: &StationRecord) -> String {
    let mut out = String::new();
    let location: String = [record.county.as_deref(), record.town.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if location.is_empty() {
        let _ = writeln!(out, "測站：{}", record.name);
    } else {
        let _ = writeln!(out, "測站：{}（{}）", record.name, location);
    }
    push_text(&mut out, "時間", record.time.as_deref());
    push_reading(&mut out, "溫度", record.temperature.as_ref(), "℃");
    push_reading(&mut out, "濕度", record.humidity.as_ref(), "%");
    push_reading(&mut out, "風速", record.wind_speed.as_ref(), " m/s");
    push_reading(&mut out, "風向", record.wind_direction.as_ref(), "°");
    push_reading(&mut out, "氣壓", record.pressure.as_ref(), " hPa");
    push_reading(&mut out, "日累積雨量", record.rain.as_ref(), " mm");
    out.push_str(CWB_FOOTER);
    out
}

pub fn air_station(record: &AirRecord) -> String {
    let mut out = String::new();
    match record.county.as_deref().filter(|c| !c.is_empty()) {
        Some(county) => {
            let _ = writeln!(out, "測站：{} {}", county, record.site_name);
        }
        None => {
            let _ = writeln!(out, "測站：{}", record.site_name);
        }
    }
    push_reading(&mut out, "AQI", record.aqi.as_ref(), "");
    push_text(&mut out, "狀態", record.status.as_deref());
    push_text(&mut out, "主要污染物", record.pollutant.as_deref());
    push_reading(&mut out, "PM2.5", record.pm25.as_ref(), " μg/m³");
    push_reading(&mut out, "PM10", record.pm10.as_ref(), " μg/m³");
    push_reading(&mut out, "臭氧", record.o3.as_ref(), " ppb");
    push_text(&mut out, "發布時間", record.publish_time.as_deref());
    out.push_str(EPA_FOOTER);
    out
}

pub fn foreign_air(record: &ForeignAirRecord) -> String {
    let mut out = String::new();
    match record.station.as_deref().filter(|s| !s.is_empty()) {
        Some(station) => {
            let _ = writeln!(out, "城市：{}（{}）", record.city, station);
        }
        None => {
            let _ = writeln!(out, "城市：{}", record.city);
        }
    }
    push_reading(&mut out, "AQI", record.aqi.as_ref(), "");
    push_reading(&mut out, "PM2.5 指標", record.pm25.as_ref(), "");
    push_reading(&mut out, "PM10 指標", record.pm10.as_ref(), "");
    push_reading(&mut out, "臭氧指標", record.o3.as_ref(), "");
    push_text(&mut out, "觀測時間", record.time.as_deref());
    out.push_str(WAQI_FOOTER);
    out
}

/// Two templates: with rain probability (and comfort description) or without.
pub fn forecast(record: &ForecastRecord) -> String {
    match &record.rain_probability {
        Some(rain) => {
            let description = match record.feeling_description.as_deref() {
                Some(feeling) if !feeling.is_empty() => {
                    format!("{} {}", record.weather_description, feeling)
                }
                _ => record.weather_description.clone(),
            };
            format!(
                "地區：{}\n時間：{}\n描述：{}\n最高溫度：{}℃\n最低溫度：{}℃\n降雨機率：{}%\n{}",
                record.area,
                record.time,
                description,
                record.max_temp,
                record.min_temp,
                rain,
                CWB_FOOTER
            )
        }
        None => format!(
            "地區：{}\n時間：{}\n描述：{}\n最高溫度：{}℃\n最低溫度：{}℃\n{}",
            record.area,
            record.time,
            record.weather_description,
            record.max_temp,
            record.min_temp,
            CWB_FOOTER
        ),
    }
}
