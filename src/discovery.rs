//! Station discovery from the portal index page.
//!
//! The report page embeds every known station as an `<option>` of a
//! `<select>` element, with the qualifier tag in a trailing parenthesis of
//! the display text. Only REM and SLA stations carry real observation data
//! behind the CSV endpoint; forecast and test variants are dropped here.

use crate::constants::{ALLOWED_STATION_TAGS, EXCLUDED_STATION_TAGS, STATION_INDEX_ENDPOINT};
use crate::error::Result;
use crate::models::Station;
use crate::transport::Transport;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<option[^>]*value\s*=\s*['"]?(\d+)['"]?[^>]*>\s*([^<]+)"#)
            .expect("valid regex")
    })
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn trailing_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^()]*)\)\s*$").expect("valid regex"))
}

/// Fetch the index page and return the qualifying stations, ordered by id
pub async fn discover_stations(transport: &Transport) -> Result<Vec<Station>> {
    let url = transport.page_url(STATION_INDEX_ENDPOINT);
    let raw = transport.fetch("index", &url).await?;
    let html = String::from_utf8_lossy(&raw);

    let stations = parse_station_options(&html);
    debug!("discovered {} qualifying stations", stations.len());
    Ok(stations)
}

/// Extract station options from the index page HTML.
///
/// The display text is whitespace-normalized; a trailing parenthesized
/// qualifier becomes the tag. Stations are filtered to the allowed tags,
/// minus the explicit test/forecast exclusions, and sorted numerically.
pub fn parse_station_options(html: &str) -> Vec<Station> {
    let mut stations = Vec::new();

    for captures in option_re().captures_iter(html) {
        let id = captures[1].to_string();
        let raw_name = whitespace_re()
            .replace_all(captures[2].trim(), " ")
            .into_owned();

        let (name, tag) = match trailing_tag_re().captures(&raw_name) {
            Some(tag_caps) => {
                let tag = tag_caps[1].trim().to_string();
                let name = trailing_tag_re().replace(&raw_name, "").trim().to_string();
                (name, tag)
            }
            None => (raw_name, String::new()),
        };

        stations.push(Station { id, name, tag });
    }

    stations.retain(|station| {
        let tag = station.tag.trim().to_uppercase();
        !EXCLUDED_STATION_TAGS.contains(&tag.as_str())
            && ALLOWED_STATION_TAGS.contains(&tag.as_str())
    });

    stations.sort_by_key(|station| station.id.parse::<u64>().unwrap_or(u64::MAX));
    stations
}
