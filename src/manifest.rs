//! HLS master manifest parsing and bitrate selection.
//!
//! The playable URL for each variant carries the session's `reqPayload`
//! cookie appended as a `|Cookie=...` header hint, so the downstream
//! player can replay it when fetching segments.

use m3u8_rs::Playlist;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use crate::config::BitratePreference;
use crate::errors::VueError;
use crate::session::{HttpSession, Method};

/// Session cookie the CDN requires on every media request.
pub const REQ_PAYLOAD_COOKIE: &str = "reqPayload";

/// Download and parse an HLS master manifest into a bitrate-to-playable-URL
/// mapping. Bitrates are kbps (`bandwidth / 1000`) keyed as numeric
/// strings; when two variants round to the same bitrate the later one
/// wins. A manifest with no variants yields an empty map, "no stream
/// available", not an error.
pub async fn parse_m3u8_manifest(
    session: &HttpSession,
    manifest_url: &str,
) -> Result<HashMap<String, String>, VueError> {
    let response = session.request(Method::Get, manifest_url, None, None).await?;
    let body = response.bytes().await?;

    let header_hint = session
        .cookie(REQ_PAYLOAD_COOKIE)
        .map(|value| cookie_header_hint(&value));

    build_bitrate_map(&body, manifest_url, header_hint.as_deref())
}

/// `Cookie=reqPayload%3D...`, the query-string-encoded header hint format
/// the host player understands.
fn cookie_header_hint(req_payload: &str) -> String {
    format!(
        "Cookie={}",
        urlencoding::encode(&format!("{}={}", REQ_PAYLOAD_COOKIE, req_payload))
    )
}

pub(crate) fn build_bitrate_map(
    body: &[u8],
    manifest_url: &str,
    header_hint: Option<&str>,
) -> Result<HashMap<String, String>, VueError> {
    let playlist =
        m3u8_rs::parse_playlist_res(body).map_err(|err| VueError::Manifest(err.to_string()))?;

    let mut streams = HashMap::new();
    let master = match playlist {
        Playlist::MasterPlaylist(master) => master,
        Playlist::MediaPlaylist(_) => {
            debug!("manifest is a media playlist, not a master; no variants to offer");
            return Ok(streams);
        }
    };

    let base_url = Url::parse(manifest_url)
        .map_err(|err| VueError::Manifest(format!("bad manifest url: {}", err)))?;

    for variant in master.variants {
        let bitrate = variant.bandwidth / 1000;
        let resolved = if variant.uri.starts_with("http") {
            variant.uri.clone()
        } else {
            base_url
                .join(&variant.uri)
                .map_err(|err| VueError::Manifest(format!("bad variant uri: {}", err)))?
                .to_string()
        };
        let playable = match header_hint {
            Some(hint) => format!("{}|{}", resolved, hint),
            None => resolved,
        };
        streams.insert(bitrate.to_string(), playable);
    }

    Ok(streams)
}

/// Available bitrates sorted numerically descending, for display or
/// selection.
pub fn sorted_bitrates_desc(bitrates: &HashMap<String, String>) -> Vec<String> {
    let mut kbps: Vec<u64> = bitrates.keys().filter_map(|b| b.parse().ok()).collect();
    kbps.sort_unstable_by(|a, b| b.cmp(a));
    kbps.into_iter().map(|b| b.to_string()).collect()
}

/// Pick a bitrate honoring the user's preference.
///
/// `Ask` always returns `None` so the caller can prompt with
/// [`sorted_bitrates_desc`]; `Limit` returns `None` when nothing fits
/// under the cap.
pub fn select_bitrate(
    bitrates: &HashMap<String, String>,
    preference: BitratePreference,
    max_bitrate_allowed: u32,
) -> Option<String> {
    let sorted = sorted_bitrates_desc(bitrates);
    match preference {
        BitratePreference::Highest => sorted.into_iter().next(),
        BitratePreference::Limit => {
            let allowed = sorted.into_iter().find(|bitrate| {
                bitrate
                    .parse::<u64>()
                    .map(|kbps| kbps <= u64::from(max_bitrate_allowed))
                    .unwrap_or(false)
            });
            if allowed.is_none() {
                debug!(max_bitrate_allowed, "no bitrate in stream under the allowed maximum");
            }
            allowed
        }
        BitratePreference::Ask => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1280x720\n\
high/stream.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=640x360\n\
https://cdn.example.com/low/stream.m3u8\n";

    const MANIFEST_URL: &str = "https://cdn.example.com/live/42/master.m3u8";

    #[test]
    fn bitrates_key_on_kbps_and_resolve_relative_uris() {
        let streams = build_bitrate_map(MASTER.as_bytes(), MANIFEST_URL, None).unwrap();
        assert_eq!(streams.len(), 2);
        assert_eq!(
            streams["5000"],
            "https://cdn.example.com/live/42/high/stream.m3u8"
        );
        // Absolute URIs pass through unchanged
        assert_eq!(streams["2500"], "https://cdn.example.com/low/stream.m3u8");
    }

    #[test]
    fn header_hint_is_appended_to_every_url() {
        let hint = cookie_header_hint("token==abc");
        let streams = build_bitrate_map(MASTER.as_bytes(), MANIFEST_URL, Some(&hint)).unwrap();
        assert_eq!(
            streams["2500"],
            "https://cdn.example.com/low/stream.m3u8|Cookie=reqPayload%3Dtoken%3D%3Dabc"
        );
    }

    #[test]
    fn duplicate_bitrates_keep_the_later_variant() {
        let manifest = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=1500999\n\
first.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=1500000\n\
second.m3u8\n";
        let streams = build_bitrate_map(manifest.as_bytes(), MANIFEST_URL, None).unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(
            streams["1500"],
            "https://cdn.example.com/live/42/second.m3u8"
        );
    }

    #[test]
    fn empty_master_yields_empty_map() {
        let streams = build_bitrate_map(b"#EXTM3U\n", MANIFEST_URL, None).unwrap();
        assert!(streams.is_empty());
    }

    fn sample_bitrates() -> HashMap<String, String> {
        ["500", "2500", "5000"]
            .iter()
            .map(|b| (b.to_string(), format!("https://cdn.example.com/{}.m3u8", b)))
            .collect()
    }

    #[test]
    fn highest_preference_picks_the_top_bitrate() {
        let choice = select_bitrate(&sample_bitrates(), BitratePreference::Highest, 0);
        assert_eq!(choice.as_deref(), Some("5000"));
    }

    #[test]
    fn limit_preference_respects_the_cap() {
        let bitrates = sample_bitrates();
        assert_eq!(
            select_bitrate(&bitrates, BitratePreference::Limit, 3000).as_deref(),
            Some("2500")
        );
        assert_eq!(
            select_bitrate(&bitrates, BitratePreference::Limit, 100),
            None
        );
    }

    #[test]
    fn ask_preference_defers_to_the_caller() {
        let bitrates = sample_bitrates();
        assert_eq!(select_bitrate(&bitrates, BitratePreference::Ask, 0), None);
        assert_eq!(sorted_bitrates_desc(&bitrates), vec!["5000", "2500", "500"]);
    }
}
