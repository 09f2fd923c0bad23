//! Vendor API models and the catalog client.
//!
//! The vendor's JSON is loosely shaped: ids arrive as strings or numbers,
//! optional blocks go missing per item, and the same logical concept is
//! sometimes a mapping and sometimes a sequence. The models here absorb all
//! of that at the serde boundary so callers never branch on shape. Absent
//! optional fields become `None` (logged at debug) rather than a failure.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::VendorConfig;
use crate::credentials::{CredentialStore, CredentialUpdate};
use crate::errors::VueError;
use crate::manifest;
use crate::session::{HttpSession, Method, Payload};

/// Client app version declared to the vendor; also keys the configuration
/// document cache.
pub const APP_VERSION: &str = "2_6_1";

pub const DEFAULT_OFFSET: &str = "0";
pub const DEFAULT_SIZE: &str = "999";

const STREAM_BASE_URL: &str = "https://media-framework.totsuko.tv/media-framework/media/v2.1/stream";

fn pad_base_url() -> String {
    format!("https://sonyios.secure.footprint.net/{}/pad/", APP_VERSION)
}

fn deserialize_flex_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: Value = Deserialize::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        _ => Err(D::Error::custom("expected string, number, or null")),
    }
}

fn deserialize_flex_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(number) => number.as_u64().map(|n| n as u32),
        Value::String(text) => text.parse().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or(0))
}

// Vendor documents wrap everything in { header, body }; errors ride in the
// header regardless of which endpoint produced them.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    header: Option<EnvelopeHeader>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeHeader {
    #[serde(default)]
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
}

impl RequestMethod {
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("post") {
            RequestMethod::Post
        } else {
            RequestMethod::Get
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Get => "get",
            RequestMethod::Post => "post",
        }
    }
}

#[derive(Debug, Deserialize)]
struct MenuDocument {
    body: MenuBody,
}

#[derive(Debug, Deserialize)]
struct MenuBody {
    #[serde(default)]
    sections: Vec<MenuSection>,
}

#[derive(Debug, Deserialize)]
struct MenuSection {
    #[serde(default)]
    items: Vec<Category>,
}

/// A top-level catalog category from the menu document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub template_type: String,
}

/// One way of listing a category or channel: a titled URI plus the request
/// method the endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sorting {
    pub title: String,
    pub uri: String,
    pub request_method: RequestMethod,
}

#[derive(Debug, Deserialize)]
struct CategoryDetailDocument {
    body: CategoryDetailBody,
}

#[derive(Debug, Default, Deserialize)]
struct CategoryDetailBody {
    #[serde(default)]
    expandable_grids: Vec<ExpandableGrid>,
    #[serde(default)]
    sort: Option<SortBlock>,
}

#[derive(Debug, Deserialize)]
struct ExpandableGrid {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    request_method: Option<String>,
    #[serde(default)]
    default_sort_option: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SortBlock {
    #[serde(default)]
    values: Vec<SortValue>,
}

#[derive(Debug, Deserialize)]
struct SortValue {
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ChannelDetailDocument {
    #[serde(default)]
    body: HashMap<String, Value>,
}

// The channel detail body maps keys to either one section node or a list
// of them; normalize both shapes here instead of branching in callers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(ChannelSection),
    Many(Vec<ChannelSection>),
}

#[derive(Debug, Deserialize)]
struct ChannelSection {
    title: String,
    url: String,
    detail_section: String,
}

#[derive(Debug, Deserialize)]
struct ProgramsDocument {
    body: ProgramsBody,
}

#[derive(Debug, Default, Deserialize)]
struct ProgramsBody {
    #[serde(default)]
    items: Vec<Program>,
}

/// Normalized catalog entry; lives for one listing request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Program {
    #[serde(default, deserialize_with = "deserialize_flex_string")]
    pub id: Option<String>,
    /// Vendor content type: "channel", "Movies", show/episode kinds
    #[serde(default)]
    pub sentv_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub display_episode_title: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub series_synopsis: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flex_string")]
    pub season_num: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flex_string")]
    pub episode_num: Option<String>,
    #[serde(default)]
    pub airing_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub airings: Vec<Airing>,
    #[serde(default)]
    pub playable: bool,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub favorite_date: Option<String>,
    #[serde(default)]
    pub urls: Option<Vec<ImageVariant>>,
    #[serde(default)]
    pub channel: Option<ChannelRef>,
    /// True when this record came from a program-detail request rather
    /// than a summary listing. Set by the client, not by the vendor.
    #[serde(skip_deserializing, default)]
    pub detailed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Genre {
    #[serde(default)]
    pub genre: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Airing {
    #[serde(default, deserialize_with = "deserialize_flex_string")]
    pub airing_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flex_string")]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub badge: String,
    #[serde(rename = "type", default)]
    pub airing_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImageVariant {
    #[serde(default)]
    pub src: String,
    #[serde(default, deserialize_with = "deserialize_flex_u32")]
    pub width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChannelRef {
    #[serde(default)]
    pub urls: Option<Vec<ImageVariant>>,
}

#[derive(Debug, Deserialize)]
struct ProfilesDocument {
    body: ProfilesBody,
}

#[derive(Debug, Default, Deserialize)]
struct ProfilesBody {
    #[serde(default)]
    profiles: Vec<Profile>,
}

/// A sub-account within one subscriber account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "deserialize_flex_string")]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub profile_name: String,
}

#[derive(Debug, Deserialize)]
struct ProfileDetailDocument {
    body: ProfileDetailBody,
}

#[derive(Debug, Deserialize)]
struct ProfileDetailBody {
    #[serde(default)]
    favorites: Value,
}

#[derive(Debug, Deserialize)]
struct StreamDocument {
    body: StreamBody,
}

#[derive(Debug, Deserialize)]
struct StreamBody {
    #[serde(default)]
    video: Option<String>,
}

/// Resolved stream for one airing or channel: the manifest URL and its
/// bitrate-to-playable-URL mapping. Built fresh per playback request.
#[derive(Debug, Clone)]
pub struct StreamSource {
    pub manifest: String,
    pub bitrates: HashMap<String, String>,
}

/// Client for the PS Vue API: one instance per process, owning the HTTP
/// session, credential store and vendor configuration.
pub struct VueClient {
    base_url: String,
    save_path: PathBuf,
    session: HttpSession,
    credentials: CredentialStore,
    config: VendorConfig,
}

impl VueClient {
    /// Construct a client rooted at `save_path`, fetching the vendor
    /// configuration if the cached copy is missing or outdated.
    pub async fn new(save_path: &Path, verify_ssl: bool) -> Result<Self, VueError> {
        fs::create_dir_all(save_path)?;
        let session = HttpSession::new(save_path, verify_ssl)?;
        let base_url = pad_base_url();
        let config =
            VendorConfig::load_or_fetch(&session, save_path, &base_url, APP_VERSION).await?;
        Ok(Self {
            base_url,
            save_path: save_path.to_path_buf(),
            session,
            credentials: CredentialStore::new(save_path),
            config,
        })
    }

    /// Construct a client with an already-known vendor configuration,
    /// skipping the configuration fetch.
    pub fn with_config(
        save_path: &Path,
        verify_ssl: bool,
        config: VendorConfig,
    ) -> Result<Self, VueError> {
        fs::create_dir_all(save_path)?;
        Ok(Self {
            base_url: pad_base_url(),
            save_path: save_path.to_path_buf(),
            session: HttpSession::new(save_path, verify_ssl)?,
            credentials: CredentialStore::new(save_path),
            config,
        })
    }

    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Fetch a JSON document, surfacing any vendor error envelope as
    /// [`VueError::Vendor`] before shaping the body.
    pub(crate) async fn fetch_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        payload: Option<Payload<'_>>,
        headers: Option<HeaderMap>,
    ) -> Result<T, VueError> {
        let response = self.session.request(method, url, payload, headers).await?;
        let text = response.text().await?;

        let envelope: Envelope = serde_json::from_str(&text)?;
        if let Some(message) = envelope
            .header
            .and_then(|header| header.error)
            .and_then(|error| error.message)
        {
            return Err(VueError::Vendor { message });
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// List the top-level catalog categories from the static menu document.
    pub async fn get_categories(&self) -> Result<Vec<Category>, VueError> {
        let url = format!("{}menu.json", self.base_url);
        let document: MenuDocument = self.fetch_json(Method::Get, &url, None, None).await?;

        Ok(document
            .body
            .sections
            .into_iter()
            .flat_map(|section| section.items)
            .filter(|item| item.template_type == "category")
            .collect())
    }

    /// List the available sortings for a category detail document.
    pub async fn parse_category_sortings(
        &self,
        uri: &str,
        offset: &str,
        size: &str,
    ) -> Result<Vec<Sorting>, VueError> {
        let url = format!("{}{}", self.base_url, uri);
        let document: CategoryDetailDocument =
            self.fetch_json(Method::Get, &url, None, None).await?;
        Ok(flatten_category_sortings(document.body, offset, size))
    }

    /// List the available sortings/sections for a channel (or other typed
    /// entity) detail document.
    pub async fn parse_channel_sortings(
        &self,
        channel_id: &str,
        entity_type: &str,
        offset: &str,
        size: &str,
    ) -> Result<Vec<Sorting>, VueError> {
        let url = format!("{}{}", self.base_url, self.config.channel);
        let document: ChannelDetailDocument =
            self.fetch_json(Method::Get, &url, None, None).await?;
        Ok(flatten_channel_sortings(
            document.body,
            channel_id,
            entity_type,
            offset,
            size,
        ))
    }

    /// Retrieve programs by listing URI, program id, or search query.
    ///
    /// Exactly one selector is expected. With no selector at all this
    /// returns an empty listing without touching the network. Records from
    /// a program-id request are tagged `detailed`.
    pub async fn get_programs(
        &self,
        method: RequestMethod,
        uri: Option<&str>,
        program_id: Option<&str>,
        search_query: Option<&str>,
        expiration_filter: Option<&str>,
        offset: &str,
        size: &str,
    ) -> Result<Vec<Program>, VueError> {
        let url = match program_listing_url(
            &self.config.epg_content_base_url,
            uri,
            program_id,
            search_query,
            expiration_filter,
            offset,
            size,
        ) {
            Some(url) => url,
            None => {
                debug!("no URI/program id/search query supplied; returning empty listing");
                return Ok(Vec::new());
            }
        };

        let (payload, headers) = match method {
            RequestMethod::Post => {
                // profile_data is required with all post requests
                let profile_data = self
                    .credentials
                    .load()?
                    .profile_data
                    .unwrap_or(Value::Null);
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                (
                    Some(Payload::Json(serde_json::to_string(&profile_data)?)),
                    Some(headers),
                )
            }
            RequestMethod::Get => (None, None),
        };

        let session_method = match method {
            RequestMethod::Get => Method::Get,
            RequestMethod::Post => Method::Post,
        };
        let document: ProgramsDocument = self
            .fetch_json(session_method, &url, payload, headers)
            .await?;

        let detailed = program_id.is_some();
        let mut programs = document.body.items;
        for program in &mut programs {
            program.detailed = detailed;
        }
        Ok(programs)
    }

    /// List the account's profiles.
    pub async fn get_profiles(&self) -> Result<Vec<Profile>, VueError> {
        let url = format!("{}profile/ids", self.config.epg_user_session_base_url);
        let document: ProfilesDocument = self.fetch_json(Method::Get, &url, None, None).await?;
        Ok(document.body.profiles)
    }

    pub async fn get_profile_names(&self) -> Result<Vec<String>, VueError> {
        let profiles = self.get_profiles().await?;
        Ok(profiles
            .into_iter()
            .map(|profile| profile.profile_name)
            .collect())
    }

    /// Select a profile by name and persist its favorites payload, which
    /// later POST requests require. Returns false when no profile matches,
    /// so the caller can prompt for another choice.
    pub async fn set_profile(&self, profile_name: &str) -> Result<bool, VueError> {
        let profiles = self.get_profiles().await?;
        let matched = profiles.into_iter().find(|profile| {
            profile.profile_name == profile_name && profile.profile_id.is_some()
        });

        let Some(profile) = matched else {
            warn!(profile_name, "no profile in response matched the provided name");
            return Ok(false);
        };

        let profile_id = profile.profile_id.unwrap_or_default();
        let url = format!(
            "{}profile/{}",
            self.config.epg_user_session_base_url, profile_id
        );
        let document: ProfileDetailDocument =
            self.fetch_json(Method::Get, &url, None, None).await?;

        self.credentials.save(CredentialUpdate {
            profile_data: Some(json!({
                "profile_data": { "favorites": document.body.favorites }
            })),
            ..Default::default()
        })?;
        Ok(true)
    }

    /// Resolve the playable stream for a specific airing.
    pub async fn get_stream_url(&self, airing_id: &str) -> Result<StreamSource, VueError> {
        self.stream_source(&format!("{}/airing/{}", STREAM_BASE_URL, airing_id))
            .await
    }

    /// Resolve the playable stream for a live channel.
    pub async fn get_channel_stream_url(
        &self,
        channel_id: &str,
    ) -> Result<StreamSource, VueError> {
        self.stream_source(&format!("{}/channel/{}", STREAM_BASE_URL, channel_id))
            .await
    }

    async fn stream_source(&self, url: &str) -> Result<StreamSource, VueError> {
        let document: StreamDocument = self.fetch_json(Method::Get, url, None, None).await?;
        let manifest = document
            .body
            .video
            .ok_or(VueError::MissingField("body.video"))?;
        let bitrates = manifest::parse_m3u8_manifest(&self.session, &manifest).await?;
        Ok(StreamSource { manifest, bitrates })
    }
}

/// Resolve which profile to activate before listing: the configured name
/// when one is set, otherwise the account's only profile. `None` means
/// the account has several profiles and the caller must ask the user.
pub fn choose_profile_name(configured: &str, available: &[String]) -> Option<String> {
    if !configured.is_empty() {
        return Some(configured.to_string());
    }
    match available {
        [only] => Some(only.clone()),
        _ => None,
    }
}

fn substitute(template: &str, replacements: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (placeholder, value) in replacements {
        out = out.replace(placeholder, value);
    }
    out
}

fn flatten_category_sortings(body: CategoryDetailBody, offset: &str, size: &str) -> Vec<Sorting> {
    let mut sortings = Vec::new();

    for grid in &body.expandable_grids {
        let request_method = grid
            .request_method
            .as_deref()
            .map(RequestMethod::parse)
            .unwrap_or_default();

        match &body.sort {
            Some(sort) => {
                for value in &sort.values {
                    sortings.push(Sorting {
                        title: value.value.clone(),
                        uri: substitute(&grid.url, &[("<sort>", &value.key)]),
                        request_method,
                    });
                }
            }
            None => {
                let default_sort = grid.default_sort_option.as_deref().unwrap_or("");
                sortings.push(Sorting {
                    title: grid.title.clone(),
                    uri: substitute(&grid.url, &[("<sort>", default_sort)]),
                    request_method,
                });
            }
        }
    }

    for sorting in &mut sortings {
        sorting.uri = substitute(&sorting.uri, &[("<offset>", offset), ("<size>", size)]);
    }
    sortings
}

fn flatten_channel_sortings(
    body: HashMap<String, Value>,
    channel_id: &str,
    entity_type: &str,
    offset: &str,
    size: &str,
) -> Vec<Sorting> {
    let mut sections = Vec::new();
    for (key, value) in body {
        match serde_json::from_value::<OneOrMany>(value) {
            Ok(OneOrMany::One(section)) => sections.push(section),
            Ok(OneOrMany::Many(list)) => sections.extend(list),
            Err(err) => {
                // Keys that are not section nodes (version stamps etc.) are
                // expected; skip them but keep a trace for API drift.
                debug!(key, error = %err, "channel detail key is not a section node");
            }
        }
    }

    sections
        .into_iter()
        .map(|section| Sorting {
            title: section.title,
            uri: substitute(
                &section.url,
                &[
                    ("<section>", section.detail_section.as_str()),
                    ("<type>", entity_type),
                    ("<id>", channel_id),
                    ("<offset>", offset),
                    ("<size>", size),
                ],
            ),
            request_method: RequestMethod::Get,
        })
        .collect()
}

fn program_listing_url(
    content_base_url: &str,
    uri: Option<&str>,
    program_id: Option<&str>,
    search_query: Option<&str>,
    expiration_filter: Option<&str>,
    offset: &str,
    size: &str,
) -> Option<String> {
    if let Some(uri) = uri {
        return Some(format!("{}{}", content_base_url, uri));
    }
    if let Some(program_id) = program_id {
        let mut url = format!(
            "{}details/items/program/{}/episodes/offset/{}/size/{}",
            content_base_url, program_id, offset, size
        );
        if let Some(filter) = expiration_filter {
            url.push_str(&format!("/expiration_filter/{}", filter));
        }
        return Some(url);
    }
    if let Some(query) = search_query {
        return Some(format!(
            "{}search/items/{}/offset/{}/size/{}",
            content_base_url, query, offset, size
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_sortings_expand_sort_values() {
        let body: CategoryDetailBody = serde_json::from_value(json!({
            "expandable_grids": [
                { "title": "Shows", "url": "items/<sort>/offset/<offset>/size/<size>", "request_method": "POST" }
            ],
            "sort": { "values": [
                { "key": "popularity", "value": "Popular" },
                { "key": "alpha", "value": "A-Z" }
            ]}
        }))
        .unwrap();

        let sortings = flatten_category_sortings(body, "0", "999");
        assert_eq!(sortings.len(), 2);
        assert_eq!(sortings[0].title, "Popular");
        assert_eq!(sortings[0].uri, "items/popularity/offset/0/size/999");
        assert_eq!(sortings[0].request_method, RequestMethod::Post);
        assert_eq!(sortings[1].uri, "items/alpha/offset/0/size/999");
    }

    #[test]
    fn category_sortings_fall_back_to_default_sort_option() {
        let body: CategoryDetailBody = serde_json::from_value(json!({
            "expandable_grids": [
                { "title": "All Movies", "url": "movies/<sort>/offset/<offset>/size/<size>",
                  "default_sort_option": "airing_date" }
            ]
        }))
        .unwrap();

        let sortings = flatten_category_sortings(body, "10", "50");
        assert_eq!(sortings.len(), 1);
        assert_eq!(sortings[0].title, "All Movies");
        assert_eq!(sortings[0].uri, "movies/airing_date/offset/10/size/50");
        assert_eq!(sortings[0].request_method, RequestMethod::Get);
    }

    #[test]
    fn channel_sortings_normalize_single_and_list_nodes() {
        let body: HashMap<String, Value> = serde_json::from_value(json!({
            "now_playing": {
                "title": "On Now",
                "url": "detail/<type>/<id>/<section>/offset/<offset>/size/<size>",
                "detail_section": "now"
            },
            "groups": [
                { "title": "Shows", "url": "detail/<type>/<id>/<section>/offset/<offset>/size/<size>", "detail_section": "shows" },
                { "title": "Movies", "url": "detail/<type>/<id>/<section>/offset/<offset>/size/<size>", "detail_section": "movies" }
            ],
            "version": "2.6.1"
        }))
        .unwrap();

        let mut sortings = flatten_channel_sortings(body, "42", "channel", "0", "999");
        sortings.sort_by(|a, b| a.title.cmp(&b.title));

        assert_eq!(sortings.len(), 3);
        assert_eq!(sortings[1].title, "On Now");
        assert_eq!(sortings[1].uri, "detail/channel/42/now/offset/0/size/999");
        assert_eq!(sortings[2].uri, "detail/channel/42/shows/offset/0/size/999");
    }

    #[test]
    fn listing_url_prefers_uri_then_program_then_search() {
        let base = "https://epg.example.com/";
        assert_eq!(
            program_listing_url(base, Some("items/all"), None, None, None, "0", "999").unwrap(),
            "https://epg.example.com/items/all"
        );
        assert_eq!(
            program_listing_url(base, None, Some("p1"), None, None, "0", "999").unwrap(),
            "https://epg.example.com/details/items/program/p1/episodes/offset/0/size/999"
        );
        assert_eq!(
            program_listing_url(
                base,
                None,
                Some("p1"),
                None,
                Some("2026-01-01T00:00:00Z"),
                "0",
                "999"
            )
            .unwrap(),
            "https://epg.example.com/details/items/program/p1/episodes/offset/0/size/999/expiration_filter/2026-01-01T00:00:00Z"
        );
        assert_eq!(
            program_listing_url(base, None, None, Some("kitchen"), None, "0", "999").unwrap(),
            "https://epg.example.com/search/items/kitchen/offset/0/size/999"
        );
        assert!(program_listing_url(base, None, None, None, None, "0", "999").is_none());
    }

    #[test]
    fn program_tolerates_mixed_id_shapes_and_missing_fields() {
        let program: Program = serde_json::from_value(json!({
            "id": 12345,
            "sentv_type": "channel",
            "airings": [{ "airing_id": 9, "badge": "live", "type": "live" }]
        }))
        .unwrap();

        assert_eq!(program.id.as_deref(), Some("12345"));
        assert_eq!(program.airings[0].airing_id.as_deref(), Some("9"));
        assert_eq!(program.title, None);
        assert_eq!(program.urls, None);
        assert!(!program.detailed);
    }

    #[test]
    fn image_width_parses_from_string_or_number() {
        let images: Vec<ImageVariant> = serde_json::from_value(json!([
            { "src": "a.jpg", "width": "640" },
            { "src": "b.jpg", "width": 1280 },
            { "src": "c.jpg" }
        ]))
        .unwrap();
        assert_eq!(images[0].width, 640);
        assert_eq!(images[1].width, 1280);
        assert_eq!(images[2].width, 0);
    }

    #[test]
    fn configured_profile_name_wins() {
        let available = vec!["Kids".to_string(), "Main".to_string()];
        assert_eq!(
            choose_profile_name("Main", &available).as_deref(),
            Some("Main")
        );
    }

    #[test]
    fn single_profile_is_chosen_when_nothing_is_configured() {
        let one = vec!["Main".to_string()];
        assert_eq!(choose_profile_name("", &one).as_deref(), Some("Main"));

        let several = vec!["Kids".to_string(), "Main".to_string()];
        assert_eq!(choose_profile_name("", &several), None);
        assert_eq!(choose_profile_name("", &[]), None);
    }

    #[test]
    fn envelope_error_message_is_detected() {
        let envelope: Envelope = serde_json::from_str(
            r#"{ "header": { "error": { "message": "ineligible" } }, "body": {} }"#,
        )
        .unwrap();
        let message = envelope
            .header
            .and_then(|h| h.error)
            .and_then(|e| e.message);
        assert_eq!(message.as_deref(), Some("ineligible"));
    }
}
