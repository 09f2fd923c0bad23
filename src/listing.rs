//! Pure listing transforms: badge rendering, artwork selection, episode
//! info flattening and detail-view ordering. No state, no I/O; these are
//! the exact rules a host adapter applies to program records.

use chrono::{DateTime, Local, Utc};
use std::cmp::Ordering;

use crate::api::{ImageVariant, Program};
use crate::config::TimeNotation;
use crate::credentials::parse_iso8601;

/// Airing status badge colors, AARRGGBB as the host list markup expects.
pub fn badge_color(badge: &str) -> &'static str {
    match badge {
        "catchup" | "dvr" => "FF1E88F3",
        "live" => "FFD20815",
        "vod" => "FFABCC05",
        "coming_up" => "FF333333",
        _ => "FFFFFFFF",
    }
}

/// Badge display text: upper-cased, underscores become spaces.
pub fn badge_label(badge: &str) -> String {
    badge.replace('_', " ").to_uppercase()
}

/// De-duplicated badge labels for a program's airings.
///
/// "COMING UP" is noise when the program is already watchable some other
/// way, so it is suppressed whenever any non-coming_up badge exists.
pub fn airing_badges(program: &Program) -> Vec<String> {
    let has_current_airing = program
        .airings
        .iter()
        .any(|airing| airing.badge != "coming_up");

    let mut labels = Vec::new();
    for airing in &program.airings {
        if airing.badge == "coming_up" && has_current_airing {
            continue;
        }
        let label = badge_label(&airing.badge);
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// The "LIVE/VOD: Title" prefix line for a list entry.
pub fn status_line(program: &Program) -> String {
    airing_badges(program).join("/")
}

/// Pick the image variant with the numerically largest width.
/// Ties keep the earlier entry.
pub fn best_image(images: &[ImageVariant]) -> Option<&str> {
    let mut best: Option<&ImageVariant> = None;
    for image in images {
        if best.map_or(true, |current| image.width > current.width) {
            best = Some(image);
        }
    }
    best.map(|image| image.src.as_str())
}

/// Genre names joined with ", ".
pub fn genre_line(program: &Program) -> String {
    program
        .genres
        .iter()
        .map(|genre| genre.genre.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_live(program: &Program) -> bool {
    program.airings.iter().any(|airing| airing.badge == "live")
}

fn airing_timestamp(program: &Program) -> Option<DateTime<Utc>> {
    program.airing_date.as_deref().and_then(parse_iso8601)
}

/// Order a detailed listing: airing date ascending, with any live-badged
/// program forced to the top regardless of date. Undated entries sort
/// after dated ones.
pub fn sort_detailed(programs: &mut [Program]) {
    programs.sort_by(|a, b| {
        match is_live(b).cmp(&is_live(a)) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match (airing_timestamp(a), airing_timestamp(b)) {
            (Some(a_date), Some(b_date)) => a_date.cmp(&b_date),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// Render an airing time in the user's local timezone and notation.
pub fn format_airing_time(timestamp: &DateTime<Utc>, notation: TimeNotation) -> String {
    let local = timestamp.with_timezone(&Local);
    match notation {
        TimeNotation::H12 => local.format("%-I:%M %p").to_string(),
        TimeNotation::H24 => local.format("%H:%M").to_string(),
    }
}

/// Media kind the host uses for view hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Movie,
    TvShow,
    Episode,
}

/// Flattened listing metadata for one program record.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingInfo {
    pub title: Option<String>,
    pub tvshow_title: Option<String>,
    pub plot: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub genre: String,
    /// Local air date, YYYY-MM-DD
    pub aired: Option<String>,
    pub media_type: MediaType,
}

pub fn listing_info(program: &Program) -> ListingInfo {
    let is_movie = program.sentv_type == "Movies";

    let (title, plot, media_type) = if program.detailed {
        if is_movie {
            (
                program.title.clone(),
                program.synopsis.clone(),
                MediaType::Movie,
            )
        } else {
            (
                program.display_episode_title.clone(),
                program.synopsis.clone(),
                MediaType::Episode,
            )
        }
    } else {
        let plot = program
            .series_synopsis
            .clone()
            .or_else(|| program.synopsis.clone());
        let media_type = if is_movie {
            MediaType::Movie
        } else {
            MediaType::TvShow
        };
        (program.title.clone(), plot, media_type)
    };

    let aired = airing_timestamp(program)
        .map(|date| date.with_timezone(&Local).format("%Y-%m-%d").to_string());

    ListingInfo {
        title,
        tvshow_title: if is_movie { None } else { program.title.clone() },
        plot,
        season: program.season_num.clone(),
        episode: program.episode_num.clone(),
        genre: genre_line(program),
        aired,
        media_type,
    }
}

/// Artwork slots for one program record. Channel records reuse their own
/// logo in every slot; program records take the channel logo as clearlogo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artwork {
    pub thumb: Option<String>,
    pub fanart: Option<String>,
    pub cover: Option<String>,
    pub clearlogo: Option<String>,
}

pub fn artwork(program: &Program) -> Artwork {
    let program_image = program
        .urls
        .as_deref()
        .and_then(best_image)
        .map(str::to_string);
    let channel_image = program
        .channel
        .as_ref()
        .and_then(|channel| channel.urls.as_deref())
        .and_then(best_image)
        .map(str::to_string);

    if program.sentv_type == "channel" {
        Artwork {
            thumb: program_image.clone(),
            clearlogo: program_image,
            fanart: None,
            cover: None,
        }
    } else {
        Artwork {
            thumb: program_image.clone(),
            fanart: program_image.clone(),
            cover: program_image,
            clearlogo: channel_image,
        }
    }
}
