//! Typed records decoded from the target application.

use crate::traits::ScriptError;
use serde::{Deserialize, Serialize};

/// Highest rating in the public star scale.
pub const MAX_STARS: u8 = 5;

/// Top of the application's internal rating scale.
pub const MAX_SCALE: u32 = 100;

/// Whether `star_value` maps every star count into `0..=MAX_SCALE`.
pub fn star_value_fits_scale(star_value: u32) -> bool {
    star_value > 0 && star_value.saturating_mul(u32::from(MAX_STARS)) <= MAX_SCALE
}

/// A star rating in `0..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Stars(u8);

impl Stars {
    pub fn new(stars: u8) -> Option<Self> {
        (stars <= MAX_STARS).then_some(Self(stars))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Value on the application's internal 0–100 scale.
    pub fn to_scale(self, star_value: u32) -> u32 {
        u32::from(self.0).saturating_mul(star_value)
    }

    /// Convert an internal rating back to stars, rounding half up.
    pub fn from_scale(raw: u32, star_value: u32) -> Self {
        let star_value = star_value.max(1);
        let stars = raw.saturating_add(star_value / 2) / star_value;
        Self(stars.min(u32::from(MAX_STARS)) as u8)
    }
}

/// The field set exactly as it comes off the query line.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
    pub rating: String,
}

/// The track the application is currently playing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    /// Length in seconds.
    pub duration: f64,
    /// Rating in stars.
    pub rating: u8,
}

impl Track {
    pub fn from_raw(raw: RawTrack, star_value: u32) -> Result<Self, ScriptError> {
        // Reals are coerced to text using the user's locale decimal mark.
        let duration = raw
            .duration
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| ScriptError::parse("track duration is not a number", raw.duration.clone()))?;
        let scaled = raw
            .rating
            .trim()
            .parse::<u32>()
            .map_err(|_| ScriptError::parse("track rating is not an integer", raw.rating.clone()))?;

        Ok(Self {
            id: raw.id,
            name: raw.name,
            artist: raw.artist,
            album: raw.album,
            duration,
            rating: Stars::from_scale(scaled, star_value).get(),
        })
    }
}
