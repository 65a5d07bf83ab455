#![forbid(unsafe_code)]

//! Built-in album card style defaults.
//!
//! Key names match the JSON the web editor has always stored, so settings
//! saved by earlier versions load without migration.

use std::fmt;
use std::str::FromStr;

use crate::settings::{Configuration, Rgb, SettingValue};

/// Setting key names.
pub mod keys {
    pub const CARD_WIDTH_MM: &str = "cardWidthMm";
    pub const CARD_HEIGHT_MM: &str = "cardHeightMm";
    pub const CORNER_RADIUS_MM: &str = "cornerRadiusMm";
    pub const BACKGROUND_COLOR: &str = "backgroundColor";
    pub const TEXT_COLOR: &str = "textColor";
    pub const ACCENT_COLOR: &str = "accentColor";
    pub const THEME: &str = "theme";
    pub const FONT_SCALE: &str = "fontScale";
    pub const TRACKLIST_COLUMNS: &str = "tracklistColumns";
    pub const QR_CONTENT_MODE: &str = "qrContentMode";
    pub const QR_CUSTOM_TEXT: &str = "qrCustomText";
    pub const QR_SIZE_MM: &str = "qrSizeMm";
    pub const SHOW_QR: &str = "showQr";
    pub const SHOW_TRACKLIST: &str = "showTracklist";
    pub const SHOW_COVER: &str = "showCover";
    pub const SHOW_ARTIST: &str = "showArtist";
}

/// What the card's QR code points at.
///
/// Only the mode names live here; turning a mode into QR text is the job of
/// the formatter that consumes the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QrContentMode {
    AlbumId,
    Title,
    #[default]
    SpotifyLink,
    HaTag,
    Discogs,
    SpotifySearch,
    AppleMusic,
    Custom,
}

impl QrContentMode {
    pub const ALL: [Self; 8] = [
        Self::AlbumId,
        Self::Title,
        Self::SpotifyLink,
        Self::HaTag,
        Self::Discogs,
        Self::SpotifySearch,
        Self::AppleMusic,
        Self::Custom,
    ];

    /// Stored name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlbumId => "album-id",
            Self::Title => "title",
            Self::SpotifyLink => "spotify-link",
            Self::HaTag => "ha-tag",
            Self::Discogs => "discogs",
            Self::SpotifySearch => "spotify",
            Self::AppleMusic => "apple-music",
            Self::Custom => "custom",
        }
    }

    /// Read the mode from a configuration, falling back to the default for
    /// unrecognized names.
    #[must_use]
    pub fn from_configuration(config: &Configuration) -> Self {
        config
            .get_text(keys::QR_CONTENT_MODE)
            .and_then(|name| name.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for QrContentMode {
    type Err = UnknownQrMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownQrMode(s.to_owned()))
    }
}

impl fmt::Display for QrContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<QrContentMode> for SettingValue {
    fn from(mode: QrContentMode) -> Self {
        SettingValue::Text(mode.as_str().to_owned())
    }
}

/// A QR mode name that is not one of [`QrContentMode::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownQrMode(pub String);

impl fmt::Display for UnknownQrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown QR content mode '{}'", self.0)
    }
}

impl std::error::Error for UnknownQrMode {}

/// The built-in card style: a standard 63.5 x 88.9 mm trading card.
#[must_use]
pub fn defaults() -> Configuration {
    Configuration::from_trusted([
        (keys::CARD_WIDTH_MM, SettingValue::Number(63.5)),
        (keys::CARD_HEIGHT_MM, SettingValue::Number(88.9)),
        (keys::CORNER_RADIUS_MM, SettingValue::Number(3.0)),
        (
            keys::BACKGROUND_COLOR,
            SettingValue::Color(Rgb::new(0xff, 0xff, 0xff)),
        ),
        (
            keys::TEXT_COLOR,
            SettingValue::Color(Rgb::new(0x11, 0x11, 0x11)),
        ),
        (
            keys::ACCENT_COLOR,
            SettingValue::Color(Rgb::new(0x1d, 0xb9, 0x54)),
        ),
        (keys::THEME, SettingValue::Text("light".to_owned())),
        (keys::FONT_SCALE, SettingValue::Number(1.0)),
        (keys::TRACKLIST_COLUMNS, SettingValue::Integer(2)),
        (keys::QR_CONTENT_MODE, QrContentMode::default().into()),
        (keys::QR_CUSTOM_TEXT, SettingValue::Text(String::new())),
        (keys::QR_SIZE_MM, SettingValue::Number(18.0)),
        (keys::SHOW_QR, SettingValue::Bool(true)),
        (keys::SHOW_TRACKLIST, SettingValue::Bool(true)),
        (keys::SHOW_COVER, SettingValue::Bool(true)),
        (keys::SHOW_ARTIST, SettingValue::Bool(true)),
    ])
}
