//! # Media Type Classification
//!
//! Tabella fissa estensione → categoria usata per classificare ogni asset.
//! Le categorie sono ordinate; la prima che contiene l'estensione vince.
//! Solo le immagini (`jpg`, `jpeg`, `png`, `gif`) sono accettate in upload.

use serde::Serialize;
use std::fmt;

/// Category of an imported file, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    File,
    Font,
    Code,
    Log,
    Db,
    Unknown,
}

/// Ordered category table
const MEDIA_TYPES: &[(MediaType, &[&str])] = &[
    (MediaType::Image, &["jpg", "jpeg", "png", "gif"]),
    (
        MediaType::Video,
        &["mp4", "m4v", "mkv", "webm", "mov", "avi", "wmv", "mpg", "flv"],
    ),
    (
        MediaType::Audio,
        &["mid", "mp3", "m4a", "ogg", "flac", "wav", "amr"],
    ),
    (
        MediaType::File,
        &[
            "txt", "pdf", "rtf", "epub", "zip", "tar", "rar", "gz", "bz2", "7z", "xz", "exe",
            "swf", "eot", "ps", "nes", "crx", "cab", "deb", "ar", "z", "lz", "hph",
        ],
    ),
    (MediaType::Font, &["woff", "woff2", "ttf", "otf"]),
    (
        MediaType::Code,
        &["xml", "php", "py", "json", "js", "html", "css", "scss", "sass", "less"],
    ),
    (MediaType::Log, &["log"]),
    (MediaType::Db, &["sqlite", "sql", "mmdb"]),
];

impl MediaType {
    /// Classify an extension (without the leading dot), case-insensitively
    pub fn classify(extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_lowercase();
        MEDIA_TYPES
            .iter()
            .find(|(_, extensions)| extensions.contains(&ext.as_str()))
            .map(|(media_type, _)| *media_type)
            .unwrap_or(MediaType::Unknown)
    }

    /// Whether an extension is accepted for upload
    pub fn is_accepted_image(extension: &str) -> bool {
        Self::classify(extension) == MediaType::Image
    }

    /// Lowercase label, as shown in listings
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::File => "file",
            MediaType::Font => "font",
            MediaType::Code => "code",
            MediaType::Log => "log",
            MediaType::Db => "db",
            MediaType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Image encodings the planner and the geotag writer distinguish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Other,
}

impl ImageKind {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" => ImageKind::Jpeg,
            "png" => ImageKind::Png,
            "gif" => ImageKind::Gif,
            _ => ImageKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_each_category() {
        assert_eq!(MediaType::classify("jpg"), MediaType::Image);
        assert_eq!(MediaType::classify("mov"), MediaType::Video);
        assert_eq!(MediaType::classify("flac"), MediaType::Audio);
        assert_eq!(MediaType::classify("pdf"), MediaType::File);
        assert_eq!(MediaType::classify("woff2"), MediaType::Font);
        assert_eq!(MediaType::classify("json"), MediaType::Code);
        assert_eq!(MediaType::classify("log"), MediaType::Log);
        assert_eq!(MediaType::classify("sqlite"), MediaType::Db);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(MediaType::classify("PNG"), MediaType::Image);
        assert_eq!(MediaType::classify("Z"), MediaType::File);
        assert_eq!(MediaType::classify(".Gif"), MediaType::Image);
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(MediaType::classify("heic"), MediaType::Unknown);
        assert_eq!(MediaType::classify(""), MediaType::Unknown);
        assert_eq!(MediaType::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_only_images_are_accepted() {
        assert!(MediaType::is_accepted_image("JPEG"));
        assert!(MediaType::is_accepted_image("gif"));
        assert!(!MediaType::is_accepted_image("webp"));
        assert!(!MediaType::is_accepted_image("mp4"));
    }

    #[test]
    fn test_image_kind() {
        assert_eq!(ImageKind::from_extension("JPG"), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_extension("jpeg"), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_extension("png"), ImageKind::Png);
        assert_eq!(ImageKind::from_extension("gif"), ImageKind::Gif);
        assert_eq!(ImageKind::from_extension("bmp"), ImageKind::Other);
    }
}
