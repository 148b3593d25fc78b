//! Content type detection for local files.

use std::path::Path;

/// Content type used when the extension is unknown or absent.
pub const FALLBACK_MIME_TYPE: &str = "text/plain";

/// Guess a file's content type from its extension.
pub fn classify(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_MIME_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(classify(Path::new("report.pdf")), "application/pdf");
        assert_eq!(classify(Path::new("/tmp/a/photo.JPG")), "image/jpeg");
        assert_eq!(classify(Path::new("song.mp3")), "audio/mpeg");
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        assert_eq!(classify(Path::new("notes.zzzunknown")), FALLBACK_MIME_TYPE);
        assert_eq!(classify(Path::new("README")), FALLBACK_MIME_TYPE);
    }
}
