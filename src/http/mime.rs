//! MIME type lookup module
//!
//! Returns the Content-Type header value for a file extension.

/// Get the Content-Type for a file extension.
///
/// The extension includes the leading dot and is matched case-insensitively.
/// Unknown extensions fall back to `application/octet-stream`.
///
/// # Examples
/// ```
/// use spa_server::http::mime::content_type_for;
/// assert_eq!(content_type_for(".html"), "text/html; charset=utf-8");
/// assert_eq!(content_type_for(".css"), "text/css");
/// assert_eq!(content_type_for(""), "application/octet-stream");
/// ```
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        // Text
        ".html" => "text/html; charset=utf-8",
        ".css" => "text/css",
        ".txt" => "text/plain",
        ".xml" => "application/xml",

        // JavaScript/JSON
        ".js" => "application/javascript",
        ".json" => "application/json",

        // Images
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".svg" => "image/svg+xml",
        ".ico" => "image/x-icon",
        ".webp" => "image/webp",

        // Fonts
        ".woff" => "font/woff",
        ".woff2" => "font/woff2",
        ".ttf" => "font/ttf",
        ".otf" => "font/otf",
        ".eot" => "application/vnd.ms-fontobject",

        // Default
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(content_type_for(".html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for(".css"), "text/css");
        assert_eq!(content_type_for(".js"), "application/javascript");
        assert_eq!(content_type_for(".json"), "application/json");
        assert_eq!(content_type_for(".png"), "image/png");
        assert_eq!(content_type_for(".woff2"), "font/woff2");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(content_type_for(".CSS"), "text/css");
        assert_eq!(content_type_for(".Jpg"), "image/jpeg");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(content_type_for(".unknownext"), "application/octet-stream");
        assert_eq!(content_type_for(""), "application/octet-stream");
    }
}
