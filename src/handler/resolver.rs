//! Request resolution module
//!
//! Maps a raw request path to a terminal (status, headers, body) decision:
//! path normalization, percent-decoding, serve-root confinement, directory
//! index dispatch, and single-page-application fallback.

use crate::http::mime;
use crate::logger;
use hyper::body::Bytes;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

const INDEX_FILE: &str = "index.html";

const CACHE_LONG_LIVED: &str = "public, max-age=31536000";
const CACHE_NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// Extensions of hashed/static assets that clients may cache long-term.
const LONG_CACHE_EXTENSIONS: [&str; 9] = [
    ".js", ".css", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".woff", ".woff2",
];

/// Filesystem classification of a confined candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    RegularFile(PathBuf),
    Directory(PathBuf),
    NotFound,
}

/// A resolved response decision, prior to transport-level transmission.
///
/// Header names never repeat; insertion order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePlan {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Bytes,
}

impl ResponsePlan {
    /// Look up a header value by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn plain_text(status: u16, body: &'static str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", "text/plain".to_string())],
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    fn forbidden() -> Self {
        Self::plain_text(403, "403 Forbidden")
    }

    fn not_found() -> Self {
        Self::plain_text(404, "404 Not Found")
    }

    fn read_failed() -> Self {
        Self::plain_text(500, "500 Internal Server Error")
    }

    /// Root index served in place of a path that matched nothing on disk.
    /// Clients must revalidate every time so routed pages never go stale.
    fn spa_index(bytes: Vec<u8>) -> Self {
        Self {
            status: 200,
            headers: vec![
                ("Content-Type", "text/html; charset=utf-8".to_string()),
                ("Cache-Control", CACHE_NO_STORE.to_string()),
                ("Pragma", "no-cache".to_string()),
                ("Expires", "0".to_string()),
            ],
            body: Bytes::from(bytes),
        }
    }

    /// Index document of a directory that was requested directly.
    fn directory_index(bytes: Vec<u8>) -> Self {
        Self {
            status: 200,
            headers: vec![
                ("Content-Type", "text/html; charset=utf-8".to_string()),
                ("Cache-Control", CACHE_NO_STORE.to_string()),
            ],
            body: Bytes::from(bytes),
        }
    }

    fn static_file(bytes: Vec<u8>, extension: &str) -> Self {
        let cache_control = if LONG_CACHE_EXTENSIONS.contains(&extension) {
            CACHE_LONG_LIVED
        } else {
            CACHE_NO_STORE
        };
        Self {
            status: 200,
            headers: vec![
                ("Content-Type", mime::content_type_for(extension).to_string()),
                ("Access-Control-Allow-Origin", "*".to_string()),
                ("Cache-Control", cache_control.to_string()),
            ],
            body: Bytes::from(bytes),
        }
    }
}

/// Marker for a candidate whose canonical path left the serve root.
struct OutsideRoot;

/// Resolves request paths against a fixed serve root.
///
/// Holds no mutable state; every request re-reads the filesystem, so
/// content changes between requests are always observed.
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    /// Create a resolver confined to `root`.
    ///
    /// The root is canonicalized once here so later ancestry checks compare
    /// canonical paths. Fails when the root does not exist.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: root.as_ref().canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decide status, headers, and body for a raw request path.
    ///
    /// Every filesystem operation is attempted exactly once; failures map
    /// directly to terminal outcomes and never escape as errors.
    pub async fn resolve(&self, raw_path: &str) -> ResponsePlan {
        let path = normalize_path(raw_path);

        // Decode before the confinement check so encoded traversal
        // sequences cannot slip past it.
        let Some(decoded) = percent_decode(&path) else {
            // Undecodable bytes name no servable path.
            return self.spa_fallback().await;
        };

        let Some(relative) = confine(&decoded) else {
            logger::log_warning(&format!("Path traversal attempt blocked: {raw_path}"));
            return ResponsePlan::forbidden();
        };

        let candidate = self.root.join(relative);
        match self.classify(&candidate).await {
            Ok(ResolvedTarget::NotFound) => self.spa_fallback().await,
            Ok(ResolvedTarget::Directory(dir)) => self.serve_directory(&dir).await,
            Ok(ResolvedTarget::RegularFile(file)) => self.serve_file(&file).await,
            Err(OutsideRoot) => {
                logger::log_warning(&format!("Path traversal attempt blocked: {raw_path}"));
                ResponsePlan::forbidden()
            }
        }
    }

    /// Canonicalize the candidate and classify what it names on disk.
    ///
    /// Canonicalization resolves symlinks, so the ancestry check also
    /// catches links pointing outside the root. `Path::starts_with`
    /// compares whole segments; a sibling like `/srv/app-evil` does not
    /// pass for root `/srv/app`.
    async fn classify(&self, candidate: &Path) -> Result<ResolvedTarget, OutsideRoot> {
        let Ok(canonical) = fs::canonicalize(candidate).await else {
            return Ok(ResolvedTarget::NotFound);
        };
        if !canonical.starts_with(&self.root) {
            return Err(OutsideRoot);
        }
        match fs::metadata(&canonical).await {
            Ok(meta) if meta.is_dir() => Ok(ResolvedTarget::Directory(canonical)),
            Ok(_) => Ok(ResolvedTarget::RegularFile(canonical)),
            Err(_) => Ok(ResolvedTarget::NotFound),
        }
    }

    /// A directory serves its own index document or 404s; it never falls
    /// back to the root index.
    async fn serve_directory(&self, dir: &Path) -> ResponsePlan {
        match fs::read(dir.join(INDEX_FILE)).await {
            Ok(bytes) => ResponsePlan::directory_index(bytes),
            Err(_) => ResponsePlan::not_found(),
        }
    }

    /// Serve the root index document for a path that matched nothing,
    /// enabling client-side routing.
    async fn spa_fallback(&self) -> ResponsePlan {
        match fs::read(self.root.join(INDEX_FILE)).await {
            Ok(bytes) => ResponsePlan::spa_index(bytes),
            Err(_) => ResponsePlan::not_found(),
        }
    }

    async fn serve_file(&self, file: &Path) -> ResponsePlan {
        match fs::read(file).await {
            Ok(bytes) => ResponsePlan::static_file(bytes, &extension_of(file)),
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to read file '{}': {e}",
                    file.display()
                ));
                ResponsePlan::read_failed()
            }
        }
    }
}

/// Strip query string and fragment; a bare `/` means the root index document.
fn normalize_path(raw_path: &str) -> String {
    let end = raw_path.find(['?', '#']).unwrap_or(raw_path.len());
    let path = &raw_path[..end];
    if path.is_empty() || path == "/" {
        format!("/{INDEX_FILE}")
    } else {
        path.to_string()
    }
}

/// Decode `%XX` escapes, keeping malformed sequences literal.
///
/// Returns `None` when the decoded bytes are not valid UTF-8.
fn percent_decode(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).ok()
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Resolve `.` and `..` segments lexically, refusing any path that would
/// climb above the serve root. The returned path is relative and contains
/// only normal segments, so joining it to the root cannot escape.
fn confine(decoded: &str) -> Option<PathBuf> {
    let mut confined = PathBuf::new();
    for component in Path::new(decoded).components() {
        match component {
            Component::Normal(segment) => confined.push(segment),
            Component::ParentDir => {
                if !confined.pop() {
                    return None;
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Some(confined)
}

/// Lowercased extension with leading dot, or empty when the file has none.
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std_fs::write(dir.path().join("index.html"), "<h1>Home</h1>").unwrap();
        std_fs::write(dir.path().join("style.css"), "body{}").unwrap();
        std_fs::write(dir.path().join("data.json"), "{}").unwrap();
        std_fs::write(dir.path().join("archive.unknownext"), "blob").unwrap();
        std_fs::create_dir(dir.path().join("docs")).unwrap();
        std_fs::write(dir.path().join("docs/index.html"), "<p>Docs</p>").unwrap();
        std_fs::create_dir(dir.path().join("bare")).unwrap();
        dir
    }

    fn resolver(dir: &TempDir) -> Resolver {
        Resolver::new(dir.path()).unwrap()
    }

    #[test]
    fn decodes_percent_escapes() {
        assert_eq!(percent_decode("/a%20b"), Some("/a b".to_string()));
        assert_eq!(percent_decode("/%2e%2e/x"), Some("/../x".to_string()));
        assert_eq!(percent_decode("/%2E%2E/x"), Some("/../x".to_string()));
    }

    #[test]
    fn keeps_malformed_escapes_literal() {
        assert_eq!(percent_decode("/100%"), Some("/100%".to_string()));
        assert_eq!(percent_decode("/a%zzb"), Some("/a%zzb".to_string()));
        assert_eq!(percent_decode("/a%2"), Some("/a%2".to_string()));
    }

    #[test]
    fn rejects_non_utf8_decodes() {
        assert_eq!(percent_decode("/%ff%fe"), None);
    }

    #[test]
    fn confinement_resolves_dot_segments() {
        assert_eq!(confine("/a/./b"), Some(PathBuf::from("a/b")));
        assert_eq!(confine("/a/../b"), Some(PathBuf::from("b")));
        assert_eq!(confine("/docs/"), Some(PathBuf::from("docs")));
    }

    #[test]
    fn confinement_refuses_root_escape() {
        assert_eq!(confine("/.."), None);
        assert_eq!(confine("/../x"), None);
        assert_eq!(confine("/a/../../x"), None);
    }

    #[test]
    fn bare_slash_means_index_document() {
        assert_eq!(normalize_path("/"), "/index.html");
        assert_eq!(normalize_path(""), "/index.html");
        assert_eq!(normalize_path("/?q=1"), "/index.html");
    }

    #[tokio::test]
    async fn root_is_equivalent_to_index_html() {
        let dir = site();
        let r = resolver(&dir);
        let root = r.resolve("/").await;
        let index = r.resolve("/index.html").await;
        assert_eq!(root.status, 200);
        assert_eq!(root.body, Bytes::from("<h1>Home</h1>"));
        assert_eq!(root, index);
    }

    #[tokio::test]
    async fn parent_traversal_is_forbidden() {
        let dir = site();
        let plan = resolver(&dir).resolve("/../secret.txt").await;
        assert_eq!(plan.status, 403);
        assert_eq!(plan.body, Bytes::from("403 Forbidden"));
        assert_eq!(plan.header("Content-Type"), Some("text/plain"));
    }

    #[tokio::test]
    async fn encoded_traversal_is_forbidden() {
        let dir = site();
        let plan = resolver(&dir).resolve("/%2e%2e%2f%2e%2e%2fetc/passwd").await;
        assert_eq!(plan.status, 403);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escaping_sibling_with_shared_prefix_is_forbidden() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("app");
        std_fs::create_dir(&root).unwrap();
        std_fs::write(root.join("index.html"), "<h1>App</h1>").unwrap();
        // Sibling whose absolute path has the root as a *string* prefix;
        // only segment-wise ancestry rejects it.
        let evil = parent.path().join("app-evil");
        std_fs::create_dir(&evil).unwrap();
        std_fs::write(evil.join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(evil.join("secret.txt"), root.join("link.txt")).unwrap();

        let plan = Resolver::new(&root).unwrap().resolve("/link.txt").await;
        assert_eq!(plan.status, 403);
    }

    #[tokio::test]
    async fn missing_path_serves_root_index_with_no_cache_headers() {
        let dir = site();
        let plan = resolver(&dir).resolve("/does/not/exist").await;
        assert_eq!(plan.status, 200);
        assert_eq!(plan.body, Bytes::from("<h1>Home</h1>"));
        assert_eq!(
            plan.header("Cache-Control"),
            Some("no-store, no-cache, must-revalidate, max-age=0")
        );
        assert_eq!(plan.header("Pragma"), Some("no-cache"));
        assert_eq!(plan.header("Expires"), Some("0"));
    }

    #[tokio::test]
    async fn missing_path_without_root_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let plan = Resolver::new(dir.path()).unwrap().resolve("/nope").await;
        assert_eq!(plan.status, 404);
        assert_eq!(plan.body, Bytes::from("404 Not Found"));
    }

    #[tokio::test]
    async fn directory_serves_its_index_document() {
        let dir = site();
        let r = resolver(&dir);
        for path in ["/docs", "/docs/"] {
            let plan = r.resolve(path).await;
            assert_eq!(plan.status, 200);
            assert_eq!(plan.body, Bytes::from("<p>Docs</p>"));
            // Directory indexes get Cache-Control only, unlike the SPA
            // fallback which also sends Pragma/Expires.
            assert_eq!(plan.header("Pragma"), None);
            assert_eq!(plan.header("Expires"), None);
        }
    }

    #[tokio::test]
    async fn directory_without_index_never_falls_back_to_root() {
        let dir = site();
        let plan = resolver(&dir).resolve("/bare").await;
        assert_eq!(plan.status, 404);
        assert_eq!(plan.body, Bytes::from("404 Not Found"));
    }

    #[tokio::test]
    async fn stylesheet_gets_long_lived_cache() {
        let dir = site();
        let plan = resolver(&dir).resolve("/style.css").await;
        assert_eq!(plan.status, 200);
        assert_eq!(plan.header("Content-Type"), Some("text/css"));
        assert_eq!(plan.header("Cache-Control"), Some("public, max-age=31536000"));
        assert_eq!(plan.header("Access-Control-Allow-Origin"), Some("*"));
    }

    #[tokio::test]
    async fn json_is_always_revalidated() {
        let dir = site();
        let plan = resolver(&dir).resolve("/data.json").await;
        assert_eq!(plan.status, 200);
        assert_eq!(plan.header("Content-Type"), Some("application/json"));
        assert_eq!(
            plan.header("Cache-Control"),
            Some("no-store, no-cache, must-revalidate, max-age=0")
        );
    }

    #[tokio::test]
    async fn unknown_extension_falls_back_to_octet_stream() {
        let dir = site();
        let plan = resolver(&dir).resolve("/archive.unknownext").await;
        assert_eq!(plan.status, 200);
        assert_eq!(plan.header("Content-Type"), Some("application/octet-stream"));
    }

    #[tokio::test]
    async fn query_and_fragment_never_reach_the_filesystem() {
        let dir = site();
        let r = resolver(&dir);
        for path in ["/style.css?v=123", "/style.css#top", "/style.css?v=1#top"] {
            let plan = r.resolve(path).await;
            assert_eq!(plan.status, 200);
            assert_eq!(plan.header("Content-Type"), Some("text/css"));
        }
    }

    #[tokio::test]
    async fn encoded_names_reach_the_real_file() {
        let dir = site();
        std_fs::write(dir.path().join("hello world.txt"), "hi").unwrap();
        let plan = resolver(&dir).resolve("/hello%20world.txt").await;
        assert_eq!(plan.status, 200);
        assert_eq!(plan.body, Bytes::from("hi"));
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let dir = site();
        let r = resolver(&dir);
        for path in ["/style.css", "/docs", "/missing", "/../x"] {
            assert_eq!(r.resolve(path).await, r.resolve(path).await);
        }
    }
}
