/// Join a base URL and a path with exactly one slash between them.
///
/// Strips one trailing slash from `base` and one leading slash from `path`.
///
/// ```
/// use perfcore::infrastructure::http::join_endpoint;
///
/// assert_eq!(join_endpoint("http://api/", "/health"), "http://api/health");
/// ```
pub fn join_endpoint(base: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_normalizes_single_slashes() {
        assert_eq!(join_endpoint("http://a", "b"), "http://a/b");
        assert_eq!(join_endpoint("http://a/", "b"), "http://a/b");
        assert_eq!(join_endpoint("http://a", "/b"), "http://a/b");
        assert_eq!(join_endpoint("http://a/", "/b"), "http://a/b");
    }

    #[test]
    fn test_join_strips_only_one_slash() {
        assert_eq!(join_endpoint("http://a//", "//b"), "http://a///b");
    }

    #[test]
    fn test_join_keeps_nested_paths_and_queries() {
        assert_eq!(
            join_endpoint("http://a/api/v1/", "/conversations?limit=5"),
            "http://a/api/v1/conversations?limit=5"
        );
        assert_eq!(join_endpoint("http://a", ""), "http://a/");
    }
}
