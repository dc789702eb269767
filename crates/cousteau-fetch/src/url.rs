//! Query URL construction for listing endpoints.

use reqwest::Url;

/// Joins normalized filters into `name=value` pairs separated by `&`.
fn join_filters(filters: &[(String, String)]) -> String {
    filters
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Builds a listing URL (path + query) from already normalized filters.
///
/// # Example
///
/// ```
/// use cousteau_fetch::url::build_query_url;
///
/// let filters = vec![("status".to_string(), "1".to_string())];
/// assert_eq!(build_query_url("/api/v2/probes/", &filters), "/api/v2/probes/?status=1");
/// assert_eq!(build_query_url("/api/v2/probes/", &[]), "/api/v2/probes/");
/// ```
#[must_use]
pub fn build_query_url(path: &str, filters: &[(String, String)]) -> String {
    if filters.is_empty() {
        return path.to_string();
    }
    format!("{path}?{}", join_filters(filters))
}

/// Splits a comma-separated id list into chunks of at most `chunk_size` ids.
///
/// Ids keep their order and are never cut in half.
#[must_use]
pub fn chunk_ids(ids: &str, chunk_size: usize) -> Vec<String> {
    let ids: Vec<&str> = ids.split(',').collect();
    ids.chunks(chunk_size.max(1))
        .map(|chunk| chunk.join(","))
        .collect()
}

/// Builds one listing URL per id chunk.
///
/// Every URL carries all of `filters` followed by `id_filter=<chunk>`.
#[must_use]
pub fn build_split_urls(
    path: &str,
    id_filter: &str,
    ids: &str,
    filters: &[(String, String)],
    chunk_size: usize,
) -> Vec<String> {
    let filters = join_filters(filters);
    chunk_ids(ids, chunk_size)
        .into_iter()
        .map(|chunk| {
            if filters.is_empty() {
                format!("{path}?{id_filter}={chunk}")
            } else {
                format!("{path}?{filters}&{id_filter}={chunk}")
            }
        })
        .collect()
}

/// Reduces a server-supplied `next` link to path + query.
///
/// Relative links are resolved against `current`, the path + query of the
/// page that carried them. Returns `None` when the link cannot be parsed.
///
/// ```
/// use cousteau_fetch::url::normalize_next_url;
///
/// let current = "/api/v2/probes/?status=1";
/// assert_eq!(
///     normalize_next_url(current, "https://atlas.ripe.net/api/v2/probes/?page=2").as_deref(),
///     Some("/api/v2/probes/?page=2")
/// );
/// assert_eq!(
///     normalize_next_url(current, "?page=3&status=1").as_deref(),
///     Some("/api/v2/probes/?page=3&status=1")
/// );
/// ```
#[must_use]
pub fn normalize_next_url(current: &str, next: &str) -> Option<String> {
    let base = Url::parse("http://localhost/").ok()?.join(current).ok()?;
    let resolved = base.join(next).ok()?;
    Some(match resolved.query() {
        Some(query) => format!("{}?{query}", resolved.path()),
        None => resolved.path().to_string(),
    })
}
