//! Endpoint construction for the backend's session routes.

use url::Url;

use crate::error::SessionApiError;

/// Parses and normalizes a backend root URL.
///
/// Only `http`/`https` are accepted; a trailing slash is implied so joined
/// paths never replace the last segment.
pub fn normalize_base_url(input: &str) -> Result<Url, SessionApiError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SessionApiError::InvalidBaseUrl("empty URL".to_string()));
    }
    let mut url =
        Url::parse(trimmed).map_err(|error| SessionApiError::InvalidBaseUrl(format!("{trimmed}: {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SessionApiError::InvalidBaseUrl(format!(
            "{trimmed}: unsupported scheme `{}`",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// `POST {base}/v1/ask?project=<root>`
pub fn ask_url(base: &Url, project: Option<&str>) -> Result<Url, SessionApiError> {
    endpoint(base, &["v1", "ask"], project)
}

/// `GET {base}/v1/sessions/<id>/stream?project=<root>`
pub fn stream_url(base: &Url, session_id: &str, project: Option<&str>) -> Result<Url, SessionApiError> {
    endpoint(base, &["v1", "sessions", session_id, "stream"], project)
}

/// `POST {base}/v1/sessions/<id>/approval`
pub fn approval_url(base: &Url, session_id: &str) -> Result<Url, SessionApiError> {
    endpoint(base, &["v1", "sessions", session_id, "approval"], None)
}

fn endpoint(base: &Url, segments: &[&str], project: Option<&str>) -> Result<Url, SessionApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SessionApiError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    if let Some(project) = project.map(str::trim).filter(|p| !p.is_empty()) {
        url.query_pairs_mut().append_pair("project", project);
    }
    Ok(url)
}
