use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};

use crate::config::{SessionApiConfig, DEFAULT_USER_AGENT};

pub const EVENT_STREAM: &str = "text/event-stream";
pub const APPLICATION_JSON: &str = "application/json";

/// Headers shared by every backend request.
pub fn build_headers(config: &SessionApiConfig, accept: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));

    let agent = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(USER_AGENT, agent);
    headers
}

#[cfg(test)]
mod tests {
    use reqwest::header::{ACCEPT, USER_AGENT};

    use super::{build_headers, EVENT_STREAM};
    use crate::config::{SessionApiConfig, DEFAULT_USER_AGENT};

    #[test]
    fn default_user_agent_is_used_when_override_is_blank() {
        let config = SessionApiConfig::new("http://x").with_user_agent("  ");
        let headers = build_headers(&config, EVENT_STREAM);
        assert_eq!(headers[USER_AGENT], DEFAULT_USER_AGENT);
        assert_eq!(headers[ACCEPT], EVENT_STREAM);
    }

    #[test]
    fn invalid_user_agent_falls_back() {
        let config = SessionApiConfig::new("http://x").with_user_agent("bad\nvalue");
        let headers = build_headers(&config, EVENT_STREAM);
        assert_eq!(headers[USER_AGENT], DEFAULT_USER_AGENT);
    }
}
