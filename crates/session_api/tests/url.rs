use session_api::url::{approval_url, ask_url, stream_url};
use session_api::{normalize_base_url, SessionApiError};

#[test]
fn base_url_gains_trailing_slash_and_drops_query() {
    let base = normalize_base_url(" http://127.0.0.1:9100/api?x=1 ").expect("valid");
    assert_eq!(base.as_str(), "http://127.0.0.1:9100/api/");
}

#[test]
fn base_url_rejects_blank_and_non_http() {
    assert!(matches!(
        normalize_base_url("  "),
        Err(SessionApiError::InvalidBaseUrl(_))
    ));
    assert!(matches!(
        normalize_base_url("ftp://host"),
        Err(SessionApiError::InvalidBaseUrl(_))
    ));
}

#[test]
fn routes_are_joined_under_the_base_path() {
    let base = normalize_base_url("http://localhost:9100/api").expect("valid");
    assert_eq!(
        ask_url(&base, Some("/repo")).expect("ask").as_str(),
        "http://localhost:9100/api/v1/ask?project=%2Frepo"
    );
    assert_eq!(
        stream_url(&base, "s 1", None).expect("stream").as_str(),
        "http://localhost:9100/api/v1/sessions/s%201/stream"
    );
    assert_eq!(
        approval_url(&base, "s1").expect("approval").as_str(),
        "http://localhost:9100/api/v1/sessions/s1/approval"
    );
}

#[test]
fn blank_project_is_omitted() {
    let base = normalize_base_url("http://localhost:9100").expect("valid");
    assert_eq!(
        ask_url(&base, Some("  ")).expect("ask").as_str(),
        "http://localhost:9100/v1/ask"
    );
}
