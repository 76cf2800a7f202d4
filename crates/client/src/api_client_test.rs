use super::*;
use crate::auth::StaticToken;

fn client(base_url: &str, tokens: impl TokenProvider + 'static) -> ApiClient {
    ApiClient::new(RequestConfig::new(base_url, tokens, LogErrors))
}

#[test]
fn url_joins_base_and_path_without_double_slashes() {
    let api = client("http://localhost:5000/api/", StaticToken::none());
    assert_eq!(api.base_url(), "http://localhost:5000/api/");
    assert_eq!(api.url("/events"), "http://localhost:5000/api/events");
    assert_eq!(api.url("events/aB3dE9"), "http://localhost:5000/api/events/aB3dE9");
}

#[test]
fn url_passes_absolute_urls_through() {
    let api = client("http://localhost:5000/api", StaticToken::none());
    assert_eq!(api.url("https://cdn.example.com/a.png"), "https://cdn.example.com/a.png");
}

#[test]
fn url_without_base_is_rooted() {
    let api = client("", StaticToken::none());
    assert_eq!(api.url("events"), "/events");
    assert_eq!(api.url("/events"), "/events");
}

#[test]
fn prepared_request_carries_bearer_token() {
    let api = client("http://localhost:5000/api", StaticToken::new("abc"));
    let request = api.prepare(Method::GET, "/events").build().unwrap();

    assert_eq!(request.url().as_str(), "http://localhost:5000/api/events");
    assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "Bearer abc");
}

#[test]
fn prepared_request_omits_header_without_token() {
    for tokens in [StaticToken::none(), StaticToken::new("")] {
        let api = client("http://localhost:5000/api", tokens);
        let request = api.prepare(Method::DELETE, "/events/aB3dE9").build().unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }
}

#[test]
fn empty_body_decodes_as_null() {
    let response = ApiResponse {
        status: StatusCode::NO_CONTENT,
        headers: HeaderMap::new(),
        body: String::new(),
    };
    let value: Option<Event> = response.json().unwrap();
    assert!(value.is_none());
}

#[test]
fn mismatched_body_is_a_deserialize_error() {
    let response = ApiResponse {
        status: StatusCode::OK,
        headers: HeaderMap::new(),
        body: "{\"events\": 3}".into(),
    };
    let err = response.json::<Vec<Event>>().unwrap_err();
    assert!(matches!(err, ApiError::Deserialize(_)));
}
