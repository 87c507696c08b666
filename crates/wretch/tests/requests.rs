//! Request building and body parsing against the mock transport.

mod common;

use common::{BASE, DUCK, MockServer, config};
use http::{Method, StatusCode};
use serde_json::{Value, json};
use wretch::{Body, FormValue, ResponseChain, Wretcher};

fn every_verb(w: &Wretcher) -> Vec<ResponseChain> {
    vec![
        w.get().unwrap(),
        w.put().unwrap(),
        w.patch().unwrap(),
        w.post().unwrap(),
        w.delete().unwrap(),
        w.get_with(json!({})).unwrap(),
        w.put_with(json!({})).unwrap(),
        w.patch_with(json!({})).unwrap(),
        w.post_with(json!({})).unwrap(),
        w.delete_with(json!({})).unwrap(),
    ]
}

#[tokio::test]
async fn test_crud_text() {
    let server = MockServer::new();
    let w = config(&server).wretch(format!("{BASE}/text"));

    for chain in every_verb(&w) {
        assert_eq!(chain.text().await.unwrap().as_deref(), Some("A text string"));
    }

    let methods: Vec<Method> = server.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(
        &methods[..5],
        &[Method::GET, Method::PUT, Method::PATCH, Method::POST, Method::DELETE]
    );
}

#[tokio::test]
async fn test_crud_json() {
    let server = MockServer::new();
    let w = config(&server).wretch(format!("{BASE}/json"));

    for chain in every_verb(&w) {
        let value: Option<Value> = chain.json().await.unwrap();
        assert_eq!(
            value,
            Some(json!({ "a": "json", "object": "which", "is": "stringified" }))
        );
    }
}

#[tokio::test]
async fn test_crud_blob() {
    let server = MockServer::new();
    let w = config(&server).wretch(format!("{BASE}/blob"));

    for chain in every_verb(&w) {
        let blob = chain.blob().await.unwrap().unwrap();
        assert_eq!(blob.size(), DUCK.len());
        assert_eq!(blob.content_type.as_deref(), Some("image/jpeg"));
    }
}

#[tokio::test]
async fn test_crud_array_buffer() {
    let server = MockServer::new();
    let w = config(&server).wretch(format!("{BASE}/arrayBuffer"));

    for chain in every_verb(&w) {
        let buffer = chain.array_buffer().await.unwrap().unwrap();
        assert_eq!(&buffer[..], &[0x00, 0x01, 0x02, 0x03]);
    }
}

#[tokio::test]
async fn test_plain_text_round_trip() {
    let server = MockServer::new();
    let text = "hello, server !";

    let round_trip = config(&server)
        .wretch(format!("{BASE}/text/roundTrip"))
        .content("text/plain")
        .body(text)
        .post()
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(round_trip.as_deref(), Some(text));
    assert_eq!(server.last().header("content-type"), Some("text/plain"));
}

#[tokio::test]
async fn test_json_round_trip() {
    let server = MockServer::new();
    let object = json!({ "a": 1, "b": 2, "c": 3 });

    let round_trip: Option<Value> = config(&server)
        .wretch(format!("{BASE}/json/roundTrip"))
        .json(&object)
        .unwrap()
        .post()
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(round_trip, Some(object));
    assert_eq!(server.last().header("Content-Type"), Some("application/json"));
}

#[tokio::test]
async fn test_url_encoded_round_trip() {
    let server = MockServer::new();
    let reference = "a=1&b=2&%20c=%203&d=%7B%22a%22%3A1%7D";
    let w = config(&server).wretch(format!("{BASE}/urlencoded/roundTrip"));

    let from_string = w.form_url(reference).unwrap().post().unwrap().text().await.unwrap();
    assert_eq!(from_string.as_deref(), Some(reference));

    let from_object = w
        .form_url(json!({ "a": 1, "b": 2, " c": " 3", "d": { "a": 1 } }))
        .unwrap()
        .post()
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(from_object.as_deref(), Some(reference));
    assert_eq!(
        server.last().header("Content-Type"),
        Some("application/x-www-form-urlencoded")
    );
}

#[tokio::test]
async fn test_form_data_is_sent() {
    let server = MockServer::new();
    let w = config(&server).wretch(format!("{BASE}/formData/decode"));

    let decoded: Option<Value> = w
        .form_data(&json!({ "hello": "world", "duck": "Muscovy" }))
        .unwrap()
        .post()
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(decoded, Some(json!({ "hello": "world", "duck": "Muscovy" })));

    let decoded: Option<Value> = w
        .form_data(&json!({ "arr": [1, 2, 3] }))
        .unwrap()
        .post()
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(decoded, Some(json!({ "arr": ["1", "2", "3"] })));

    let Some(Body::Form(form)) = server.last().body else {
        panic!("expected a multipart body");
    };
    assert_eq!(form.get("arr"), Some(&FormValue::Text("1".to_owned())));
}

#[tokio::test]
async fn test_form_data_response() {
    let server = MockServer::new();

    let form = config(&server)
        .wretch(format!("{BASE}/urlencoded/echo"))
        .form_url("hello=world&duck=Muscovy")
        .unwrap()
        .post()
        .unwrap()
        .form_data()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(form.get("duck").and_then(FormValue::as_text), Some("Muscovy"));
    assert_eq!(form.len(), 2);
}

#[tokio::test]
async fn test_options_and_head() {
    let server = MockServer::new();
    let config = config(&server);

    for chain in [
        config.wretch(format!("{BASE}/options")).opts().unwrap(),
        config.wretch(format!("{BASE}/options")).opts_with(json!({})).unwrap(),
    ] {
        let response = chain.res().await.unwrap().unwrap();
        assert_eq!(response.get_header("Allow"), Some("OPTIONS"));
    }

    for chain in [
        config.wretch(format!("{BASE}/json")).head().unwrap(),
        config.wretch(format!("{BASE}/json")).head_with(json!({})).unwrap(),
    ] {
        let response = chain.res().await.unwrap().unwrap();
        assert_eq!(response.get_header("content-type"), Some("application/json"));
    }

    let methods: Vec<Method> = server.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, [Method::OPTIONS, Method::OPTIONS, Method::HEAD, Method::HEAD]);
}

#[tokio::test]
async fn test_accept_header() {
    let server = MockServer::new();
    let w = config(&server).wretch(format!("{BASE}/accept"));

    assert_eq!(w.get().unwrap().text().await.unwrap().as_deref(), Some("text"));

    let value: Option<Value> = w.accept("application/json").get().unwrap().json().await.unwrap();
    assert_eq!(value, Some(json!({ "json": "ok" })));
}

#[tokio::test]
async fn test_authorization_header() {
    let server = MockServer::new();
    let w = config(&server).wretch(format!("{BASE}/basicauth"));

    let err = w.get().unwrap().res().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

    let text = w.auth("Basic d3JldGNoOnJvY2tz").get().unwrap().text().await.unwrap();
    assert_eq!(text.as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_default_options() {
    let server = MockServer::new();
    let config = config(&server);
    let url = format!("{BASE}/customHeaders");

    let rejected = config.wretch(&url).get().unwrap().res().await.unwrap_err();
    assert_eq!(rejected.status(), Some(StatusCode::BAD_REQUEST));

    config.set_defaults(json!({ "headers": { "X-Custom-Header": "Anything" } }), false);
    config.set_defaults(json!({ "headers": { "X-Custom-Header-2": "Anything" } }), true);
    config.set_defaults(json!("not an object"), true);

    config.wretch(&url).get().unwrap().res().await.unwrap_err();
    let sent = server.last();
    assert_eq!(sent.header("X-Custom-Header"), Some("Anything"));
    assert_eq!(sent.header("X-Custom-Header-2"), Some("Anything"));

    let accepted = config
        .wretch(&url)
        .replace_options(json!({ "headers": { "X-Custom-Header-3": "Anything" } }))
        .options(json!({ "headers": { "X-Custom-Header-4": "Anything" } }), false)
        .get()
        .unwrap()
        .res()
        .await
        .unwrap()
        .unwrap();
    assert!(accepted.ok());

    let sent = server.last();
    assert_eq!(sent.header("X-Custom-Header"), None);
    assert_eq!(sent.header("X-Custom-Header-3"), Some("Anything"));
}

#[tokio::test]
async fn test_call_time_options_are_merged_last() {
    let server = MockServer::new();

    config(&server)
        .wretch(format!("{BASE}/text"))
        .options(json!({ "credentials": "same-origin", "headers": { "X-A": "1" } }), false)
        .get_with(json!({ "credentials": "include", "method": "POST", "headers": { "X-B": 2 } }))
        .unwrap()
        .res()
        .await
        .unwrap();

    let sent = server.last();
    assert_eq!(sent.method, Method::GET);
    assert_eq!(sent.options.get("credentials"), Some(&json!("include")));
    assert!(!sent.options.contains_key("method"));
    assert!(!sent.options.contains_key("headers"));
    assert_eq!(sent.header("X-A"), Some("1"));
    assert_eq!(sent.header("X-B"), Some("2"));
}

#[tokio::test]
async fn test_builders_are_immutable() {
    let server = MockServer::new();
    let config = config(&server);

    let obj1 = config.wretch("...");
    let obj2 = obj1.url(BASE, true);
    assert_eq!(obj1.current_url(), "...");
    assert_eq!(obj2.current_url(), BASE);

    let obj3 = obj1.options(json!({ "headers": { "X-test": "test" } }), false);
    assert_eq!(obj3.options_tree(), json!({ "headers": { "X-test": "test" } }));
    assert_eq!(obj1.options_tree(), json!({}));

    let obj4 = obj2.query(&json!({ "a": "1!", "b": "2" })).unwrap();
    assert_eq!(obj4.current_url(), format!("{BASE}?a=1%21&b=2"));
    assert_eq!(obj2.current_url(), BASE);

    let obj5 = obj4.query(&json!({ "c": 6, "d": [7, 8] })).unwrap();
    assert_eq!(obj4.current_url(), format!("{BASE}?a=1%21&b=2"));
    assert_eq!(obj5.current_url(), format!("{BASE}?c=6&d=7&d=8"));

    obj5.url("/text", false).get().unwrap().res().await.unwrap();
    assert_eq!(server.last().url, format!("{BASE}/text?c=6&d=7&d=8"));
}
