//! HTTP-level tests for the geocoding and place-suggestion adapters,
//! backed by a local mock server.

use mockito::Matcher;

use waymark::error::LocationError;
use waymark::geocode::{Geocoder, HttpGeocoder};
use waymark::places::{HttpPlaceSearch, PlaceSearch};
use waymark::types::Coordinate;

const DELHI: Coordinate = Coordinate {
    latitude: 28.6139,
    longitude: 77.2088,
};

#[tokio::test]
async fn test_reverse_geocode_extracts_components() {
    let mut server = mockito::Server::new_async().await;
    let body = r#"{
        "results": [
            {
                "address_components": [
                    {"long_name": "Delhi", "types": ["locality"]},
                    {"long_name": "Delhi", "types": ["administrative_area_level_1"]},
                    {"long_name": "India", "types": ["country"]}
                ]
            }
        ]
    }"#;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("latlng".to_string(), "28.6139,77.2088".to_string()),
            Matcher::UrlEncoded("key".to_string(), "test-key".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let geocoder = HttpGeocoder::with_endpoint("test-key", &server.url()).unwrap();
    let address = geocoder.resolve_address(DELHI).await.unwrap();

    assert_eq!(address.city, "Delhi");
    assert_eq!(address.state, "Delhi");
    assert_eq!(address.country, "India");
    assert_eq!(address.pincode, "");
    assert_eq!(address.landmark, "");
    assert_eq!(address.locality, "");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_reverse_geocode_zero_results_is_no_address_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results": []}"#)
        .create_async()
        .await;

    let geocoder = HttpGeocoder::with_endpoint("test-key", &server.url()).unwrap();
    let result = geocoder.resolve_address(DELHI).await;
    assert!(matches!(result, Err(LocationError::NoAddressFound)));
}

#[tokio::test]
async fn test_reverse_geocode_componentless_result_is_no_address_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results": [{"address_components": []}]}"#)
        .create_async()
        .await;

    let geocoder = HttpGeocoder::with_endpoint("test-key", &server.url()).unwrap();
    let result = geocoder.resolve_address(DELHI).await;
    assert!(matches!(result, Err(LocationError::NoAddressFound)));
}

#[tokio::test]
async fn test_reverse_geocode_server_error_is_provider_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let geocoder = HttpGeocoder::with_endpoint("test-key", &server.url()).unwrap();
    let result = geocoder.resolve_address(DELHI).await;
    assert!(matches!(result, Err(LocationError::ProviderError(_))));
}

#[tokio::test]
async fn test_reverse_geocode_malformed_body_is_provider_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let geocoder = HttpGeocoder::with_endpoint("test-key", &server.url()).unwrap();
    let result = geocoder.resolve_address(DELHI).await;
    assert!(matches!(result, Err(LocationError::ProviderError(_))));
}

#[tokio::test]
async fn test_place_search_parses_features() {
    let mut server = mockito::Server::new_async().await;
    let body = r#"{
        "features": [
            {"properties": {"formatted": "Delhi, India", "lat": 28.6139, "lon": 77.2088}},
            {"properties": {"formatted": "Delhi, Ontario, Canada", "lat": 42.85, "lon": -80.5}}
        ]
    }"#;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("text".to_string(), "Delhi".to_string()),
            Matcher::UrlEncoded("limit".to_string(), "5".to_string()),
            Matcher::UrlEncoded("apiKey".to_string(), "test-key".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let places = HttpPlaceSearch::with_endpoint("test-key", &server.url()).unwrap();
    let suggestions = places.search("Delhi", 5).await.unwrap();

    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].label, "Delhi, India");
    assert_eq!(
        suggestions[0].coordinate,
        Coordinate::new(28.6139, 77.2088)
    );
    assert_eq!(suggestions[1].label, "Delhi, Ontario, Canada");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_place_search_empty_features_is_empty_list() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"features": []}"#)
        .create_async()
        .await;

    let places = HttpPlaceSearch::with_endpoint("test-key", &server.url()).unwrap();
    let suggestions = places.search("Nowhereville", 5).await.unwrap();
    assert!(suggestions.is_empty());
}

#[tokio::test]
async fn test_place_search_server_error_is_provider_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(502)
        .create_async()
        .await;

    let places = HttpPlaceSearch::with_endpoint("test-key", &server.url()).unwrap();
    let result = places.search("Delhi", 5).await;
    assert!(matches!(result, Err(LocationError::ProviderError(_))));
}
