//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Expected records are written in the server's
//! wire format and decoded with the same `Deserialize` impls, so a vector
//! reads like a captured exchange.

use serde_json::Value;
use trovebox_core::{
    Album, ApiError, ClientConfig, HttpMethod, HttpRequest, HttpResponse, ImageSize, Paging, Permission,
    Photo, PhotoListQuery, PhotoUpdate, RejectionKind, ReturnSizes, TroveboxClient,
};

const BASE_URL: &str = "http://localhost:3000";

fn client() -> TroveboxClient {
    TroveboxClient::new(ClientConfig::new(BASE_URL)).unwrap()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().map(|s| s.as_str().unwrap().to_string()).collect())
        .unwrap_or_default()
}

fn sizes(value: &Value) -> ReturnSizes {
    strings(value)
        .iter()
        .map(|s| s.parse::<ImageSize>().unwrap())
        .collect()
}

fn check_request(name: &str, req: &HttpRequest<'_>, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    match expected.get("body").and_then(Value::as_str) {
        Some(body) => assert_eq!(req.body.as_form(), Some(body), "{name}: body"),
        None => assert!(req.body.is_empty(), "{name}: body should be empty"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn check_error(name: &str, err: ApiError, expected: &str) {
    match expected {
        "NotFound" => assert_eq!(err.rejection_kind(), Some(RejectionKind::NotFound), "{name}"),
        "AccessDenied" => assert_eq!(err.rejection_kind(), Some(RejectionKind::AccessDenied), "{name}"),
        "Conflict" => assert_eq!(err.rejection_kind(), Some(RejectionKind::Conflict), "{name}"),
        "Malformed" => assert!(matches!(err, ApiError::MalformedResponse { .. }), "{name}: got {err}"),
        other => panic!("{name}: unknown expected_error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// List photos
// ---------------------------------------------------------------------------

#[test]
fn list_photos_test_vectors() {
    let raw = include_str!("../../test-vectors/list_photos.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];

        let mut query = PhotoListQuery::new().sizes(sizes(&input["sizes"]));
        if input.get("tags").is_some() {
            query = query.tags(strings(&input["tags"]));
        }
        if let Some(album) = input["album"].as_str() {
            query = query.album(album);
        }
        if let Some(token) = input["token"].as_str() {
            query = query.token(token);
        }
        if let Some(page) = input["page"].as_u64() {
            let size = input["page_size"].as_u64().unwrap();
            query = query.paging(Paging::new(page as u32, size as u32).unwrap());
        }

        // Verify build
        let req = c.build_list_photos(&query).unwrap();
        check_request(name, &req, &case["expected_request"]);

        // Verify parse
        let photos = c.parse_list_photos(simulated(case), query.paging).unwrap();
        let expected: Vec<Photo> = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(photos.photos, expected, "{name}: parsed result");

        let paging = &case["expected_paging"];
        match photos.paging {
            None => assert!(paging.is_null(), "{name}: expected paging"),
            Some(cursor) => {
                assert_eq!(u64::from(cursor.current_page), paging["current_page"].as_u64().unwrap(), "{name}");
                assert_eq!(u64::from(cursor.page_size), paging["page_size"].as_u64().unwrap(), "{name}");
                assert_eq!(u64::from(cursor.total_pages), paging["total_pages"].as_u64().unwrap(), "{name}");
                assert_eq!(cursor.total_rows, paging["total_rows"].as_u64().unwrap(), "{name}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Get photo
// ---------------------------------------------------------------------------

#[test]
fn get_photo_test_vectors() {
    let raw = include_str!("../../test-vectors/get_photo.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_str().unwrap();
        let token = case["input_token"].as_str();

        // Verify build
        let req = c.build_get_photo(id, &sizes(&case["input_sizes"]), token, None).unwrap();
        check_request(name, &req, &case["expected_request"]);

        // Verify parse
        let result = c.parse_get_photo(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            check_error(name, result.unwrap_err(), expected_error.as_str().unwrap());
        } else {
            let photo = result.unwrap().photo;
            let expected: Photo = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(photo, expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Update photo
// ---------------------------------------------------------------------------

#[test]
fn update_photo_test_vectors() {
    let raw = include_str!("../../test-vectors/update_photo.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_str().unwrap();
        let input = &case["input"];

        let mut update = PhotoUpdate::new();
        if let Some(title) = input["title"].as_str() {
            update = update.title(title);
        }
        if let Some(description) = input["description"].as_str() {
            update = update.description(description);
        }
        if input.get("tags").is_some() {
            update = update.tags(strings(&input["tags"]));
        }
        if let Some(permission) = input["permission"].as_u64() {
            update = update.permission(Permission::try_from(permission as u8).unwrap());
        }

        // Verify build
        let req = c.build_update_photo_details(id, &update).unwrap();
        check_request(name, &req, &case["expected_request"]);

        // Verify parse
        let result = c.parse_update_photo_details(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            check_error(name, result.unwrap_err(), expected_error.as_str().unwrap());
        } else {
            let photo = result.unwrap().photo;
            let expected: Photo = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(photo, expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Create album
// ---------------------------------------------------------------------------

#[test]
fn create_album_test_vectors() {
    let raw = include_str!("../../test-vectors/create_album.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        // Verify build
        let req = c.build_create_album(case["input_name"].as_str().unwrap()).unwrap();
        check_request(name, &req, &case["expected_request"]);

        // Verify parse
        let result = c.parse_create_album(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            check_error(name, result.unwrap_err(), expected_error.as_str().unwrap());
        } else {
            let album = result.unwrap().album;
            let expected: Album = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(album, expected, "{name}: parsed result");
        }
    }
}
