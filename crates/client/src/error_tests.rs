// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    unauthorized = { ApiError::Status { status: 401, body: String::new() }, Some(401), true },
    forbidden = { ApiError::Status { status: 403, body: "nope".into() }, Some(403), false },
    server = { ApiError::Status { status: 500, body: String::new() }, Some(500), false },
    network = { ApiError::Network("connection refused".into()), None, false },
    decode = { ApiError::Decode("missing field".into()), None, false },
    request = { ApiError::Request("bad url".into()), None, false },
)]
fn status_classification(err: ApiError, status: Option<u16>, unauthorized: bool) {
    assert_eq!(err.status(), status);
    assert_eq!(err.is_unauthorized(), unauthorized);
}

#[test]
fn display_includes_body_when_present() {
    let err = ApiError::Status { status: 404, body: "not found".into() };
    assert_eq!(err.to_string(), "HTTP 404: not found");

    let bare = ApiError::Status { status: 502, body: String::new() };
    assert_eq!(bare.to_string(), "HTTP 502");
}

#[test]
fn as_str_distinguishes_unauthorized() {
    assert_eq!(ApiError::Status { status: 401, body: String::new() }.as_str(), "UNAUTHORIZED");
    assert_eq!(ApiError::Status { status: 400, body: String::new() }.as_str(), "HTTP_STATUS");
    assert_eq!(ApiError::Network("x".into()).as_str(), "NETWORK");
}
