// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Building blocks for the HTTP layer of a service.
//!
//! A service exposes an `app` function returning its `axum::Router`.  Each API lives in its own
//! `<entity>_<method>.rs` file under the service's `rest` module, next to the tests for that API
//! only.  These tests define a `route` function that yields the method and path under test and
//! obtain the router from a `TestContext` declared in `rest::testutils`, which also offers direct
//! access to the database.

use crate::driver::DriverError;
use crate::model::ModelError;
use async_trait::async_trait;
use axum::Json;
use axum::body::HttpBody;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use log::warn;
use serde::{Deserialize, Serialize};

/// Errors returned to HTTP clients.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// The server failed to process a valid request.
    #[error("{0}")]
    InternalError(String),

    /// The request is malformed or carries invalid data.
    #[error("{0}")]
    InvalidRequest(String),

    /// The request refers to an entity that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request carries a body but the API takes none.
    #[error("Content should be empty")]
    PayloadNotEmpty,

    /// The request carries a body of a type that the API does not take.
    #[error("{0}")]
    UnsupportedMediaType(String),
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::AlreadyExists(msg) | DriverError::InvalidInput(msg) => {
                RestError::InvalidRequest(msg)
            }
            DriverError::BackendError(msg) => RestError::InternalError(msg),
            DriverError::NotFound(msg) => RestError::NotFound(msg),
        }
    }
}

impl From<JsonRejection> for RestError {
    fn from(e: JsonRejection) -> Self {
        match e {
            JsonRejection::MissingJsonContentType(_) => {
                RestError::UnsupportedMediaType(e.body_text())
            }
            e => RestError::InvalidRequest(e.body_text()),
        }
    }
}

impl From<PathRejection> for RestError {
    fn from(e: PathRejection) -> Self {
        match e {
            // Means that the route and the extractor disagree, which is our bug.
            PathRejection::MissingPathParams(_) => RestError::InternalError(e.body_text()),
            e => RestError::InvalidRequest(e.body_text()),
        }
    }
}

impl From<ModelError> for RestError {
    fn from(e: ModelError) -> Self {
        RestError::InvalidRequest(e.0)
    }
}

impl RestError {
    /// Returns the HTTP status code that represents this error.
    fn status(&self) -> http::StatusCode {
        match self {
            RestError::InternalError(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
            RestError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => http::StatusCode::NOT_FOUND,
            RestError::PayloadNotEmpty => http::StatusCode::PAYLOAD_TOO_LARGE,
            RestError::UnsupportedMediaType(_) => http::StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed with internal error: {}", self);
        }
        (status, Json(ErrorResponse { message: self.to_string() })).into_response()
    }
}

/// Result type for this module.
pub type RestResult<T> = Result<T, RestError>;

/// JSON body of every error response.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ErrorResponse {
    /// Human-readable description of the failure.
    pub(crate) message: String,
}

/// Extractor that rejects requests with a body.
///
/// APIs that take no input should use it so that clients cannot start relying on content that
/// is silently discarded.
pub struct EmptyBody {}

#[async_trait]
impl<S> FromRequest<S> for EmptyBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, _state: &S) -> RestResult<Self> {
        if req.into_body().is_end_stream() {
            Ok(EmptyBody {})
        } else {
            Err(RestError::PayloadNotEmpty)
        }
    }
}

/// Helpers to drive a router in-process from tests.
#[cfg(feature = "testutils")]
pub mod testutils {
    use super::*;
    use axum::Router;
    use axum::body::{Body, Bytes};
    use axum::http::{self, HeaderName, HeaderValue, header};
    use serde::de::DeserializeOwned;
    use tower::util::ServiceExt;

    /// Largest response body that tests will read.
    const MAX_BODY_SIZE: usize = 64 * 1024;

    /// Builder for one request to send to a router.
    #[must_use]
    pub struct OneShotBuilder {
        /// Router that will serve the request.
        app: Router,

        /// Request being built.
        builder: http::request::Builder,
    }

    impl OneShotBuilder {
        /// Starts a request for the `method` and `uri` pair against `app`.
        pub fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
            Self { app, builder: Request::builder().method(method).uri(uri.as_ref()) }
        }

        /// Adds the header `name` with `value` to the request.
        pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
        where
            HeaderName: TryFrom<K>,
            <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
            HeaderValue: TryFrom<V>,
            <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
        {
            self.builder = self.builder.header(name, value);
            self
        }

        /// Sends the request with `body`, labeled as `content_type` unless a content type was
        /// set explicitly.
        async fn send(mut self, content_type: Option<mime::Mime>, body: Body) -> ResponseChecker {
            let has_content_type = self
                .builder
                .headers_ref()
                .is_some_and(|headers| headers.contains_key(header::CONTENT_TYPE));
            if let (Some(content_type), false) = (content_type, has_content_type) {
                self.builder = self.builder.header(header::CONTENT_TYPE, content_type.as_ref());
            }
            let request = self.builder.body(body).unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Sends the request without a body.
        pub async fn send_empty(self) -> ResponseChecker {
            self.send(None, Body::empty()).await
        }

        /// Sends the request with a plain `text` body.
        pub async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
            self.send(Some(mime::TEXT_PLAIN), Body::from(text.into())).await
        }

        /// Sends the request with `value` serialized as its JSON body.
        pub async fn send_json<T: Serialize>(self, value: T) -> ResponseChecker {
            let body = serde_json::to_vec(&value).unwrap();
            self.send(Some(mime::APPLICATION_JSON), Body::from(body)).await
        }
    }

    /// Assertions on the response to a request sent with `OneShotBuilder`.
    #[must_use]
    pub struct ResponseChecker {
        /// Response returned by the router.
        response: Response,

        /// Status code that the response must carry.  Defaults to 200.
        exp_status: http::StatusCode,
    }

    impl From<Response> for ResponseChecker {
        fn from(response: Response) -> Self {
            Self { response, exp_status: http::StatusCode::OK }
        }
    }

    impl ResponseChecker {
        /// Expects the response to carry `status` instead of 200.
        pub fn expect_status(mut self, status: http::StatusCode) -> Self {
            self.exp_status = status;
            self
        }

        /// Checks the status code and returns the raw body.
        async fn into_body(self) -> Bytes {
            assert_eq!(self.exp_status, self.response.status());
            axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap()
        }

        /// Expects a response without a body.
        pub async fn expect_empty(self) {
            let body = self.take_body_as_text().await;
            assert!(body.is_empty(), "Body not empty; got {}", body);
        }

        /// Expects an `ErrorResponse` whose message matches the `exp_re` regular expression.
        pub async fn expect_error(self, exp_re: &str) {
            let body = self.into_body().await;
            let response: ErrorResponse = serde_json::from_slice(&body).unwrap_or_else(|e| {
                panic!("Invalid error response due to {}; content was {:?}", e, body)
            });
            let re = regex::Regex::new(exp_re).unwrap();
            assert!(
                re.is_match(&response.message),
                "Error message '{}' does not match re '{}'",
                response.message,
                exp_re
            );
        }

        /// Expects a JSON body that deserializes into `T` and returns it.
        pub async fn expect_json<T: DeserializeOwned>(self) -> T {
            let body = self.into_body().await;
            serde_json::from_slice::<T>(&body).unwrap()
        }

        /// Returns the body, which must be valid UTF-8.
        pub async fn take_body_as_text(self) -> String {
            String::from_utf8(self.into_body().await.to_vec()).unwrap()
        }
    }

    /// Generates a `test_payload_must_be_json` test that sends bodies other than the JSON object
    /// that the `$route` of `$app` takes, and expects them all to be rejected.
    #[macro_export]
    macro_rules! test_payload_must_be_json {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_json() {
                use $crate::rest::testutils::OneShotBuilder;
                use axum::http::{StatusCode, header};

                OneShotBuilder::new($app, $route)
                    .send_text("{}")
                    .await
                    .expect_status(StatusCode::UNSUPPORTED_MEDIA_TYPE)
                    .expect_error("Content-Type")
                    .await;

                for (body, exp_error) in [("not json", "expected ident"), ("42", "invalid type")] {
                    OneShotBuilder::new($app, $route)
                        .with_header(header::CONTENT_TYPE, "application/json")
                        .send_text(body)
                        .await
                        .expect_status(StatusCode::BAD_REQUEST)
                        .expect_error(exp_error)
                        .await;
                }
            }
        };
    }

    pub use test_payload_must_be_json;

    /// Generates a `test_payload_must_be_empty` test that sends a body to the `$route` of `$app`
    /// and expects it to be rejected.
    #[macro_export]
    macro_rules! test_payload_must_be_empty {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_empty() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("unexpected")
                    .await
                    .expect_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE)
                    .expect_error("should be empty")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_empty;
}
