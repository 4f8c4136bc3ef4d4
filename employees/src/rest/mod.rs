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

//! Entry point to the REST server.

use crate::driver::Driver;
use crate::model::{EmployeeId, EmployeeRequest};
use async_trait::async_trait;
use axum::Router;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use iii_iv_core::model::ModelError;
use iii_iv_core::rest::RestError;
use serde::Deserialize;

mod employee_delete;
mod employee_get;
mod employee_put;
mod employees_get;
mod employees_post;
mod openapi_get;
#[cfg(test)]
mod testutils;

/// Extractor for the employee identifier in the path of a request.
///
/// Identifiers are validated before the handler runs so that invalid ones never reach the driver.
pub(crate) struct EmployeeIdPath(pub(crate) EmployeeId);

#[async_trait]
impl<S> FromRequestParts<S> for EmployeeIdPath
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state).await?;
        Ok(EmployeeIdPath(EmployeeId::new(id)?))
    }
}

/// Payload of the APIs that create or update employees.
///
/// All fields are optional at the deserialization level so that missing fields are reported by
/// the model validation.  An `id` in the payload is ignored.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Default))]
#[serde(rename_all = "camelCase")]
pub(crate) struct EmployeeBody {
    /// Given name.
    first_name: Option<String>,

    /// Family name.
    last_name: Option<String>,

    /// Contact email.
    email: Option<String>,
}

impl TryFrom<EmployeeBody> for EmployeeRequest {
    type Error = ModelError;

    fn try_from(body: EmployeeBody) -> Result<Self, Self::Error> {
        EmployeeRequest::new(
            body.first_name.unwrap_or_default(),
            body.last_name.unwrap_or_default(),
            body.email.unwrap_or_default(),
        )
    }
}

/// Creates the router for the application.
pub(crate) fn app(driver: Driver) -> Router {
    use axum::routing::get;
    Router::new()
        .route("/api/employees", get(employees_get::handler).post(employees_post::handler))
        .route(
            "/api/employees/:id",
            get(employee_get::handler).put(employee_put::handler).delete(employee_delete::handler),
        )
        .route("/api/openapi.json", get(openapi_get::handler))
        .with_state(driver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Employee;
    use crate::rest::testutils::*;
    use axum::http;
    use iii_iv_core::rest::testutils::*;
    use serde_json::json;

    #[test]
    fn test_employee_body_to_request_ok() {
        let body = EmployeeBody {
            first_name: Some("Ada".to_owned()),
            last_name: Some("Lovelace".to_owned()),
            email: Some("ada@x.com".to_owned()),
        };
        assert_eq!(
            EmployeeRequest::new("Ada".to_owned(), "Lovelace".to_owned(), "ada@x.com".to_owned())
                .unwrap(),
            EmployeeRequest::try_from(body).unwrap()
        );
    }

    #[test]
    fn test_employee_body_to_request_missing_fields() {
        let body = EmployeeBody { first_name: Some("Ada".to_owned()), ..Default::default() };
        assert_eq!(
            ModelError("Last name cannot be empty".to_owned()),
            EmployeeRequest::try_from(body).unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), (http::Method::GET, "/employees"))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_empty()
            .await;
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let context = TestContext::setup().await;

        let created = OneShotBuilder::new(context.app(), (http::Method::POST, "/api/employees"))
            .send_json(json!({"firstName": "Ada", "lastName": "Lovelace", "email": "ada@x.com"}))
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<Employee>()
            .await;
        let id = created.id().unwrap();
        assert!(id.as_i64() > 0);
        assert_eq!("Ada", created.first_name());
        assert_eq!("Lovelace", created.last_name());
        assert_eq!("ada@x.com", created.email());

        let path = format!("/api/employees/{}", id);

        let fetched = OneShotBuilder::new(context.app(), (http::Method::GET, &path))
            .send_empty()
            .await
            .expect_json::<Employee>()
            .await;
        assert_eq!(created, fetched);

        let updated = OneShotBuilder::new(context.app(), (http::Method::PUT, &path))
            .send_json(json!({"firstName": "Ada2", "lastName": "Lovelace", "email": "ada@x.com"}))
            .await
            .expect_json::<Employee>()
            .await;
        assert_eq!(Some(id), *updated.id());
        assert_eq!("Ada2", updated.first_name());

        OneShotBuilder::new(context.app(), (http::Method::DELETE, &path))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(context.app(), (http::Method::GET, &path))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error(&format!("Employee {} not found", id))
            .await;
    }
}
