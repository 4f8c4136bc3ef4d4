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

//! API to get one employee.

use crate::driver::Driver;
use crate::rest::EmployeeIdPath;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use iii_iv_core::rest::{EmptyBody, RestError};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    EmployeeIdPath(id): EmployeeIdPath,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let employee = driver.find_by_id(id).await?;
    Ok(Json(employee))
}

#[cfg(test)]
mod tests {
    use crate::model::Employee;
    use crate::rest::testutils::*;
    use axum::http;
    use iii_iv_core::rest::testutils::*;

    fn route<T: std::fmt::Display>(id: T) -> (http::Method, String) {
        (http::Method::GET, format!("/api/employees/{}", id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;

        context.insert("Ada", "Lovelace", "ada@x.com").await;
        let alan = context.insert("Alan", "Turing", "alan@x.com").await;

        let response = OneShotBuilder::new(context.app(), route(alan.id().unwrap()))
            .send_empty()
            .await
            .expect_json::<Employee>()
            .await;
        assert_eq!(alan, response);
    }

    #[tokio::test]
    async fn test_not_found() {
        let context = TestContext::setup().await;

        context.insert("Ada", "Lovelace", "ada@x.com").await;

        OneShotBuilder::new(context.app(), route(5000))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("Employee 5000 not found")
            .await;
    }

    #[tokio::test]
    async fn test_id_not_positive() {
        let context = TestContext::setup().await;

        for id in [0, -3] {
            OneShotBuilder::new(context.app(), route(id))
                .send_empty()
                .await
                .expect_status(http::StatusCode::BAD_REQUEST)
                .expect_error("must be a positive integer")
                .await;
        }
    }

    #[tokio::test]
    async fn test_id_not_a_number() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route("abc"))
            .send_empty()
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("Cannot parse")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route(1));
}
