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

//! API to get all employees.

use crate::driver::Driver;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use iii_iv_core::rest::{EmptyBody, RestError};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let employees = driver.find_all().await?;
    Ok(Json(employees))
}

#[cfg(test)]
mod tests {
    use crate::model::Employee;
    use crate::rest::testutils::*;
    use axum::http;
    use iii_iv_core::rest::testutils::*;

    fn route() -> (http::Method, String) {
        (http::Method::GET, "/api/employees".to_owned())
    }

    #[tokio::test]
    async fn test_empty() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .expect_json::<Vec<Employee>>()
            .await;
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_some() {
        let context = TestContext::setup().await;

        let ada = context.insert("Ada", "Lovelace", "ada@x.com").await;
        let alan = context.insert("Alan", "Turing", "alan@x.com").await;
        let grace = context.insert("Grace", "Hopper", "grace@x.com").await;

        let response = OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .expect_json::<Vec<Employee>>()
            .await;
        assert_eq!(vec![ada, alan, grace], response);
    }

    #[tokio::test]
    async fn test_wire_format() {
        let context = TestContext::setup().await;

        let ada = context.insert("Ada", "Lovelace", "ada@x.com").await;

        let response = OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .take_body_as_text()
            .await;
        let exp_response = format!(
            r#"[{{"id":{},"firstName":"Ada","lastName":"Lovelace","email":"ada@x.com"}}]"#,
            ada.id().unwrap()
        );
        assert_eq!(exp_response, response);
    }

    #[tokio::test]
    async fn test_storage_error() {
        let context = TestContext::setup().await;

        context.close().await;

        OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .expect_status(http::StatusCode::INTERNAL_SERVER_ERROR)
            .expect_error("closed pool")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route());
}
