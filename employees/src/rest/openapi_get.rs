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

//! API to get the OpenAPI description of the service.

use axum::Json;
use axum::response::IntoResponse;
use iii_iv_core::rest::{EmptyBody, RestError};
use serde_json::{Value, json};

/// Tag that groups all employee APIs in the description.
const TAG: &str = "Employee Rest API Endpoints";

/// Builds the description of one operation with a `summary` and a `description`.
///
/// `has_id` adds the path parameter, `has_body` the request body, and `response` names the schema
/// returned on `success`, if any.
fn operation(
    summary: &str,
    description: &str,
    has_id: bool,
    has_body: bool,
    success: &str,
    response: Option<Value>,
) -> Value {
    let mut responses = json!({});
    responses[success] = json!({ "description": summary });
    if let Some(schema) = response {
        responses[success]["content"] = json!({ "application/json": { "schema": schema } });
    }
    if has_id {
        responses["400"] = json!({ "description": "Invalid employee id" });
        responses["404"] = json!({ "description": "Employee not found" });
    }
    if has_body {
        responses["400"] = json!({ "description": "Invalid employee id or payload" });
    }

    let mut op = json!({
        "tags": [TAG],
        "summary": summary,
        "description": description,
        "responses": responses,
    });
    if has_id {
        op["parameters"] = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64", "minimum": 1 },
        }]);
    }
    if has_body {
        op["requestBody"] = json!({
            "required": true,
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/EmployeeBody" } },
            },
        });
    }
    op
}

/// Returns the OpenAPI 3 description of the employee APIs.
pub(crate) fn description() -> Value {
    let employee = json!({ "$ref": "#/components/schemas/Employee" });
    json!({
        "openapi": "3.0.3",
        "info": { "title": "Employees", "version": env!("CARGO_PKG_VERSION") },
        "tags": [{ "name": TAG, "description": "Operations related to employees" }],
        "paths": {
            "/api/employees": {
                "get": operation(
                    "Get all employees",
                    "Retrieve a list of all employees",
                    false,
                    false,
                    "200",
                    Some(json!({ "type": "array", "items": employee })),
                ),
                "post": operation(
                    "Create a new employee",
                    "Save a new employee",
                    false,
                    true,
                    "201",
                    Some(employee.clone()),
                ),
            },
            "/api/employees/{id}": {
                "get": operation(
                    "Fetch single employee",
                    "Retrieve details of one employee",
                    true,
                    false,
                    "200",
                    Some(employee.clone()),
                ),
                "put": operation(
                    "Update an employee",
                    "Update details of the employee",
                    true,
                    true,
                    "200",
                    Some(employee.clone()),
                ),
                "delete": operation(
                    "Delete an employee",
                    "Delete an employee",
                    true,
                    false,
                    "204",
                    None,
                ),
            },
        },
        "components": {
            "schemas": {
                "Employee": {
                    "type": "object",
                    "required": ["id", "firstName", "lastName", "email"],
                    "properties": {
                        "id": { "type": "integer", "format": "int64", "minimum": 1 },
                        "firstName": { "type": "string" },
                        "lastName": { "type": "string" },
                        "email": { "type": "string" },
                    },
                },
                "EmployeeBody": {
                    "type": "object",
                    "required": ["firstName", "lastName", "email"],
                    "properties": {
                        "id": { "type": "integer", "format": "int64", "readOnly": true },
                        "firstName": { "type": "string", "minLength": 1 },
                        "lastName": { "type": "string", "minLength": 1 },
                        "email": { "type": "string", "minLength": 1 },
                    },
                },
            },
        },
    })
}

/// API handler.
pub(crate) async fn handler(_: EmptyBody) -> Result<impl IntoResponse, RestError> {
    Ok(Json(description()))
}
