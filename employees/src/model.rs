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

//! High-level data types.

use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use iii_iv_core::model::{ModelError, ModelResult};
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// Identifier of an employee as assigned by the database.  Always positive.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(transparent)]
pub(crate) struct EmployeeId(i64);

impl EmployeeId {
    /// Creates an identifier from a raw `id`, which must be positive.
    pub(crate) fn new(id: i64) -> ModelResult<Self> {
        if id < 1 {
            return Err(ModelError(format!("Employee id must be a positive integer; got {}", id)));
        }
        Ok(Self(id))
    }

    /// Returns the identifier as an `i64` for storage.
    pub(crate) fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Checks that the `name` field has a `value` with non-whitespace content.
fn validate_present(name: &'static str, value: String) -> ModelResult<String> {
    if value.trim().is_empty() {
        return Err(ModelError(format!("{} cannot be empty", name)));
    }
    Ok(value)
}

/// The fields of an employee that clients are allowed to supply.
#[derive(Dissolve)]
#[cfg_attr(test, derive(Clone, Debug, PartialEq))]
pub(crate) struct EmployeeRequest {
    /// Given name.
    first_name: String,

    /// Family name.
    last_name: String,

    /// Contact email.  Not checked for uniqueness.
    email: String,
}

impl EmployeeRequest {
    /// Creates a new request, validating that all fields are present.
    pub(crate) fn new(first_name: String, last_name: String, email: String) -> ModelResult<Self> {
        Ok(Self {
            first_name: validate_present("First name", first_name)?,
            last_name: validate_present("Last name", last_name)?,
            email: validate_present("Email", email)?,
        })
    }
}

/// An employee record.
///
/// The `id` is only missing for employees that have not been persisted yet.
#[derive(Constructor, Getters, Serialize)]
#[cfg_attr(test, derive(Clone, Debug, Deserialize, PartialEq))]
#[serde(rename_all = "camelCase")]
pub(crate) struct Employee {
    /// Database-assigned identifier.
    id: Option<EmployeeId>,

    /// Given name.
    first_name: String,

    /// Family name.
    last_name: String,

    /// Contact email.
    email: String,
}

impl Employee {
    /// Returns a copy of this employee with its identifier set to `id`.
    pub(crate) fn with_id(self, id: EmployeeId) -> Self {
        Self { id: Some(id), ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{Token, assert_tokens};

    #[test]
    fn test_employee_id_ok() {
        assert_eq!(1, EmployeeId::new(1).unwrap().as_i64());
        assert_eq!(i64::MAX, EmployeeId::new(i64::MAX).unwrap().as_i64());
        assert_eq!("42", EmployeeId::new(42).unwrap().to_string());
    }

    #[test]
    fn test_employee_id_not_positive() {
        for id in [0, -1, i64::MIN] {
            let err = EmployeeId::new(id).unwrap_err();
            assert!(err.0.contains("must be a positive integer"));
            assert!(err.0.contains(&id.to_string()));
        }
    }

    #[test]
    fn test_employee_request_ok() {
        let request =
            EmployeeRequest::new("Ada".to_owned(), "Lovelace".to_owned(), "ada@x.com".to_owned())
                .unwrap();
        assert_eq!(
            ("Ada".to_owned(), "Lovelace".to_owned(), "ada@x.com".to_owned()),
            request.dissolve()
        );
    }

    #[test]
    fn test_employee_request_blank_fields() {
        assert_eq!(
            ModelError("First name cannot be empty".to_owned()),
            EmployeeRequest::new("".to_owned(), "b".to_owned(), "c".to_owned()).unwrap_err()
        );
        assert_eq!(
            ModelError("Last name cannot be empty".to_owned()),
            EmployeeRequest::new("a".to_owned(), " \t".to_owned(), "c".to_owned()).unwrap_err()
        );
        assert_eq!(
            ModelError("Email cannot be empty".to_owned()),
            EmployeeRequest::new("a".to_owned(), "b".to_owned(), "\n".to_owned()).unwrap_err()
        );
    }

    #[test]
    fn test_employee_with_id() {
        let employee =
            Employee::new(None, "Ada".to_owned(), "Lovelace".to_owned(), "ada@x.com".to_owned());
        let employee = employee.with_id(EmployeeId::new(5).unwrap());
        assert_eq!(&Some(EmployeeId::new(5).unwrap()), employee.id());
        assert_eq!("Ada", employee.first_name());
    }

    #[test]
    fn test_employee_ser_de() {
        let employee = Employee::new(
            Some(EmployeeId::new(3).unwrap()),
            "Ada".to_owned(),
            "Lovelace".to_owned(),
            "ada@x.com".to_owned(),
        );
        assert_tokens(
            &employee,
            &[
                Token::Struct { name: "Employee", len: 4 },
                Token::Str("id"),
                Token::Some,
                Token::I64(3),
                Token::Str("firstName"),
                Token::Str("Ada"),
                Token::Str("lastName"),
                Token::Str("Lovelace"),
                Token::Str("email"),
                Token::Str("ada@x.com"),
                Token::StructEnd,
            ],
        );
    }
}
