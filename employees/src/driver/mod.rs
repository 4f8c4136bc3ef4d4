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

//! Business logic for the service.

use crate::model::{Employee, EmployeeId, EmployeeRequest};
use iii_iv_core::db::{Db, DbError};
use iii_iv_core::driver::DriverError;
use std::sync::Arc;

mod employee;
mod employees;
#[cfg(test)]
pub(crate) mod testutils;

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub(crate) struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,
}

impl Driver {
    /// Creates a new driver backed by the given injected components.
    pub(crate) fn new(db: Arc<dyn Db + Send + Sync>) -> Self {
        Self { db }
    }
}

/// Builds the employee to persist from the fields of a `request` and an optional `id`.
///
/// A missing `id` asks the database to assign a new one.
pub(crate) fn convert_to_employee(id: Option<EmployeeId>, request: EmployeeRequest) -> Employee {
    let (first_name, last_name, email) = request.dissolve();
    Employee::new(id, first_name, last_name, email)
}

/// Returns a function to map database errors that refer to the employee `id` into driver errors.
fn map_employee_error(id: EmployeeId) -> impl FnOnce(DbError) -> DriverError {
    move |e| match e {
        DbError::NotFound => DriverError::NotFound(format!("Employee {} not found", id)),
        e => DriverError::from(e),
    }
}
