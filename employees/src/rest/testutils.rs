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

//! Test utilities for the REST API.

use crate::db;
use crate::driver::Driver;
use crate::model::{Employee, EmployeeId};
use crate::rest::app;
use axum::Router;
use iii_iv_core::db::{Db, DbError};
use std::sync::Arc;

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the app, for direct access from the tests.
    db: Arc<dyn Db + Send + Sync>,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app using an in-memory database.
    pub(crate) async fn setup() -> Self {
        let db = Arc::new(iii_iv_core::db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let driver = Driver::new(db.clone());
        let app = app(driver);
        Self { db, app }
    }

    /// Gets a copy of the app under test.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the app under test.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Closes the database so that further operations fail.
    pub(crate) async fn close(&self) {
        self.db.close().await;
    }

    /// Inserts a new employee directly into the database.
    pub(crate) async fn insert(&self, first_name: &str, last_name: &str, email: &str) -> Employee {
        let employee =
            Employee::new(None, first_name.to_owned(), last_name.to_owned(), email.to_owned());
        db::save(&mut self.db.ex().await.unwrap(), employee).await.unwrap()
    }

    /// Gets the employee with `id` directly from the database, if it exists.
    pub(crate) async fn get(&self, id: EmployeeId) -> Option<Employee> {
        match db::find_by_id(&mut self.db.ex().await.unwrap(), id).await {
            Ok(employee) => Some(employee),
            Err(DbError::NotFound) => None,
            Err(e) => panic!("Failed to query employee {}: {}", id, e),
        }
    }

    /// Gets all employees directly from the database.
    pub(crate) async fn all(&self) -> Vec<Employee> {
        db::find_all(&mut self.db.ex().await.unwrap()).await.unwrap()
    }
}
