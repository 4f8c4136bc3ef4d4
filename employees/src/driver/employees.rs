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

//! Operations on the collection of employees.

use crate::db;
use crate::driver::{Driver, convert_to_employee};
use crate::model::{Employee, EmployeeRequest};
use iii_iv_core::driver::DriverResult;
use log::info;

impl Driver {
    /// Gets all employees sorted by identifier.
    pub(crate) async fn find_all(self) -> DriverResult<Vec<Employee>> {
        let employees = db::find_all(&mut self.db.ex().await?).await?;
        Ok(employees)
    }

    /// Creates a new employee from `request`.  The database assigns its identifier.
    pub(crate) async fn save(self, request: EmployeeRequest) -> DriverResult<Employee> {
        let mut tx = self.db.begin().await?;
        let employee = db::save(tx.ex(), convert_to_employee(None, request)).await?;
        tx.commit().await?;

        if let Some(id) = employee.id() {
            info!("Created employee {}", id);
        }
        Ok(employee)
    }
}

#[cfg(test)]
mod tests {
    use crate::db;
    use crate::driver::testutils::*;
    use crate::model::*;
    use iii_iv_core::driver::DriverError;

    #[tokio::test]
    async fn test_find_all_empty() {
        let context = TestContext::setup().await;

        assert!(context.driver().find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_all_some() {
        let context = TestContext::setup().await;

        let ada = context.insert("Ada", "Lovelace", "ada@x.com").await;
        let alan = context.insert("Alan", "Turing", "alan@x.com").await;

        assert_eq!(vec![ada, alan], context.driver().find_all().await.unwrap());
    }

    #[tokio::test]
    async fn test_find_all_storage_error() {
        let context = TestContext::setup().await;

        context.close().await;

        match context.driver().find_all().await {
            Err(DriverError::BackendError(_)) => (),
            e => panic!("Must have failed with a BackendError but got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_save_assigns_id() {
        let context = TestContext::setup().await;

        let request = EmployeeRequest::new(
            "Ada".to_owned(),
            "Lovelace".to_owned(),
            "ada@x.com".to_owned(),
        )
        .unwrap();
        let employee = context.driver().save(request).await.unwrap();

        let id = employee.id().expect("Saved employees must have an id");
        assert_eq!("Ada", employee.first_name());
        assert_eq!("Lovelace", employee.last_name());
        assert_eq!("ada@x.com", employee.email());

        assert_eq!(employee, db::find_by_id(&mut context.ex().await, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_twice_creates_two() {
        let context = TestContext::setup().await;

        let request = EmployeeRequest::new(
            "Ada".to_owned(),
            "Lovelace".to_owned(),
            "ada@x.com".to_owned(),
        )
        .unwrap();
        let first = context.driver().save(request.clone()).await.unwrap();
        let second = context.driver().save(request).await.unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(2, db::find_all(&mut context.ex().await).await.unwrap().len());
    }
}
