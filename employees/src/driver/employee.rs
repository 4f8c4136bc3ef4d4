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

//! Operations on one employee.

use crate::db;
use crate::driver::{Driver, convert_to_employee, map_employee_error};
use crate::model::{Employee, EmployeeId, EmployeeRequest};
use iii_iv_core::driver::DriverResult;
use log::info;

impl Driver {
    /// Gets the employee identified by `id`.
    pub(crate) async fn find_by_id(self, id: EmployeeId) -> DriverResult<Employee> {
        let employee =
            db::find_by_id(&mut self.db.ex().await?, id).await.map_err(map_employee_error(id))?;
        Ok(employee)
    }

    /// Replaces all fields of the existing employee identified by `id` with those in `request`.
    pub(crate) async fn update(
        self,
        id: EmployeeId,
        request: EmployeeRequest,
    ) -> DriverResult<Employee> {
        let mut tx = self.db.begin().await?;
        let employee = db::save(tx.ex(), convert_to_employee(Some(id), request))
            .await
            .map_err(map_employee_error(id))?;
        tx.commit().await?;

        info!("Updated employee {}", id);
        Ok(employee)
    }

    /// Deletes the employee identified by `id`.
    pub(crate) async fn delete_by_id(self, id: EmployeeId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        db::delete_by_id(tx.ex(), id).await.map_err(map_employee_error(id))?;
        tx.commit().await?;

        info!("Deleted employee {}", id);
        Ok(())
    }
}
