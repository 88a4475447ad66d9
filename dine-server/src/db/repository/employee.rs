//! Employee Repository
//!
//! 员工记录仅用于订单操作人归属与视图水合；凭证签发在本服务之外。

use shared::models::{Employee, EmployeeCreate};
use shared::util::snowflake_id;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, record_id};

const TABLE: &str = "employee";

#[derive(Clone)]
pub struct EmployeeRepository {
    base: BaseRepository,
}

impl EmployeeRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find employee by id
    pub async fn find_by_id(&self, id: i64) -> RepoResult<Option<Employee>> {
        let mut result = self
            .base
            .db()
            .query("SELECT *, record::id(id) AS id FROM employee WHERE id = $id LIMIT 1")
            .bind(("id", record_id(TABLE, id)))
            .await?;
        let employees: Vec<Employee> = result.take(0)?;
        Ok(employees.into_iter().next())
    }

    /// Create a new employee
    pub async fn create(&self, data: EmployeeCreate) -> RepoResult<Employee> {
        let mut result = self
            .base
            .db()
            .query("SELECT *, record::id(id) AS id FROM employee WHERE username = $username LIMIT 1")
            .bind(("username", data.username.clone()))
            .await?;
        let existing: Vec<Employee> = result.take(0)?;
        if !existing.is_empty() {
            return Err(RepoError::Duplicate(format!(
                "Employee username '{}' already exists",
                data.username
            )));
        }

        let employee = Employee {
            id: snowflake_id(),
            name: data.name,
            username: data.username,
            is_active: true,
        };

        self.base
            .db()
            .query("CREATE employee CONTENT $data RETURN NONE")
            .bind(("data", employee.clone()))
            .await?
            .check()?;
        Ok(employee)
    }
}
