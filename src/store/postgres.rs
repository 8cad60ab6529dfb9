use async_trait::async_trait;
use sqlx::PgPool;

use super::{Store, StoreError};
use crate::models::department::Department;
use crate::models::employee::{Employee, NewEmployee};
use crate::models::user::User;

const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, email, age, salary, department_id";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    async fn check_department(&self, department_id: Option<i64>) -> Result<(), StoreError> {
        let Some(id) = department_id else {
            return Ok(());
        };
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM departments WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Ok(())
        } else {
            Err(StoreError::UnknownDepartment(id))
        }
    }
}

/// Folds constraint violations into the store's own error kinds.
fn map_write_error(err: sqlx::Error, department_id: Option<i64>) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::Conflict("Username already exists".to_string());
        }
        if db_err.is_foreign_key_violation() {
            if let Some(id) = department_id {
                return StoreError::UnknownDepartment(id);
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        let departments = sqlx::query_as::<_, Department>("SELECT id, name FROM departments ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(departments)
    }

    async fn find_department(&self, id: i64) -> Result<Option<Department>, StoreError> {
        let department = sqlx::query_as::<_, Department>("SELECT id, name FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(department)
    }

    async fn insert_department(&self, name: &str) -> Result<Department, StoreError> {
        let department =
            sqlx::query_as::<_, Department>("INSERT INTO departments (name) VALUES ($1) RETURNING id, name")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(department)
    }

    async fn update_department(&self, id: i64, name: &str) -> Result<Department, StoreError> {
        sqlx::query_as::<_, Department>("UPDATE departments SET name = $1 WHERE id = $2 RETURNING id, name")
            .bind(name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("Department", id))
    }

    async fn delete_department(&self, id: i64) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM employees WHERE department_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(StoreError::not_found("Department", id));
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn list_employees(&self, department_id: Option<i64>) -> Result<Vec<Employee>, StoreError> {
        let employees = match department_id {
            Some(id) => {
                let sql = format!(
                    "SELECT {} FROM employees WHERE department_id = $1 ORDER BY id",
                    EMPLOYEE_COLUMNS
                );
                sqlx::query_as::<_, Employee>(&sql)
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {} FROM employees ORDER BY id", EMPLOYEE_COLUMNS);
                sqlx::query_as::<_, Employee>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(employees)
    }

    async fn find_employee(&self, id: i64) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {} FROM employees WHERE id = $1", EMPLOYEE_COLUMNS);
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    async fn insert_employee(&self, employee: &NewEmployee) -> Result<Employee, StoreError> {
        self.check_department(employee.department_id).await?;

        let sql = format!(
            "INSERT INTO employees (first_name, last_name, email, age, salary, department_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            EMPLOYEE_COLUMNS
        );
        sqlx::query_as::<_, Employee>(&sql)
            .bind(&employee.first_name)
            .bind(&employee.last_name)
            .bind(&employee.email)
            .bind(employee.age)
            .bind(employee.salary)
            .bind(employee.department_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_write_error(err, employee.department_id))
    }

    async fn update_employee(&self, id: i64, employee: &NewEmployee) -> Result<Employee, StoreError> {
        self.check_department(employee.department_id).await?;

        let sql = format!(
            "UPDATE employees SET first_name = $1, last_name = $2, email = $3, age = $4, salary = $5, \
             department_id = $6 WHERE id = $7 RETURNING {}",
            EMPLOYEE_COLUMNS
        );
        sqlx::query_as::<_, Employee>(&sql)
            .bind(&employee.first_name)
            .bind(&employee.last_name)
            .bind(&employee.email)
            .bind(employee.age)
            .bind(employee.salary)
            .bind(employee.department_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_write_error(err, employee.department_id))?
            .ok_or_else(|| StoreError::not_found("Employee", id))
    }

    async fn delete_employee(&self, id: i64) -> Result<(), StoreError> {
        let deleted = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(StoreError::not_found("Employee", id));
        }
        Ok(())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT id, username, password FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password) VALUES ($1, $2) RETURNING id, username, password",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_write_error(err, None))
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let updated = sqlx::query("UPDATE users SET password = $1 WHERE username = $2")
            .bind(password_hash)
            .bind(username)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StoreError::not_found("User", username));
        }
        Ok(())
    }
}
