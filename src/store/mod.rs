//! Persistence boundary.
//!
//! Handlers only ever see `dyn Store`. `PgStore` is the production backend;
//! `MemoryStore` serves local runs without a database and the test suites.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::department::Department;
use crate::models::employee::{Employee, NewEmployee};
use crate::models::user::User;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
    #[error("{0}")]
    Conflict(String),
    #[error("Department {0} does not exist")]
    UnknownDepartment(i64),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_departments(&self) -> Result<Vec<Department>, StoreError>;
    async fn find_department(&self, id: i64) -> Result<Option<Department>, StoreError>;
    async fn insert_department(&self, name: &str) -> Result<Department, StoreError>;
    async fn update_department(&self, id: i64, name: &str) -> Result<Department, StoreError>;
    /// Removes the department and every employee pointing at it.
    /// Returns the number of employees removed.
    async fn delete_department(&self, id: i64) -> Result<u64, StoreError>;

    /// Ordered by id. `Some(id)` restricts to one department.
    async fn list_employees(&self, department_id: Option<i64>) -> Result<Vec<Employee>, StoreError>;
    async fn find_employee(&self, id: i64) -> Result<Option<Employee>, StoreError>;
    async fn insert_employee(&self, employee: &NewEmployee) -> Result<Employee, StoreError>;
    async fn update_employee(&self, id: i64, employee: &NewEmployee) -> Result<Employee, StoreError>;
    async fn delete_employee(&self, id: i64) -> Result<(), StoreError>;

    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;
    async fn update_password(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;
}
