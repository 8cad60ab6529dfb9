use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Store, StoreError};
use crate::models::department::Department;
use crate::models::employee::{Employee, NewEmployee};
use crate::models::user::User;

#[derive(Default)]
struct Tables {
    departments: BTreeMap<i64, Department>,
    employees: BTreeMap<i64, Employee>,
    users: BTreeMap<String, User>,
    department_seq: i64,
    employee_seq: i64,
    user_seq: i64,
}

impl Tables {
    fn check_department(&self, department_id: Option<i64>) -> Result<(), StoreError> {
        match department_id {
            Some(id) if !self.departments.contains_key(&id) => Err(StoreError::UnknownDepartment(id)),
            _ => Ok(()),
        }
    }
}

fn next_id(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

/// Process-local store. Identity values start at 1 and are never reused.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.departments.values().cloned().collect())
    }

    async fn find_department(&self, id: i64) -> Result<Option<Department>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.departments.get(&id).cloned())
    }

    async fn insert_department(&self, name: &str) -> Result<Department, StoreError> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.department_seq);
        let department = Department {
            id,
            name: name.to_string(),
        };
        tables.departments.insert(id, department.clone());
        Ok(department)
    }

    async fn update_department(&self, id: i64, name: &str) -> Result<Department, StoreError> {
        let mut tables = self.tables.write().await;
        let department = tables
            .departments
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Department", id))?;
        department.name = name.to_string();
        Ok(department.clone())
    }

    async fn delete_department(&self, id: i64) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.departments.remove(&id).is_none() {
            return Err(StoreError::not_found("Department", id));
        }
        let before = tables.employees.len();
        tables.employees.retain(|_, e| e.department_id != Some(id));
        Ok((before - tables.employees.len()) as u64)
    }

    async fn list_employees(&self, department_id: Option<i64>) -> Result<Vec<Employee>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .employees
            .values()
            .filter(|e| department_id.map_or(true, |id| e.department_id == Some(id)))
            .cloned()
            .collect())
    }

    async fn find_employee(&self, id: i64) -> Result<Option<Employee>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.employees.get(&id).cloned())
    }

    async fn insert_employee(&self, employee: &NewEmployee) -> Result<Employee, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_department(employee.department_id)?;
        let id = next_id(&mut tables.employee_seq);
        let employee = employee.clone().into_employee(id);
        tables.employees.insert(id, employee.clone());
        Ok(employee)
    }

    async fn update_employee(&self, id: i64, employee: &NewEmployee) -> Result<Employee, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.employees.contains_key(&id) {
            return Err(StoreError::not_found("Employee", id));
        }
        tables.check_department(employee.department_id)?;
        let employee = employee.clone().into_employee(id);
        tables.employees.insert(id, employee.clone());
        Ok(employee)
    }

    async fn delete_employee(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .employees
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("Employee", id))
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(username).cloned())
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(username) {
            return Err(StoreError::Conflict("Username already exists".to_string()));
        }
        let user = User {
            id: next_id(&mut tables.user_seq),
            username: username.to_string(),
            password: password_hash.to_string(),
        };
        tables.users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(username)
            .ok_or_else(|| StoreError::not_found("User", username))?;
        user.password = password_hash.to_string();
        Ok(())
    }
}
