use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: i32,
    pub salary: f64,
    pub department_id: Option<i64>,
}

/// Column values for an insert or a full replace. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: i32,
    pub salary: f64,
    pub department_id: Option<i64>,
}

impl NewEmployee {
    pub fn into_employee(self, id: i64) -> Employee {
        Employee {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            age: self.age,
            salary: self.salary,
            department_id: self.department_id,
        }
    }
}

/// Standalone employee representation. The owning department is a plain id.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: i32,
    pub salary: f64,
    pub department_id: Option<i64>,
}

impl From<Employee> for EmployeeView {
    fn from(employee: Employee) -> Self {
        EmployeeView {
            id: employee.id,
            first_name: employee.first_name,
            last_name: employee.last_name,
            email: employee.email,
            age: employee.age,
            salary: employee.salary,
            department_id: employee.department_id,
        }
    }
}

/// Employee as nested under its department. Carries no department field.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: i32,
    pub salary: f64,
}

impl From<Employee> for EmployeeSummary {
    fn from(employee: Employee) -> Self {
        EmployeeSummary {
            id: employee.id,
            first_name: employee.first_name,
            last_name: employee.last_name,
            email: employee.email,
            age: employee.age,
            salary: employee.salary,
        }
    }
}

/// `{ "id": .. }` as posted by the UI's department selector.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct DepartmentRef {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
}

/// Accepts a number, a numeric string, an empty string or null.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| de::Error::custom("department id must be an integer")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid department id: {}", s))),
        Some(other) => Err(de::Error::custom(format!("invalid department id: {}", other))),
    }
}
