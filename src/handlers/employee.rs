use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::errors::AppError;
use crate::models::employee::{lenient_id, DepartmentRef, EmployeeView, NewEmployee};
use crate::startup::AppState;
use crate::utils::validation::validate_payload;

/// Accepts the department either nested (`"department": {"id": 1}`) or flat
/// (`"departmentId": 1`). The nested form wins when both are sent.
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePayload {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[validate(email)]
    email: String,
    #[validate(range(min = 0))]
    age: i32,
    #[validate(range(min = 0.0))]
    salary: f64,
    #[serde(default)]
    department: Option<DepartmentRef>,
    #[serde(default, deserialize_with = "lenient_id")]
    department_id: Option<i64>,
}

impl EmployeePayload {
    fn into_new_employee(self) -> NewEmployee {
        let department_id = self.department.and_then(|d| d.id).or(self.department_id);
        NewEmployee {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            age: self.age,
            salary: self.salary,
            department_id,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeQueryParams {
    department_id: Option<String>,
}

impl EmployeeQueryParams {
    /// An empty `departmentId` means no filter, like an empty id in the body.
    fn department_filter(&self) -> Result<Option<i64>, AppError> {
        match self.department_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|_| AppError::BadRequest(format!("invalid department id: {}", raw))),
        }
    }
}

pub async fn get_employees(
    state: web::Data<AppState>,
    query: web::Query<EmployeeQueryParams>,
) -> Result<HttpResponse, AppError> {
    let employees = state.store.list_employees(query.department_filter()?).await?;
    let views: Vec<EmployeeView> = employees.into_iter().map(EmployeeView::from).collect();

    Ok(HttpResponse::Ok().json(views))
}

pub async fn get_employee(
    state: web::Data<AppState>,
    employee_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let employee_id = employee_id.into_inner();

    let employee = state
        .store
        .find_employee(employee_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;

    Ok(HttpResponse::Ok().json(EmployeeView::from(employee)))
}

pub async fn create_employee(
    state: web::Data<AppState>,
    new_employee: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*new_employee)?;

    let employee = state
        .store
        .insert_employee(&new_employee.into_inner().into_new_employee())
        .await?;
    info!("Created employee {}", employee.id);

    Ok(HttpResponse::Created().json(EmployeeView::from(employee)))
}

pub async fn update_employee(
    state: web::Data<AppState>,
    employee_id: web::Path<i64>,
    updates: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*updates)?;

    let employee = state
        .store
        .update_employee(employee_id.into_inner(), &updates.into_inner().into_new_employee())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeView::from(employee)))
}

pub async fn delete_employee(
    state: web::Data<AppState>,
    employee_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let employee_id = employee_id.into_inner();

    state.store.delete_employee(employee_id).await?;
    info!("Deleted employee {}", employee_id);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted successfully",
    })))
}
