use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::errors::AppError;
use crate::models::department::DepartmentView;
use crate::startup::AppState;

/// Any name is accepted, including an empty one.
#[derive(Deserialize)]
pub struct DepartmentPayload {
    #[serde(default)]
    name: String,
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Department {} not found", id))
}

pub async fn get_departments(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let departments = state.store.list_departments().await?;
    let employees = state.store.list_employees(None).await?;

    Ok(HttpResponse::Ok().json(DepartmentView::assemble(departments, employees)))
}

pub async fn get_department(
    state: web::Data<AppState>,
    department_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let department_id = department_id.into_inner();

    let department = state
        .store
        .find_department(department_id)
        .await?
        .ok_or_else(|| not_found(department_id))?;
    let employees = state.store.list_employees(Some(department_id)).await?;

    Ok(HttpResponse::Ok().json(DepartmentView::new(department, employees)))
}

pub async fn create_department(
    state: web::Data<AppState>,
    new_department: web::Json<DepartmentPayload>,
) -> Result<HttpResponse, AppError> {
    let department = state.store.insert_department(&new_department.name).await?;
    info!("Created department {} ('{}')", department.id, department.name);

    Ok(HttpResponse::Created().json(DepartmentView::new(department, Vec::new())))
}

pub async fn update_department(
    state: web::Data<AppState>,
    department_id: web::Path<i64>,
    updates: web::Json<DepartmentPayload>,
) -> Result<HttpResponse, AppError> {
    let department_id = department_id.into_inner();

    let department = state.store.update_department(department_id, &updates.name).await?;
    let employees = state.store.list_employees(Some(department_id)).await?;

    Ok(HttpResponse::Ok().json(DepartmentView::new(department, employees)))
}

pub async fn delete_department(
    state: web::Data<AppState>,
    department_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let department_id = department_id.into_inner();

    let removed = state.store.delete_department(department_id).await?;
    info!("Deleted department {} and {} employee(s)", department_id, removed);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Department deleted successfully",
        "employeesRemoved": removed,
    })))
}
