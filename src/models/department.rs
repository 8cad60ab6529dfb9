use std::collections::BTreeMap;

use serde::Serialize;

use super::employee::{Employee, EmployeeSummary};

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

/// A department with its employees nested one level deep.
#[derive(Serialize, Debug, Clone)]
pub struct DepartmentView {
    pub id: i64,
    pub name: String,
    pub employees: Vec<EmployeeSummary>,
}

impl DepartmentView {
    /// `employees` must already be filtered to this department.
    pub fn new(department: Department, mut employees: Vec<Employee>) -> Self {
        employees.sort_by_key(|e| e.id);
        DepartmentView {
            id: department.id,
            name: department.name,
            employees: employees.into_iter().map(EmployeeSummary::from).collect(),
        }
    }

    /// Groups a flat employee list under each department via its `department_id`.
    /// Employees without a department, or pointing at a department not in the
    /// list, are dropped.
    pub fn assemble(departments: Vec<Department>, employees: Vec<Employee>) -> Vec<DepartmentView> {
        let mut by_department: BTreeMap<i64, Vec<Employee>> = BTreeMap::new();
        for employee in employees {
            if let Some(department_id) = employee.department_id {
                by_department.entry(department_id).or_default().push(employee);
            }
        }

        departments
            .into_iter()
            .map(|department| {
                let members = by_department.remove(&department.id).unwrap_or_default();
                DepartmentView::new(department, members)
            })
            .collect()
    }
}
