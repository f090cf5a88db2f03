//! Dashboard aggregates computed from the cached entity lists.

use super::employees::department_name;
use hr_console_core::domain::{Department, Employee, Project, ProjectStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_employees: usize,
    pub total_departments: usize,
    pub total_projects: usize,
    /// Mean `base_pay`, or 0 with no employees.
    pub average_base_pay: f64,
    /// Employees per department name, in order of first appearance.
    /// Employees without a resolvable department are left out.
    pub headcount_by_department: Vec<(String, usize)>,
    /// One entry per status, zero counts included.
    pub projects_by_status: Vec<(ProjectStatus, usize)>,
}

pub fn summarize(
    employees: &[Employee],
    departments: &[Department],
    projects: &[Project],
) -> DashboardSummary {
    let average_base_pay = if employees.is_empty() {
        0.0
    } else {
        employees.iter().map(|e| e.base_pay).sum::<f64>() / employees.len() as f64
    };

    let mut headcount: Vec<(String, usize)> = Vec::new();
    for name in employees.iter().filter_map(|e| department_name(e, departments)) {
        match headcount.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => *count += 1,
            None => headcount.push((name.to_string(), 1)),
        }
    }

    let projects_by_status = ProjectStatus::ALL
        .iter()
        .map(|&status| (status, projects.iter().filter(|p| p.status == status).count()))
        .collect();

    DashboardSummary {
        total_employees: employees.len(),
        total_departments: departments.len(),
        total_projects: projects.len(),
        average_base_pay,
        headcount_by_department: headcount,
        projects_by_status,
    }
}
