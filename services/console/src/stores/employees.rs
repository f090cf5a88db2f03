//! Display joins used by the employee table and profile views.

use hr_console_core::domain::{Department, Employee, Project};

/// Name of the employee's department, if it is set and still exists.
pub fn department_name<'a>(employee: &Employee, departments: &'a [Department]) -> Option<&'a str> {
    let id = employee.department_id?;
    departments
        .iter()
        .find(|d| d.id == id)
        .map(|d| d.name.as_str())
}

pub fn project_name<'a>(employee: &Employee, projects: &'a [Project]) -> Option<&'a str> {
    let id = employee.project_id?;
    projects
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryTableGateway;
    use crate::stores::{DepartmentStore, EmployeeStore};
    use hr_console_core::domain::{NewDepartment, NewEmployee};
    use std::sync::Arc;

    fn draft(first: &str, department_id: Option<i64>) -> NewEmployee {
        NewEmployee {
            first_name: first.to_string(),
            last_name: "Doe".to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            department_id,
            base_pay: 1000.0,
            ..NewEmployee::default()
        }
    }

    #[tokio::test]
    async fn new_employees_are_listed_first_and_departments_last() {
        let gateway = Arc::new(MemoryTableGateway::new());
        let mut employees = EmployeeStore::new(gateway.clone());
        let mut departments = DepartmentStore::new(gateway.clone());

        employees.add(&draft("Ann", None)).await;
        employees.add(&draft("Bob", None)).await;
        assert_eq!(employees.items()[0].first_name, "Bob");

        for name in ["Sales", "Support"] {
            departments
                .add(&NewDepartment {
                    name: name.to_string(),
                    description: None,
                })
                .await;
        }
        assert_eq!(departments.items()[1].name, "Support");
        assert!(!employees.is_loading());
        assert!(employees.error().is_none());
    }

    #[tokio::test]
    async fn joins_resolve_department_names() {
        let gateway = Arc::new(MemoryTableGateway::new());
        let mut departments = DepartmentStore::new(gateway.clone());
        departments
            .add(&NewDepartment {
                name: "Sales".to_string(),
                description: Some("Field team".to_string()),
            })
            .await;
        let department_id = departments.items()[0].id;

        let mut employees = EmployeeStore::new(gateway.clone());
        employees.add(&draft("Ann", Some(department_id))).await;
        employees.add(&draft("Bob", Some(department_id + 40))).await;
        employees.fetch().await;

        let names: Vec<_> = employees
            .items()
            .iter()
            .map(|e| department_name(e, departments.items()))
            .collect();
        assert!(names.contains(&Some("Sales")));
        assert!(names.contains(&None));
        assert_eq!(project_name(&employees.items()[0], &[]), None);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_items() {
        let gateway = Arc::new(MemoryTableGateway::new());
        let mut employees = EmployeeStore::new(gateway.clone());
        employees.add(&draft("Ann", None)).await;

        gateway.fail_next("network down").await;
        employees.fetch().await;

        assert_eq!(employees.items().len(), 1);
        assert_eq!(employees.error(), Some("network down"));
        assert!(!employees.is_loading());

        employees.fetch().await;
        assert!(employees.error().is_none());
    }

    #[tokio::test]
    async fn update_replaces_the_cached_row() {
        let gateway = Arc::new(MemoryTableGateway::new());
        let mut employees = EmployeeStore::new(gateway.clone());
        employees.add(&draft("Ann", None)).await;
        let id = employees.items()[0].id;

        let mut edited = draft("Ann", None);
        edited.position = "Lead".to_string();
        employees.update(&id, &edited).await;
        assert_eq!(employees.get(&id).map(|e| e.position.as_str()), Some("Lead"));

        employees.delete(&id).await;
        assert!(employees.items().is_empty());
    }
}
