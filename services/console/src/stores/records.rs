//! Table bindings for each entity record.

use super::{Editable, Record};
use hr_console_core::domain::{
    Department, Document, Employee, EmployeeRequest, NewDepartment, NewDocument, NewEmployee,
    NewProject, Project,
};
use hr_console_core::ports::Table;
use uuid::Uuid;

impl Record for Employee {
    type Id = i64;
    const TABLE: Table = Table::Employees;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> &i64 {
        &self.id
    }
}

impl Editable for Employee {
    type Draft = NewEmployee;
}

impl Record for Department {
    type Id = i64;
    const TABLE: Table = Table::Departments;
    const NEWEST_FIRST: bool = false;

    fn id(&self) -> &i64 {
        &self.id
    }
}

impl Editable for Department {
    type Draft = NewDepartment;
}

impl Record for Project {
    type Id = i64;
    const TABLE: Table = Table::Projects;
    const NEWEST_FIRST: bool = false;

    fn id(&self) -> &i64 {
        &self.id
    }
}

impl Editable for Project {
    type Draft = NewProject;
}

impl Record for Document {
    type Id = i64;
    const TABLE: Table = Table::Documents;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> &i64 {
        &self.id
    }
}

impl Editable for Document {
    type Draft = NewDocument;
}

// Requests are filed elsewhere; the console only reviews them.
impl Record for EmployeeRequest {
    type Id = Uuid;
    const TABLE: Table = Table::EmployeeRequests;
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> &Uuid {
        &self.id
    }
}
