pub mod domain;
pub mod ports;

pub use domain::{
    AuthChange, AuthEvent, Department, Document, Employee, EmployeeRequest, NewDepartment,
    NewDocument, NewEmployee, NewProject, Notification, NotificationFilter, Project,
    ProjectStatus, RequestDetails, RequestStatus, Session, SignUpProfile, User, UserProfile,
    Visibility,
};
pub use ports::{
    AuthChangeStream, AuthGateway, BlobStorage, Filter, LocalStorage, Order, PortError,
    PortResult, Query, Table, TableGateway,
};
