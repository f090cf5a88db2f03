//! crates/hr_console_core/src/domain.rs
//!
//! Defines the core data structures of the HR console.
//! Entity records mirror the remote table rows one to one; the auth and
//! notification types are shared by the session manager and its adapters.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Authentication
//=========================================================================================

/// The signed-in identity attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

/// An authenticated session as handed out by the auth gateway.
///
/// The gateway owns the session; everything else holds a read-only copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// Kinds of session change events published by the auth gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// One session change event together with its (possibly absent) session payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl AuthChange {
    pub fn signed_in(session: Session) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
        }
    }
}

/// Extra profile fields collected at registration and attached to the new user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpProfile {
    pub name: String,
    pub phone: String,
}

/// Visibility of the hosting page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    /// Maps a page `visibilityState` value; anything but `"visible"` counts as hidden.
    pub fn from_state(state: &str) -> Self {
        if state == "visible" {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }

    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

//=========================================================================================
// Notifications
//=========================================================================================

/// A persisted, user-markable notice shown in the header dropdown.
///
/// The serialized field names match what the browser console already keeps in
/// local storage; the longer names are accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    #[serde(rename = "type", alias = "category")]
    pub category: String,
    #[serde(rename = "link", alias = "targetLink")]
    pub target_link: String,
    #[serde(rename = "isRead")]
    pub is_read: bool,
    #[serde(rename = "timestamp", alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Which part of the notification collection a view wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationFilter {
    #[default]
    All,
    Unread,
}

//=========================================================================================
// Entity Records
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub email: String,
    pub phone: String,
    pub birthdate: Option<NaiveDate>,
    pub gender: String,
    pub address: String,
    pub profile_url: Option<String>,
    pub employment_type: String,
    pub department_id: Option<i64>,
    pub project_id: Option<i64>,
    #[serde(default)]
    pub base_pay: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The editable fields of an employee, as submitted by the employee form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub email: String,
    pub phone: String,
    pub birthdate: Option<NaiveDate>,
    pub gender: String,
    pub address: String,
    pub profile_url: Option<String>,
    pub employment_type: String,
    pub department_id: Option<i64>,
    pub project_id: Option<i64>,
    pub base_pay: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    InProgress,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Planning,
        ProjectStatus::InProgress,
        ProjectStatus::Completed,
        ProjectStatus::OnHold,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProjectStatus::Planning => "Planning",
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::OnHold => "On Hold",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub department_id: Option<i64>,
    #[serde(default)]
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub department_id: Option<i64>,
    pub status: ProjectStatus,
}

/// Metadata row for a file attached to an employee.
///
/// Rows without a URL are custom document labels awaiting an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub employee_id: i64,
    pub document_type: String,
    pub document_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub employee_id: i64,
    pub document_type: String,
    pub document_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

/// Free-form request details; the leave fields are the common ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A leave or other HR request filed by an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRequest {
    pub id: Uuid,
    pub employee_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub details: RequestDetails,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
}

/// Profile row written to `user_credentials` right after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_uses_browser_field_names() {
        let json = concat!(
            r#"{"id":1,"message":"Pending leave request","type":"request","#,
            r#""link":"/employees/requests","isRead":false,"timestamp":"2025-04-22T10:00:00Z"}"#
        );
        let parsed: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.category, "request");
        assert_eq!(parsed.target_link, "/employees/requests");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }

    #[test]
    fn notification_accepts_long_field_names() {
        let json = concat!(
            r#"{"id":7,"message":"m","category":"info","targetLink":"/x","isRead":true,"#,
            r#""createdAt":"2025-01-01T00:00:00Z"}"#
        );
        let parsed: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id, 7);
        assert!(parsed.is_read);
        assert_eq!(parsed.target_link, "/x");
    }

    #[test]
    fn visibility_treats_unknown_states_as_hidden() {
        assert_eq!(Visibility::from_state("visible"), Visibility::Visible);
        assert_eq!(Visibility::from_state("hidden"), Visibility::Hidden);
        assert_eq!(Visibility::from_state("prerender"), Visibility::Hidden);
    }

    #[test]
    fn request_details_keep_unknown_keys() {
        let json = r#"{"start_date":"2025-05-01","reason":"trip","days":3}"#;
        let details: RequestDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.reason.as_deref(), Some("trip"));
        assert_eq!(details.extra.get("days"), Some(&serde_json::json!(3)));
    }
}
