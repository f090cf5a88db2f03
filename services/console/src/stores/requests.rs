//! services/console/src/stores/requests.rs
//!
//! Review of employee requests. Reviewing stamps the decision, the reviewer and
//! the time, then re-reads the whole list so the view shows the stored state.

use super::{Record, TableStore};
use chrono::{SecondsFormat, Utc};
use hr_console_core::domain::{EmployeeRequest, RequestStatus};
use hr_console_core::ports::{Filter, PortError, Query, Table};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

/// The two outcomes a reviewer can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept,
    Decline,
}

impl ReviewDecision {
    pub fn status(self) -> RequestStatus {
        match self {
            ReviewDecision::Accept => RequestStatus::Accepted,
            ReviewDecision::Decline => RequestStatus::Declined,
        }
    }
}

impl TableStore<EmployeeRequest> {
    pub fn pending(&self) -> impl Iterator<Item = &EmployeeRequest> {
        self.items()
            .iter()
            .filter(|r| r.status == RequestStatus::Pending)
    }

    pub async fn update_status(&mut self, id: Uuid, decision: ReviewDecision, reviewer: &str) {
        let _busy = self.begin();
        let patch = json!({
            "status": decision.status(),
            "reviewed_at": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "reviewed_by": reviewer,
        });
        let filters = [Filter::eq("id", id.to_string())];
        let result = match self
            .gateway()
            .update(Table::EmployeeRequests, &filters, patch)
            .await
        {
            Ok(rows) if rows.is_empty() => Err(PortError::NotFound(format!("Request {}", id))),
            Ok(_) => self.select(&Query::new().order(EmployeeRequest::fetch_order())).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(items) => {
                info!(request = %id, status = ?decision.status(), "Request reviewed");
                self.items = items;
            }
            Err(e) => self.fail(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryTableGateway;
    use crate::stores::RequestStore;
    use hr_console_core::ports::TableGateway;
    use std::sync::Arc;

    async fn seed(gateway: &MemoryTableGateway, employee_id: i64, created_at: &str) -> Uuid {
        let row = gateway
            .insert(
                Table::EmployeeRequests,
                json!({
                    "employee_id": employee_id,
                    "type": "leave",
                    "details": {
                        "start_date": "2025-05-01",
                        "end_date": "2025-05-03",
                        "reason": "trip"
                    },
                    "status": "pending",
                    "created_at": created_at,
                    "reviewed_at": null,
                    "reviewed_by": null,
                }),
            )
            .await
            .unwrap();
        serde_json::from_value::<EmployeeRequest>(row).unwrap().id
    }

    #[tokio::test]
    async fn requests_are_listed_newest_first() {
        let gateway = Arc::new(MemoryTableGateway::new());
        seed(&gateway, 1, "2025-04-20T08:00:00Z").await;
        let newest = seed(&gateway, 2, "2025-04-22T08:00:00Z").await;

        let mut store = RequestStore::new(gateway.clone());
        store.fetch().await;
        assert_eq!(store.items()[0].id, newest);
        assert_eq!(store.pending().count(), 2);
    }

    #[tokio::test]
    async fn review_stamps_reviewer_and_refetches() {
        let gateway = Arc::new(MemoryTableGateway::new());
        let id = seed(&gateway, 1, "2025-04-20T08:00:00Z").await;

        let mut store = RequestStore::new(gateway.clone());
        store.update_status(id, ReviewDecision::Decline, "reviewer-1").await;

        let request = store.get(&id).cloned().unwrap();
        assert_eq!(request.status, RequestStatus::Declined);
        assert_eq!(request.reviewed_by.as_deref(), Some("reviewer-1"));
        assert!(request.reviewed_at.is_some());
        assert_eq!(store.pending().count(), 0);
    }

    #[tokio::test]
    async fn reviewing_an_unknown_request_sets_error() {
        let gateway = Arc::new(MemoryTableGateway::new());
        let mut store = RequestStore::new(gateway.clone());
        store.update_status(Uuid::new_v4(), ReviewDecision::Accept, "r").await;
        assert!(store.error().is_some());
        assert!(!store.is_loading());
    }
}
