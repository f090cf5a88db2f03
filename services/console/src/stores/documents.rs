//! services/console/src/stores/documents.rs
//!
//! Employee documents: metadata rows in the `documents` table plus the file
//! itself in blob storage.

use super::TableStore;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use hr_console_core::domain::{Document, NewDocument};
use hr_console_core::ports::{BlobStorage, Filter, Order, PortResult, Query, Table};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{error, info};

pub const DOCUMENT_BUCKET: &str = "employee-documents";

/// Labels every employee profile offers, before any custom ones.
pub const DEFAULT_DOCUMENT_LABELS: [&str; 3] =
    ["Employee's Resume", "Job Offer", "Employee Contract"];

/// A file picked for a label, waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub label: String,
    pub file_name: String,
    pub data: Bytes,
}

/// Outcome of a batch upload. Failures do not stop the remaining files.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub uploaded: Vec<Document>,
    /// `(label, message)` per failed file.
    pub failed: Vec<(String, String)>,
}

fn timestamp_separators() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[:.]").expect("separator pattern is valid"))
}

/// Blob path of an upload: `{employee}/{label}-{timestamp}-{file name}`.
///
/// The timestamp is ISO-8601 with `:` and `.` replaced by `-`.
pub fn object_path(employee_id: i64, label: &str, file_name: &str, at: DateTime<Utc>) -> String {
    let stamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let stamp = timestamp_separators().replace_all(&stamp, "-");
    format!("{}/{}-{}-{}", employee_id, label, stamp, file_name)
}

impl TableStore<Document> {
    pub async fn fetch_by_employee(&mut self, employee_id: i64) {
        let query = Query::new()
            .filter(Filter::eq("employee_id", employee_id))
            .order(Order::desc("created_at"));
        self.fetch_where(query).await;
    }

    /// Default labels followed by the employee's custom labels.
    ///
    /// Custom labels are the rows that have no file attached. A failed lookup
    /// is logged and yields the defaults only.
    pub async fn custom_labels(&self, employee_id: i64) -> Vec<String> {
        let mut labels: Vec<String> =
            DEFAULT_DOCUMENT_LABELS.iter().map(|l| l.to_string()).collect();
        let query = Query::new()
            .filter(Filter::eq("employee_id", employee_id))
            .filter(Filter::is_null("document_url"));
        match self.select(&query).await {
            Ok(rows) => {
                for row in rows {
                    if !labels.contains(&row.document_type) {
                        labels.push(row.document_type);
                    }
                }
            }
            Err(e) => error!(employee_id, "Failed to fetch custom document labels: {}", e),
        }
        labels
    }

    /// Uploads one file, then records its metadata row with the public URL.
    pub async fn upload(
        &mut self,
        blobs: &dyn BlobStorage,
        employee_id: i64,
        file: &PendingUpload,
    ) -> PortResult<Document> {
        let _busy = self.begin();
        match self.store_file(blobs, employee_id, file).await {
            Ok(document) => {
                info!(employee_id, label = %file.label, "Document uploaded");
                self.remember(document.clone());
                Ok(document)
            }
            Err(e) => {
                error!(employee_id, label = %file.label, "Document upload failed: {}", e);
                self.error = Some(e.message());
                Err(e)
            }
        }
    }

    /// Uploads every pending file in order. A failure is reported and the
    /// remaining files are still sent.
    pub async fn upload_pending(
        &mut self,
        blobs: &dyn BlobStorage,
        employee_id: i64,
        files: Vec<PendingUpload>,
    ) -> UploadReport {
        let _busy = self.begin();
        let mut report = UploadReport::default();
        for file in files {
            match self.store_file(blobs, employee_id, &file).await {
                Ok(document) => {
                    info!(employee_id, label = %file.label, "Document uploaded");
                    self.remember(document.clone());
                    report.uploaded.push(document);
                }
                Err(e) => {
                    error!(employee_id, label = %file.label, "Document upload failed: {}", e);
                    self.error = Some(e.message());
                    report.failed.push((file.label, e.message()));
                }
            }
        }
        report
    }

    async fn store_file(
        &self,
        blobs: &dyn BlobStorage,
        employee_id: i64,
        file: &PendingUpload,
    ) -> PortResult<Document> {
        let path = object_path(employee_id, &file.label, &file.file_name, Utc::now());
        blobs.upload(DOCUMENT_BUCKET, &path, file.data.clone()).await?;
        let url = blobs.public_url(DOCUMENT_BUCKET, &path);

        let draft = NewDocument {
            employee_id,
            document_type: file.label.clone(),
            document_url: Some(url),
        };
        let row = self
            .gateway()
            .insert(Table::Documents, super::to_json(&draft)?)
            .await?;
        super::decode::<Document>(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryBlobStore, MemoryTableGateway};
    use crate::stores::DocumentStore;
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn object_path_flattens_the_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 4, 22, 10, 5, 9).unwrap();
        assert_eq!(
            object_path(7, "Job Offer", "offer.pdf", at),
            "7/Job Offer-2025-04-22T10-05-09-000Z-offer.pdf"
        );
    }

    #[tokio::test]
    async fn labels_append_custom_rows_without_files() {
        let gateway = Arc::new(MemoryTableGateway::new());
        let mut store = DocumentStore::new(gateway.clone());
        for (employee_id, label, url) in [
            (1, "Visa", None),
            (1, "Job Offer", Some("https://files/x")),
            (2, "Badge", None),
        ] {
            store
                .add(&NewDocument {
                    employee_id,
                    document_type: label.to_string(),
                    document_url: url.map(str::to_string),
                })
                .await;
        }

        let labels = store.custom_labels(1).await;
        assert_eq!(
            labels,
            vec!["Employee's Resume", "Job Offer", "Employee Contract", "Visa"]
        );
    }

    #[tokio::test]
    async fn upload_records_public_url_and_continues_after_failure() {
        let gateway = Arc::new(MemoryTableGateway::new());
        let blobs = MemoryBlobStore::new("https://files.example.com/");
        let mut store = DocumentStore::new(gateway.clone());

        let files = vec![
            PendingUpload {
                label: "Job Offer".to_string(),
                file_name: "offer.pdf".to_string(),
                data: Bytes::from_static(b"%PDF"),
            },
            PendingUpload {
                label: "Employee Contract".to_string(),
                file_name: "contract.pdf".to_string(),
                data: Bytes::from_static(b"%PDF"),
            },
        ];
        gateway.fail_next("insert rejected").await;
        let report = store.upload_pending(&blobs, 3, files).await;

        assert_eq!(
            report.failed,
            vec![("Job Offer".to_string(), "insert rejected".to_string())]
        );
        assert_eq!(report.uploaded.len(), 1);
        let url = report.uploaded[0].document_url.clone().unwrap_or_default();
        assert!(url.starts_with(
            "https://files.example.com/employee-documents/3/Employee Contract-"
        ));
        assert!(url.ends_with("-contract.pdf"));
        assert_eq!(store.items().len(), 1);
        assert!(!store.is_loading());

        store.fetch_by_employee(3).await;
        assert_eq!(store.items().len(), 1);
        store.fetch_by_employee(4).await;
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn single_upload_stores_the_blob_and_reports_failures() {
        let gateway = Arc::new(MemoryTableGateway::new());
        let blobs = MemoryBlobStore::new("https://files.example.com");
        let mut store = DocumentStore::new(gateway.clone());
        let file = PendingUpload {
            label: "Employee's Resume".to_string(),
            file_name: "cv.pdf".to_string(),
            data: Bytes::from_static(b"%PDF"),
        };

        let document = store.upload(&blobs, 5, &file).await.unwrap();
        assert_eq!(document.employee_id, 5);
        assert_eq!(document.document_type, "Employee's Resume");
        assert_eq!(store.items(), &[document.clone()]);
        let url = document.document_url.unwrap_or_default();
        let path = url
            .strip_prefix("https://files.example.com/employee-documents/")
            .unwrap_or_default();
        assert_eq!(
            blobs.object(DOCUMENT_BUCKET, path).await,
            Some(Bytes::from_static(b"%PDF"))
        );

        let second = PendingUpload {
            file_name: "cv-2.pdf".to_string(),
            ..file
        };
        gateway.fail_next("insert rejected").await;
        assert!(store.upload(&blobs, 5, &second).await.is_err());
        assert_eq!(store.error(), Some("insert rejected"));
        assert_eq!(store.items().len(), 1);
        assert!(!store.is_loading());
    }
}
