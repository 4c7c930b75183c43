use std::path::Path;

use chrono::Local;
use uuid::Uuid;

use crate::aggregate::group_by_student;
use crate::error::AttendanceError;
use crate::import::{self, ImportMode, ImportSummary};
use crate::models::{Record, StudentGroup};
use crate::report;
use crate::store::{Backend, Store};
use crate::validate::{validate_form, RawForm};

pub struct Attendance<B> {
    store: Store<B>,
}

impl<B: Backend> Attendance<B> {
    pub fn new(backend: B) -> Self {
        Self {
            store: Store::new(backend),
        }
    }

    /// Validates the form and stores the new record. Invalid input never
    /// touches storage.
    pub async fn submit_form(&self, raw: &RawForm) -> Result<Record, AttendanceError> {
        let input = validate_form(raw)?;
        let record = Record::create(input);
        self.store.append(record.clone()).await?;
        log::info!(
            "Recorded {} for {}: {}%",
            record.period_label(),
            record.student_name,
            record.frequency
        );
        Ok(record)
    }

    pub async fn request_history(&self) -> Vec<StudentGroup> {
        group_by_student(&self.store.get_all().await)
    }

    pub async fn render_history(&self) -> Result<String, AttendanceError> {
        report::render_history(&self.request_history().await)
    }

    pub async fn delete_record(&self, id: Uuid) -> Result<bool, AttendanceError> {
        Ok(self.store.delete_by_id(id).await?)
    }

    pub async fn clear_all(&self) -> Result<(), AttendanceError> {
        Ok(self.store.clear().await?)
    }

    pub async fn export_csv(&self) -> Result<String, AttendanceError> {
        report::render_csv(&self.store.get_all().await)
    }

    pub async fn export_printable(&self) -> Result<String, AttendanceError> {
        let groups = self.request_history().await;
        report::render_printable(&groups, Local::now().date_naive())
    }

    /// Imports every valid line and stores them in one write, after the
    /// existing records or in place of them. Invalid lines only increase the
    /// error count, and a file without valid lines leaves storage untouched.
    pub async fn import_csv(
        &self,
        text: &str,
        mode: ImportMode,
    ) -> Result<ImportSummary, AttendanceError> {
        let batch = import::parse_batch(text);
        let errors = batch.rejected.len();
        let imported = match (batch.records.is_empty(), mode) {
            (true, _) => 0,
            (false, ImportMode::Append) => self.store.append_all(batch.records).await?,
            (false, ImportMode::Replace) => {
                self.store.replace_all(&batch.records).await?;
                batch.records.len()
            }
        };
        log::info!("Imported {imported} records, {errors} lines rejected");
        Ok(ImportSummary { imported, errors })
    }

    pub async fn import_file(
        &self,
        path: &Path,
        mode: ImportMode,
    ) -> Result<ImportSummary, AttendanceError> {
        let text = import::read_source(path).await?;
        self.import_csv(&text, mode).await
    }
}
