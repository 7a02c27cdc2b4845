//! Excusal request register.

use std::sync::Arc;

use tracing::debug;

use crate::error::{AttendanceError, Result};
use crate::models::{ExcusalRequest, ExcusalStatus};
use crate::store::{Table, TableId, TableStore};

#[derive(Clone)]
pub struct ExcusalRegister {
    store: Arc<dyn TableStore>,
}

impl ExcusalRegister {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Result<Vec<ExcusalRequest>> {
        self.store.read_table(TableId::Excusals)?.decode()
    }

    pub fn create(&self, request: &ExcusalRequest) -> Result<()> {
        self.store
            .append_rows(TableId::Excusals, &Table::encode([request]))?;
        debug!(request_id = %request.request_id, "Recorded excusal request");
        Ok(())
    }

    pub fn get(&self, request_id: &str) -> Result<ExcusalRequest> {
        self.all()?
            .into_iter()
            .find(|r| r.request_id.eq_ignore_ascii_case(request_id.trim()))
            .ok_or_else(|| AttendanceError::ExcusalNotFound(request_id.to_string()))
    }

    pub fn list_pending(&self) -> Result<Vec<ExcusalRequest>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| r.status == ExcusalStatus::Pending)
            .collect())
    }

    /// Replace the stored row for `request.request_id`.
    pub fn update(&self, request: &ExcusalRequest) -> Result<()> {
        let mut requests = self.all()?;
        let slot = requests
            .iter_mut()
            .find(|r| r.request_id == request.request_id)
            .ok_or_else(|| AttendanceError::ExcusalNotFound(request.request_id.clone()))?;
        *slot = request.clone();
        self.store
            .write_table(TableId::Excusals, &Table::encode(&requests))?;
        debug!(request_id = %request.request_id, status = %request.status, "Updated excusal request");
        Ok(())
    }
}
