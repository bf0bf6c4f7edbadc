//! Vitals store port: Trait for the per-patient vitals table.
//!
//! This trait abstracts the flat-file backend from the application logic.

use crate::domain::{SortOrder, VitalRecord};
use crate::Result;

/// Trait for reading and appending vital-sign records.
pub trait VitalsStore: Send + Sync {
    /// Load every valid record in the requested order.
    ///
    /// Rows with unparseable timestamps are skipped.
    ///
    /// # Errors
    /// Returns `MissingData` if the backing table does not exist.
    fn load(&self, order: SortOrder) -> Result<Vec<VitalRecord>>;

    /// Append one record.
    ///
    /// # Errors
    /// Returns error if the table cannot be written.
    fn append(&self, record: &VitalRecord) -> Result<()>;

    /// Sorted unique patient ids.
    ///
    /// # Errors
    /// Returns error if the table cannot be loaded.
    fn patient_ids(&self) -> Result<Vec<i64>> {
        let mut ids: Vec<i64> = self
            .load(SortOrder::Ascending)?
            .into_iter()
            .map(|r| r.patient_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Most recent record for a patient.
    ///
    /// # Errors
    /// Returns error if the table cannot be loaded.
    fn latest_for(&self, patient_id: i64) -> Result<Option<VitalRecord>> {
        Ok(self
            .load(SortOrder::Descending)?
            .into_iter()
            .find(|r| r.patient_id == patient_id))
    }

    /// A patient's records, oldest first.
    ///
    /// # Errors
    /// Returns error if the table cannot be loaded.
    fn history_for(&self, patient_id: i64) -> Result<Vec<VitalRecord>> {
        Ok(self
            .load(SortOrder::Ascending)?
            .into_iter()
            .filter(|r| r.patient_id == patient_id)
            .collect())
    }
}
