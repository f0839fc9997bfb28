//! # Copies Table
//!
//! View model for the "your copies" table on a stamp detail page: the
//! persisted instance rows plus at most one unsaved draft row. Rows are
//! re-rendered from this state; the table never edits markup directly.
//!
//! Draft lifecycle: absent -> draft -> absent. Asking for a second draft
//! while one exists flashes the existing row instead of adding another.
//! A successful save replaces the draft with a persisted row; a failed
//! save keeps the draft with its save control re-enabled. When the last
//! persisted row disappears a fresh draft is created automatically, so
//! the table is never shown empty with nothing to act on.

use crate::{
    api::Api,
    boxes::{self, BoxDirectory},
    error::ClientError,
    models::{NewInstance, StampInstance},
    sync::{Coercion, EntityRef, FieldBinding, Signal, SyncOutcome, save_field},
};

/// A persisted instance as the table shows it.
#[derive(Debug, Clone)]
pub struct InstanceRow {
    pub id: String,
    pub condition: Option<String>,
    pub box_id: Option<String>,
    pub box_name: String,
    pub quantity: i64,
}

impl From<StampInstance> for InstanceRow {
    fn from(instance: StampInstance) -> Self {
        Self {
            id: instance.id,
            condition: instance.condition,
            box_id: instance.box_id,
            box_name: instance.box_name.unwrap_or_default(),
            quantity: instance.quantity,
        }
    }
}

/// The one allowed unsaved row.
#[derive(Debug, Clone, Default)]
pub struct DraftRow {
    pub condition: String,
    pub box_name: String,
    pub quantity: i64,
    /// True while a save is in flight; the save control is disabled.
    pub saving: bool,
}

impl DraftRow {
    fn is_empty(&self) -> bool {
        self.condition.is_empty() && self.box_name.is_empty() && self.quantity == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftAdd {
    Added,
    /// A draft already existed; it was flashed and nothing was added.
    FlashedExisting,
}

/// What happened to the row a field save targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSave {
    Saved,
    /// The server deleted the instance (204) and the row is gone.
    RowRemoved,
    /// The row was not in the table; nothing was sent.
    Ignored,
}

pub struct CopiesTable {
    stamp_id: String,
    rows: Vec<InstanceRow>,
    draft: Option<DraftRow>,
    signals: Vec<Signal>,
}

impl CopiesTable {
    pub fn new(stamp_id: String, instances: Vec<StampInstance>) -> Self {
        Self {
            stamp_id,
            rows: instances.into_iter().map(InstanceRow::from).collect(),
            draft: None,
            signals: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[InstanceRow] {
        &self.rows
    }

    pub fn draft(&self) -> Option<&DraftRow> {
        self.draft.as_ref()
    }

    pub fn group_count(&self) -> usize {
        self.rows.len()
    }

    pub fn total_copies(&self) -> i64 {
        self.rows.iter().map(|row| row.quantity).sum()
    }

    /// Signals accumulated since the last drain, in emission order.
    pub fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    pub fn add_draft(&mut self) -> DraftAdd {
        if self.draft.is_some() {
            return DraftAdd::FlashedExisting;
        }

        self.draft = Some(DraftRow::default());
        DraftAdd::Added
    }

    pub fn edit_draft(&mut self, edit: impl FnOnce(&mut DraftRow)) {
        if let Some(draft) = self.draft.as_mut() {
            edit(draft);
        }
    }

    /// Persist the draft row. The box name goes through the usual
    /// resolve-or-create path first. On failure the draft stays, with its
    /// save control re-enabled for another try.
    pub async fn save_draft(
        &mut self,
        api: &Api,
        directory: &mut BoxDirectory,
    ) -> Result<(), ClientError> {
        let Some(draft) = self.draft.clone() else {
            return Err(ClientError::Validation("No unsaved copy row.".to_string()));
        };

        if draft.is_empty() {
            return Err(ClientError::Validation(
                "Please choose a condition, box, and set the quantity.".to_string(),
            ));
        }

        if let Some(active) = self.draft.as_mut() {
            active.saving = true;
        }

        let result = self.create_from_draft(api, directory, &draft).await;

        match result {
            Ok(saved) => {
                self.rows.push(InstanceRow::from(saved));
                self.draft = None;
                self.signals.push(Signal::BoxListChanged);
                Ok(())
            }
            Err(e) => {
                if let Some(active) = self.draft.as_mut() {
                    active.saving = false;
                }
                Err(e)
            }
        }
    }

    async fn create_from_draft(
        &mut self,
        api: &Api,
        directory: &mut BoxDirectory,
        draft: &DraftRow,
    ) -> Result<StampInstance, ClientError> {
        let (box_id, created) =
            boxes::resolve_or_create(api, directory, &draft.box_name).await?;
        if created {
            self.signals.push(Signal::BoxListChanged);
        }

        let payload = NewInstance {
            condition: (!draft.condition.is_empty()).then(|| draft.condition.clone()),
            box_id,
            quantity: draft.quantity,
        };

        api.create_instance(&self.stamp_id, &payload).await
    }

    /// Save one field of a persisted row through the field synchronizer.
    pub async fn save_row_field(
        &mut self,
        api: &Api,
        instance_id: &str,
        field: &str,
        coercion: Coercion,
        raw: &str,
    ) -> Result<RowSave, ClientError> {
        if !self.rows.iter().any(|row| row.id == instance_id) {
            return Ok(RowSave::Ignored);
        }

        let binding = FieldBinding {
            entity: EntityRef::Instance(instance_id.to_string()),
            field: field.to_string(),
            coercion,
        };

        match save_field(api, &binding, raw).await? {
            SyncOutcome::Saved(value) => {
                self.apply_saved(instance_id, value);
                self.signals.push(Signal::BoxListChanged);
                Ok(RowSave::Saved)
            }
            SyncOutcome::EntityDeleted => {
                self.remove_row(instance_id);
                Ok(RowSave::RowRemoved)
            }
        }
    }

    /// Bump a row's quantity by `delta`, clamped at zero, and save it.
    /// Driving quantity to zero deletes the instance server-side.
    pub async fn adjust_quantity(
        &mut self,
        api: &Api,
        instance_id: &str,
        delta: i64,
    ) -> Result<RowSave, ClientError> {
        let Some(row) = self.rows.iter_mut().find(|row| row.id == instance_id) else {
            return Ok(RowSave::Ignored);
        };

        let new_quantity = clamped(row.quantity, delta);
        row.quantity = new_quantity;

        self.save_row_field(
            api,
            instance_id,
            "quantity",
            Coercion::Integer,
            &new_quantity.to_string(),
        )
        .await
    }

    /// Assign the box named by the user to a persisted row.
    pub async fn assign_box(
        &mut self,
        api: &Api,
        directory: &mut BoxDirectory,
        instance_id: &str,
        raw_name: &str,
    ) -> Result<RowSave, ClientError> {
        if !self.rows.iter().any(|row| row.id == instance_id) {
            return Ok(RowSave::Ignored);
        }

        let entity = EntityRef::Instance(instance_id.to_string());
        let outcome =
            boxes::assign_box(api, directory, &entity, raw_name, &mut self.signals).await?;

        match outcome {
            SyncOutcome::Saved(value) => {
                self.apply_saved(instance_id, value);
                self.signals.push(Signal::BoxListChanged);
                Ok(RowSave::Saved)
            }
            SyncOutcome::EntityDeleted => {
                self.remove_row(instance_id);
                Ok(RowSave::RowRemoved)
            }
        }
    }

    pub async fn delete_row(&mut self, api: &Api, instance_id: &str) -> Result<(), ClientError> {
        api.delete_instance(instance_id).await?;
        self.remove_row(instance_id);
        Ok(())
    }

    /// Drop a row from local state, auto-creating a draft when the table
    /// would otherwise be empty.
    pub fn remove_row(&mut self, instance_id: &str) {
        self.rows.retain(|row| row.id != instance_id);

        if self.rows.is_empty() && self.draft.is_none() {
            self.draft = Some(DraftRow::default());
        }

        self.signals.push(Signal::BoxListChanged);
    }

    fn apply_saved(&mut self, instance_id: &str, value: serde_json::Value) {
        let Ok(instance) = serde_json::from_value::<StampInstance>(value) else {
            return;
        };

        if let Some(row) = self.rows.iter_mut().find(|row| row.id == instance_id) {
            *row = InstanceRow::from(instance);
        }
    }
}

fn clamped(current: i64, delta: i64) -> i64 {
    (current + delta).max(0)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{CopiesTable, DraftAdd, clamped};
    use crate::models::StampInstance;

    fn instance(id: &str, quantity: i64) -> StampInstance {
        StampInstance {
            id: id.to_string(),
            stamp_id: "s1".to_string(),
            condition: Some("Used".to_string()),
            box_id: None,
            box_name: None,
            quantity,
            date_added: Utc::now(),
            date_modified: Utc::now(),
        }
    }

    #[test]
    fn test_clamp_never_negative() {
        assert_eq!(clamped(3, -1), 2);
        assert_eq!(clamped(0, -1), 0);
        assert_eq!(clamped(1, -5), 0);
        assert_eq!(clamped(0, 1), 1);
    }

    #[test]
    fn test_second_draft_flashes_existing() {
        let mut table = CopiesTable::new("s1".to_string(), vec![instance("i1", 2)]);

        assert_eq!(table.add_draft(), DraftAdd::Added);
        assert_eq!(table.add_draft(), DraftAdd::FlashedExisting);
        assert!(table.draft().is_some());
        assert_eq!(table.group_count(), 1);
    }

    #[test]
    fn test_last_row_removal_creates_draft() {
        let mut table = CopiesTable::new("s1".to_string(), vec![instance("i1", 2)]);

        table.remove_row("i1");

        assert_eq!(table.group_count(), 0);
        assert!(table.draft().is_some());
    }

    #[test]
    fn test_removal_with_rows_left_adds_no_draft() {
        let mut table =
            CopiesTable::new("s1".to_string(), vec![instance("i1", 2), instance("i2", 1)]);

        table.remove_row("i1");

        assert_eq!(table.group_count(), 1);
        assert!(table.draft().is_none());
    }

    #[test]
    fn test_counts() {
        let mut table =
            CopiesTable::new("s1".to_string(), vec![instance("i1", 2), instance("i2", 3)]);

        assert_eq!(table.group_count(), 2);
        assert_eq!(table.total_copies(), 5);

        table.remove_row("i2");
        assert_eq!(table.total_copies(), 2);
    }
}
