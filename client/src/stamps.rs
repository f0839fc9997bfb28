//! # Stamp Detail and Creation
//!
//! `StampDetail` is the per-view state behind a rendered detail page:
//! inline field saves, tag edits, image handling, box assignment. The
//! server's response replaces the local stamp after every successful save.
//!
//! `NewStampForm` is the session for the new-stamp form. Field edits
//! accumulate locally and nothing touches the server until `create`, which
//! refuses to submit without a name. The session lives exactly as long as
//! the form view.

use serde_json::json;
use tracing::info;

use crate::{
    api::Api,
    boxes::{self, BoxDirectory},
    error::ClientError,
    models::{NewStamp, Stamp},
    sync::{Coercion, EntityRef, Feedback, FieldBinding, Signal, SyncOutcome, save_field},
    upload,
};

pub const NAME_PLACEHOLDER: &str = "New Stamp";
pub const SCOTT_PLACEHOLDER: &str = "Click to add Scott number";

pub struct StampDetail {
    pub stamp: Stamp,
    pub boxes: BoxDirectory,
    signals: Vec<Signal>,
}

impl StampDetail {
    pub fn new(stamp: Stamp, boxes: BoxDirectory) -> Self {
        Self {
            stamp,
            boxes,
            signals: Vec::new(),
        }
    }

    pub fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    /// Label next to the ownership checkbox.
    pub fn owned_label(&self) -> &'static str {
        if self.stamp.is_owned { "Owned" } else { "Needed" }
    }

    /// Save one inline-edited field through the field synchronizer.
    pub async fn save_field(
        &mut self,
        api: &Api,
        field: &str,
        coercion: Coercion,
        raw: &str,
    ) -> Result<(), ClientError> {
        let binding = FieldBinding {
            entity: EntityRef::Stamp(self.stamp.id.clone()),
            field: field.to_string(),
            coercion,
        };

        if let SyncOutcome::Saved(value) = save_field(api, &binding, raw).await? {
            self.apply_saved(value);
        }

        Ok(())
    }

    /// Point this stamp at the box named by the user, upserting the box
    /// when the name is new.
    pub async fn assign_box(&mut self, api: &Api, raw_name: &str) -> Result<(), ClientError> {
        let entity = EntityRef::Stamp(self.stamp.id.clone());
        let outcome =
            boxes::assign_box(api, &mut self.boxes, &entity, raw_name, &mut self.signals).await?;

        if let SyncOutcome::Saved(value) = outcome {
            self.apply_saved(value);
        }

        Ok(())
    }

    /// Add a tag. The whole tag set is replaced on the server; there is no
    /// per-tag endpoint. Blank input is a no-op, reported as `false`.
    pub async fn add_tag(&mut self, api: &Api, raw: &str) -> Result<bool, ClientError> {
        let tag = raw.trim();
        if tag.is_empty() {
            return Ok(false);
        }

        let mut tags = self.stamp.tags.clone();
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }

        self.replace_tags(api, tags).await?;
        self.signals.push(Signal::Navigate(format!(
            "/views/stamps/detail/{}",
            self.stamp.id
        )));

        Ok(true)
    }

    pub async fn remove_tag(&mut self, api: &Api, tag: &str) -> Result<(), ClientError> {
        let tags: Vec<String> = self
            .stamp
            .tags
            .iter()
            .filter(|existing| existing.as_str() != tag)
            .cloned()
            .collect();

        self.replace_tags(api, tags).await
    }

    async fn replace_tags(&mut self, api: &Api, tags: Vec<String>) -> Result<(), ClientError> {
        let updated = api
            .update_stamp(&self.stamp.id, &json!({ "tags": tags }))
            .await?;

        self.stamp = updated;
        Ok(())
    }

    /// Validate and upload a replacement image, then adopt the URL the
    /// server stored it under.
    pub async fn upload_image<F>(
        &mut self,
        api: &Api,
        filename: String,
        mime: &str,
        bytes: Vec<u8>,
        progress: F,
    ) -> Result<String, ClientError>
    where
        F: Fn(u64, u64) + Send + 'static,
    {
        upload::validate_image(mime, bytes.len() as u64)?;

        let image_url = api
            .upload_stamp_image(&self.stamp.id, filename, mime, bytes, progress)
            .await?;

        self.stamp.image_url = Some(image_url.clone());
        Ok(image_url)
    }

    /// Clear the stamp's image. The record keeps existing; only the image
    /// reference is dropped.
    pub async fn remove_image(&mut self, api: &Api) -> Result<(), ClientError> {
        let updated = api
            .update_stamp(&self.stamp.id, &json!({ "image_url": "" }))
            .await?;

        self.stamp = updated;
        Ok(())
    }

    /// Delete the stamp and send the container back to the gallery.
    pub async fn delete(&mut self, api: &Api) -> Result<(), ClientError> {
        api.delete_stamp(&self.stamp.id).await?;
        info!("Deleted stamp {}", self.stamp.id);

        self.signals
            .push(Signal::Navigate("/views/stamps/gallery".to_string()));
        Ok(())
    }

    fn apply_saved(&mut self, value: serde_json::Value) {
        if let Ok(stamp) = serde_json::from_value::<Stamp>(value) {
            self.stamp = stamp;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    ScottNumber,
    IssueDate,
    Series,
}

/// Session state for the new-stamp form, scoped to the view's lifetime.
#[derive(Debug, Default)]
pub struct NewStampForm {
    name: String,
    scott_number: String,
    issue_date: String,
    series: String,
    tags: Vec<String>,
    /// True while the create request is in flight; the submit control is
    /// disabled.
    pub creating: bool,
    /// True when submission was blocked on the empty name field; the view
    /// should focus and highlight it.
    pub name_required: bool,
}

impl NewStampForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field edit locally. Placeholder text counts as empty.
    pub fn set_field(&mut self, field: FormField, raw: &str) -> Feedback {
        let value = raw.trim();

        match field {
            FormField::Name => {
                self.name = if value == NAME_PLACEHOLDER {
                    String::new()
                } else {
                    value.to_string()
                };
                if !self.name.is_empty() {
                    self.name_required = false;
                }
            }
            FormField::ScottNumber => {
                self.scott_number = if value == SCOTT_PLACEHOLDER {
                    String::new()
                } else {
                    value.to_string()
                };
            }
            FormField::IssueDate => self.issue_date = value.to_string(),
            FormField::Series => self.series = value.to_string(),
        }

        Feedback::Saved
    }

    /// Add a tag, suppressing blanks and duplicates.
    pub fn add_tag(&mut self, raw: &str) -> bool {
        let tag = raw.trim();
        if tag.is_empty() || self.tags.iter().any(|existing| existing == tag) {
            return false;
        }

        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|existing| existing != tag);
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    fn payload(&mut self) -> Result<NewStamp, ClientError> {
        if self.name.is_empty() {
            self.name_required = true;
            return Err(ClientError::Validation(
                "Please enter a stamp name before creating the stamp.".to_string(),
            ));
        }

        Ok(NewStamp {
            name: self.name.clone(),
            scott_number: some_if_filled(&self.scott_number),
            issue_date: some_if_filled(&self.issue_date),
            series: some_if_filled(&self.series),
            tags: self.tags.clone(),
        })
    }

    /// Submit the form. A missing name blocks the request entirely; a
    /// failed request re-enables the submit control for another try.
    pub async fn create(&mut self, api: &Api) -> Result<Stamp, ClientError> {
        let payload = self.payload()?;

        self.creating = true;
        let result = api.create_stamp(&payload).await;
        match result {
            Ok(stamp) => {
                info!("Created stamp {} ({})", stamp.name, stamp.id);
                Ok(stamp)
            }
            Err(e) => {
                self.creating = false;
                Err(e)
            }
        }
    }
}

fn some_if_filled(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::{FormField, NAME_PLACEHOLDER, NewStampForm};
    use crate::error::ClientError;

    #[test]
    fn test_empty_name_blocks_submission() {
        let mut form = NewStampForm::new();
        form.set_field(FormField::Series, "Famous Americans");

        let err = form.payload().unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(form.name_required);
    }

    #[test]
    fn test_placeholder_name_counts_as_empty() {
        let mut form = NewStampForm::new();
        form.set_field(FormField::Name, NAME_PLACEHOLDER);

        assert!(form.payload().is_err());
    }

    #[test]
    fn test_filled_form_serializes_empties_as_none() {
        let mut form = NewStampForm::new();
        form.set_field(FormField::Name, "  Inverted Jenny ");

        let payload = form.payload().unwrap();
        assert_eq!(payload.name, "Inverted Jenny");
        assert_eq!(payload.scott_number, None);
        assert_eq!(payload.issue_date, None);
        assert_eq!(payload.series, None);
        assert!(payload.tags.is_empty());
    }

    #[test]
    fn test_tags_deduplicate() {
        let mut form = NewStampForm::new();

        assert!(form.add_tag("airmail"));
        assert!(!form.add_tag("  airmail "));
        assert!(!form.add_tag("   "));
        assert_eq!(form.tags(), ["airmail"]);

        form.remove_tag("airmail");
        assert!(form.tags().is_empty());
    }

    #[test]
    fn test_setting_name_clears_required_flag() {
        let mut form = NewStampForm::new();
        assert!(form.payload().is_err());
        assert!(form.name_required);

        form.set_field(FormField::Name, "Liberty Bell");
        assert!(!form.name_required);
        assert!(form.payload().is_ok());
    }
}
