//! # Storage Boxes
//!
//! A box is referenced from the UI by free-text name and resolved against a
//! locally cached listing. Resolution is a best-effort client-side upsert:
//!
//! - empty name: unassign the box and save immediately
//! - exact, case-sensitive match in the cache: save with that box's id
//! - no match: create the box, remember it for next time, then save
//!
//! Creating a box makes every other box listing on the page stale, so a
//! [`Signal::BoxListChanged`] is emitted for siblings to refetch. True name
//! uniqueness is the server's problem; a duplicate rejection surfaces here
//! as an ordinary failed save.

use serde_json::json;
use tracing::info;

use crate::{
    api::Api,
    error::ClientError,
    models::StorageBox,
    sync::{Coercion, EntityRef, FieldBinding, Signal, SyncOutcome, save_field, update_entity},
};

/// Locally cached box listing, usually fetched once per rendered view.
#[derive(Debug, Default)]
pub struct BoxDirectory {
    boxes: Vec<StorageBox>,
}

/// Outcome of matching a typed name against the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxResolution {
    /// Empty input: clear the entity's box reference.
    Unassign,
    /// Exact match; carries the matched box id.
    Existing(String),
    /// No match; the box has to be created first.
    Missing,
}

impl BoxDirectory {
    pub fn new(boxes: Vec<StorageBox>) -> Self {
        Self { boxes }
    }

    pub async fn fetch(api: &Api) -> Result<Self, ClientError> {
        Ok(Self::new(api.get_boxes().await?))
    }

    pub fn boxes(&self) -> &[StorageBox] {
        &self.boxes
    }

    pub fn push(&mut self, storage_box: StorageBox) {
        self.boxes.push(storage_box);
    }

    pub fn remove(&mut self, id: &str) {
        self.boxes.retain(|b| b.id != id);
    }

    /// Case-sensitive exact match; the name is trimmed first.
    pub fn resolve(&self, name: &str) -> BoxResolution {
        let name = name.trim();
        if name.is_empty() {
            return BoxResolution::Unassign;
        }

        match self.boxes.iter().find(|b| b.name == name) {
            Some(found) => BoxResolution::Existing(found.id.clone()),
            None => BoxResolution::Missing,
        }
    }
}

/// Resolve a name to a box id, creating the box when nothing matches.
/// Returns the id (None for unassign) and whether a box was created.
pub async fn resolve_or_create(
    api: &Api,
    directory: &mut BoxDirectory,
    name: &str,
) -> Result<(Option<String>, bool), ClientError> {
    match directory.resolve(name) {
        BoxResolution::Unassign => Ok((None, false)),
        BoxResolution::Existing(id) => Ok((Some(id), false)),
        BoxResolution::Missing => {
            let created = api.create_box(name.trim()).await?;
            info!("Created box {} ({})", created.name, created.id);

            let id = created.id.clone();
            directory.push(created);
            Ok((Some(id), true))
        }
    }
}

/// Point a stamp or instance at the box named by the user, upserting the
/// box if needed.
pub async fn assign_box(
    api: &Api,
    directory: &mut BoxDirectory,
    entity: &EntityRef,
    raw_name: &str,
    signals: &mut Vec<Signal>,
) -> Result<SyncOutcome, ClientError> {
    let (box_id, created) = resolve_or_create(api, directory, raw_name).await?;

    let outcome = update_entity(api, entity, &json!({ "box_id": box_id })).await?;
    if created {
        signals.push(Signal::BoxListChanged);
    }

    Ok(outcome)
}

/// Create a box by name from the settings page.
pub async fn create_box(
    api: &Api,
    directory: &mut BoxDirectory,
    name: &str,
    signals: &mut Vec<Signal>,
) -> Result<StorageBox, ClientError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::Validation(
            "Please enter a box name.".to_string(),
        ));
    }

    let created = api.create_box(name).await?;
    directory.push(created.clone());
    signals.push(Signal::BoxListChanged);

    Ok(created)
}

/// Rename a box from its inline name field. Goes through the same field
/// synchronizer as stamp and instance edits.
pub async fn rename_box(
    api: &Api,
    directory: &mut BoxDirectory,
    id: &str,
    new_name: &str,
    signals: &mut Vec<Signal>,
) -> Result<StorageBox, ClientError> {
    if new_name.trim().is_empty() {
        return Err(ClientError::Validation(
            "Box name cannot be empty.".to_string(),
        ));
    }

    let binding = FieldBinding {
        entity: EntityRef::Box(id.to_string()),
        field: "name".to_string(),
        coercion: Coercion::Text,
    };

    let SyncOutcome::Saved(value) = save_field(api, &binding, new_name).await? else {
        return Err(ClientError::Validation("Box no longer exists.".to_string()));
    };

    let updated: StorageBox = serde_json::from_value(value)?;
    if let Some(cached) = directory.boxes.iter_mut().find(|b| b.id == id) {
        cached.name = updated.name.clone();
    }
    signals.push(Signal::BoxListChanged);

    Ok(updated)
}

pub async fn delete_box(
    api: &Api,
    directory: &mut BoxDirectory,
    id: &str,
    signals: &mut Vec<Signal>,
) -> Result<(), ClientError> {
    api.delete_box(id).await?;
    directory.remove(id);
    signals.push(Signal::BoxListChanged);

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{BoxDirectory, BoxResolution};
    use crate::models::StorageBox;

    fn directory() -> BoxDirectory {
        BoxDirectory::new(vec![
            StorageBox {
                id: "b1".to_string(),
                name: "Red Album".to_string(),
                date_created: Utc::now(),
                stamp_count: 3,
            },
            StorageBox {
                id: "b2".to_string(),
                name: "Shoebox".to_string(),
                date_created: Utc::now(),
                stamp_count: 0,
            },
        ])
    }

    #[test]
    fn test_empty_name_unassigns() {
        assert_eq!(directory().resolve(""), BoxResolution::Unassign);
        assert_eq!(directory().resolve("   "), BoxResolution::Unassign);
    }

    #[test]
    fn test_exact_match_uses_existing_id() {
        assert_eq!(
            directory().resolve("Shoebox"),
            BoxResolution::Existing("b2".to_string())
        );
        assert_eq!(
            directory().resolve("  Red Album  "),
            BoxResolution::Existing("b1".to_string())
        );
    }

    #[test]
    fn test_match_is_case_sensitive() {
        assert_eq!(directory().resolve("shoebox"), BoxResolution::Missing);
        assert_eq!(directory().resolve("SHOEBOX"), BoxResolution::Missing);
    }

    #[test]
    fn test_unknown_name_is_missing() {
        assert_eq!(directory().resolve("Blue Album"), BoxResolution::Missing);
    }
}
