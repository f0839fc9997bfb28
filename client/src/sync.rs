//! # Inline Field Sync
//!
//! One parameterized save path for every inline-editable field, whether it
//! belongs to a stamp, an instance, or a box. A rendered field carries an
//! entity reference, a field name, and a coercion; saving reads the raw UI
//! value, coerces it, and sends a one-field partial update to the owning
//! entity's endpoint.
//!
//! ## Coercion
//! - checkbox state becomes a boolean
//! - numeric inputs become integers, with unparsable text falling back to 0
//! - everything else becomes a trimmed string
//!
//! ## Feedback
//! The caller flashes a saved or failed acknowledgment on the field and
//! reverts it after a fixed interval: one second for success, two for
//! failure. A failed save leaves the user's edit in the field; nothing is
//! rolled back and nothing is retried.
//!
//! ## Races
//! There is no per-field mutual exclusion. Two overlapping saves of the
//! same field both go out, and the later response to arrive is the one the
//! view keeps.

use std::time::Duration;

use serde_json::{Map, Value, json};
use tracing::info;

use crate::{
    api::{Api, InstanceUpdate},
    error::ClientError,
};

pub const SAVED_REVERT: Duration = Duration::from_secs(1);
pub const FAILED_REVERT: Duration = Duration::from_secs(2);

/// How a raw UI value is turned into a wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Text,
    Integer,
    Checkbox,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Flag(bool),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => json!(s),
            FieldValue::Integer(n) => json!(n),
            FieldValue::Flag(b) => json!(b),
        }
    }

    /// The value as a field would display it. Re-coercing this string
    /// yields the same value back.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Flag(b) => b.to_string(),
        }
    }
}

pub fn coerce(raw: &str, coercion: Coercion) -> FieldValue {
    let trimmed = raw.trim();

    match coercion {
        Coercion::Text => FieldValue::Text(trimmed.to_string()),
        Coercion::Integer => FieldValue::Integer(trimmed.parse().unwrap_or(0)),
        Coercion::Checkbox => FieldValue::Flag(matches!(trimmed, "true" | "on" | "1")),
    }
}

/// A remote record addressable by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Stamp(String),
    Instance(String),
    Box(String),
}

/// Ties a rendered field to one attribute of one entity. Created when a
/// detail view is rendered, dropped with the view.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub entity: EntityRef,
    pub field: String,
    pub coercion: Coercion,
}

pub enum SyncOutcome {
    /// The field was persisted; the payload is the full updated entity.
    Saved(Value),
    /// The update caused the server to delete the entity entirely.
    EntityDeleted,
}

/// Coerce a raw UI value and send it as a one-field partial update.
pub async fn save_field(
    api: &Api,
    binding: &FieldBinding,
    raw: &str,
) -> Result<SyncOutcome, ClientError> {
    let value = coerce(raw, binding.coercion);
    info!("Saving field {} for {:?}", binding.field, binding.entity);

    let mut updates = Map::new();
    updates.insert(binding.field.clone(), value.to_json());

    update_entity(api, &binding.entity, &Value::Object(updates)).await
}

/// Route a partial update to the endpoint owning the entity.
pub(crate) async fn update_entity(
    api: &Api,
    entity: &EntityRef,
    updates: &Value,
) -> Result<SyncOutcome, ClientError> {
    match entity {
        EntityRef::Stamp(id) => {
            let stamp = api.update_stamp(id, updates).await?;
            Ok(SyncOutcome::Saved(serde_json::to_value(stamp)?))
        }
        EntityRef::Instance(id) => match api.update_instance(id, updates).await? {
            InstanceUpdate::Updated(instance) => {
                Ok(SyncOutcome::Saved(serde_json::to_value(instance)?))
            }
            InstanceUpdate::Deleted => Ok(SyncOutcome::EntityDeleted),
        },
        EntityRef::Box(id) => {
            let name = updates
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ClientError::Validation("Box name cannot be empty.".to_string()))?;

            let updated = api.update_box(id, name).await?;
            Ok(SyncOutcome::Saved(serde_json::to_value(updated)?))
        }
    }
}

/// Visual acknowledgment applied to a field after a save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Saved,
    Failed,
}

impl Feedback {
    pub fn of<T>(result: &Result<T, ClientError>) -> Self {
        match result {
            Ok(_) => Feedback::Saved,
            Err(_) => Feedback::Failed,
        }
    }

    /// How long the acknowledgment stays on the field before reverting.
    pub fn revert_after(self) -> Duration {
        match self {
            Feedback::Saved => SAVED_REVERT,
            Feedback::Failed => FAILED_REVERT,
        }
    }
}

/// Requests a rendered view should make toward sibling components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Box listings elsewhere on the page are stale and should refetch.
    BoxListChanged,
    /// The main container should load this view path.
    Navigate(String),
}

#[cfg(test)]
mod tests {
    use super::{Coercion, Feedback, FieldValue, coerce};
    use crate::error::ClientError;

    #[test]
    fn test_integer_fallback() {
        assert_eq!(coerce("7", Coercion::Integer), FieldValue::Integer(7));
        assert_eq!(coerce("abc", Coercion::Integer), FieldValue::Integer(0));
        assert_eq!(coerce("", Coercion::Integer), FieldValue::Integer(0));
        assert_eq!(coerce("4.5", Coercion::Integer), FieldValue::Integer(0));
    }

    #[test]
    fn test_text_trims() {
        assert_eq!(
            coerce("  Mint  ", Coercion::Text),
            FieldValue::Text("Mint".to_string())
        );
        assert_eq!(coerce("   ", Coercion::Text), FieldValue::Text(String::new()));
    }

    #[test]
    fn test_checkbox() {
        assert_eq!(coerce("true", Coercion::Checkbox), FieldValue::Flag(true));
        assert_eq!(coerce("on", Coercion::Checkbox), FieldValue::Flag(true));
        assert_eq!(coerce("false", Coercion::Checkbox), FieldValue::Flag(false));
        assert_eq!(coerce("", Coercion::Checkbox), FieldValue::Flag(false));
    }

    #[test]
    fn test_coercion_idempotent() {
        for (raw, coercion) in [
            ("7", Coercion::Integer),
            ("not a number", Coercion::Integer),
            ("  spaced  ", Coercion::Text),
            ("true", Coercion::Checkbox),
            ("nope", Coercion::Checkbox),
        ] {
            let once = coerce(raw, coercion);
            let twice = coerce(&once.render(), coercion);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_revert_intervals() {
        assert_eq!(Feedback::Saved.revert_after().as_secs(), 1);
        assert_eq!(Feedback::Failed.revert_after().as_secs(), 2);
    }

    #[test]
    fn test_feedback_follows_result() {
        let ok: Result<(), ClientError> = Ok(());
        let failed: Result<(), ClientError> =
            Err(ClientError::Validation("blocked".to_string()));

        assert_eq!(Feedback::of(&ok), Feedback::Saved);
        assert_eq!(Feedback::of(&failed), Feedback::Failed);
    }
}
