//! # Display Preferences
//!
//! The one piece of client state that outlives a view: which of the two
//! stamp views to open by default, how to sort, and how many items to show
//! per page.
//!
//! Everything lives in a single JSON document under a fixed key inside the
//! local storage file, which is itself a string-keyed map so other
//! documents can share it. Loading is forgiving by design: a missing file,
//! unreadable JSON, or a wrong-shaped document all quietly fall back to
//! defaults. A valid document is shallow-merged over the defaults, so
//! fields written by a newer version of the app ride along untouched and
//! are written back out on the next save.
//!
//! Navigation links are rendered server-side pointing at the gallery view;
//! `rewrite_view_link` rewrites those paths in place to the user's
//! preferred view. It is a plain string substitution over the two known
//! view names, nothing structural.

use std::{
    fmt::{self, Display},
    fs,
    path::PathBuf,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{config::Config, error::ClientError};

pub const STORAGE_KEY: &str = "stampkeeper_preferences";

/// The two stamp views the server can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewName {
    Gallery,
    List,
}

impl Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewName::Gallery => write!(f, "gallery"),
            ViewName::List => write!(f, "list"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub default_view: ViewName,
    pub default_sort: String,
    pub sort_direction: String,
    pub items_per_page: u32,
    /// Fields from newer document shapes, preserved across a round trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_view: ViewName::Gallery,
            default_sort: "name".to_string(),
            sort_direction: "ASC".to_string(),
            items_per_page: 50,
            extra: Map::new(),
        }
    }
}

/// Choices made on the settings form. Unset controls keep the current
/// value.
#[derive(Debug, Default)]
pub struct SettingsForm {
    pub default_view: Option<ViewName>,
    pub default_sort: Option<String>,
    pub sort_direction: Option<String>,
    pub items_per_page: Option<u32>,
}

impl SettingsForm {
    pub fn apply_over(self, current: &Preferences) -> Preferences {
        Preferences {
            default_view: self.default_view.unwrap_or(current.default_view),
            default_sort: self.default_sort.unwrap_or_else(|| current.default_sort.clone()),
            sort_direction: self
                .sort_direction
                .unwrap_or_else(|| current.sort_direction.clone()),
            items_per_page: self.items_per_page.unwrap_or(current.items_per_page),
            extra: current.extra.clone(),
        }
    }
}

pub struct PrefStore {
    path: PathBuf,
}

impl PrefStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.storage_path.clone())
    }

    /// Load preferences, quietly substituting defaults for anything
    /// unreadable. Stored fields win over defaults; unknown stored fields
    /// are kept.
    pub fn load(&self) -> Preferences {
        let Some(Value::Object(stored)) = self.read_store().remove(STORAGE_KEY) else {
            return Preferences::default();
        };

        let Ok(Value::Object(mut merged)) = serde_json::to_value(Preferences::default()) else {
            return Preferences::default();
        };
        for (key, value) in stored {
            merged.insert(key, value);
        }

        serde_json::from_value(Value::Object(merged)).unwrap_or_else(|e| {
            warn!("Discarding malformed preferences document: {e}");
            Preferences::default()
        })
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), ClientError> {
        let mut store = self.read_store();
        store.insert(STORAGE_KEY.to_string(), serde_json::to_value(prefs)?);

        fs::write(&self.path, serde_json::to_string_pretty(&store)?)?;
        Ok(())
    }

    /// Drop the preferences document, leaving any other documents in the
    /// storage file alone.
    pub fn reset(&self) -> Result<(), ClientError> {
        let mut store = self.read_store();
        if store.remove(STORAGE_KEY).is_none() {
            return Ok(());
        }

        fs::write(&self.path, serde_json::to_string_pretty(&store)?)?;
        Ok(())
    }

    fn read_store(&self) -> Map<String, Value> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return Map::new();
        };

        match serde_json::from_str(&raw) {
            Ok(Value::Object(store)) => store,
            _ => {
                warn!("Storage file {} is not a JSON object", self.path.display());
                Map::new()
            }
        }
    }
}

/// Path of the user's preferred default view.
pub fn preferred_view_path(prefs: &Preferences) -> String {
    format!("/views/stamps/{}", prefs.default_view)
}

/// Rewrite a rendered link's view path to the preferred view. Links that
/// point elsewhere come back unchanged.
pub fn rewrite_view_link(href: &str, view: ViewName) -> String {
    let re = Regex::new(r"/views/stamps/(gallery|list)").unwrap();

    re.replace_all(href, format!("/views/stamps/{view}").as_str())
        .into_owned()
}

/// Query parameters every stamps-view fetch carries.
pub fn query_for_request(prefs: &Preferences) -> Vec<(&'static str, String)> {
    vec![
        ("sort", prefs.default_sort.clone()),
        ("order", prefs.sort_direction.clone()),
        ("limit", prefs.items_per_page.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::{
        PrefStore, Preferences, STORAGE_KEY, SettingsForm, ViewName, preferred_view_path,
        query_for_request, rewrite_view_link,
    };

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = PrefStore::new(dir.path().join("nope.json"));

        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(PrefStore::new(path).load(), Preferences::default());
    }

    #[test]
    fn test_corrupt_document_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, json!({ STORAGE_KEY: "not json" }).to_string()).unwrap();

        assert_eq!(PrefStore::new(path).load(), Preferences::default());
    }

    #[test]
    fn test_stored_fields_merge_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(
            &path,
            json!({ STORAGE_KEY: { "defaultView": "list" } }).to_string(),
        )
        .unwrap();

        let prefs = PrefStore::new(path).load();
        assert_eq!(prefs.default_view, ViewName::List);
        assert_eq!(prefs.default_sort, "name");
        assert_eq!(prefs.items_per_page, 50);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(
            &path,
            json!({ STORAGE_KEY: { "defaultSort": "issue_date", "colorTheme": "dark" } })
                .to_string(),
        )
        .unwrap();

        let store = PrefStore::new(path);
        let prefs = store.load();
        assert_eq!(prefs.default_sort, "issue_date");
        assert_eq!(prefs.extra["colorTheme"], json!("dark"));

        store.save(&prefs).unwrap();
        let reloaded = store.load();
        assert_eq!(reloaded.extra["colorTheme"], json!("dark"));
    }

    #[test]
    fn test_reset_leaves_other_documents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(
            &path,
            json!({ STORAGE_KEY: { "defaultView": "list" }, "other_app": 7 }).to_string(),
        )
        .unwrap();

        let store = PrefStore::new(path.clone());
        store.reset().unwrap();

        assert_eq!(store.load(), Preferences::default());
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["other_app"], json!(7));
    }

    #[test]
    fn test_settings_form_keeps_unset_values() {
        let current = Preferences {
            default_sort: "issue_date".to_string(),
            ..Preferences::default()
        };

        let form = SettingsForm {
            default_view: Some(ViewName::List),
            items_per_page: Some(25),
            ..SettingsForm::default()
        };

        let merged = form.apply_over(&current);
        assert_eq!(merged.default_view, ViewName::List);
        assert_eq!(merged.default_sort, "issue_date");
        assert_eq!(merged.items_per_page, 25);
        assert_eq!(merged.sort_direction, "ASC");
    }

    #[test]
    fn test_link_rewriting() {
        assert_eq!(
            rewrite_view_link("/views/stamps/gallery?box=b1", ViewName::List),
            "/views/stamps/list?box=b1"
        );
        assert_eq!(
            rewrite_view_link("/views/stamps/list", ViewName::Gallery),
            "/views/stamps/gallery"
        );
        assert_eq!(
            rewrite_view_link("/views/settings", ViewName::List),
            "/views/settings"
        );
    }

    #[test]
    fn test_view_paths_and_query() {
        let prefs = Preferences::default();
        assert_eq!(preferred_view_path(&prefs), "/views/stamps/gallery");

        let query = query_for_request(&prefs);
        assert_eq!(query[0], ("sort", "name".to_string()));
        assert_eq!(query[1], ("order", "ASC".to_string()));
        assert_eq!(query[2], ("limit", "50".to_string()));
    }
}
