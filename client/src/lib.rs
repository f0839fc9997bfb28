//! Client-side interaction layer for a stamp collection inventory.
//!
//! Everything here sits between rendered views and the stampkeeper server:
//! inline field edits, storage box assignment, copy (instance) rows, image
//! uploads, and display preferences. The server owns all records and all
//! rendering; this crate owns the glue that keeps an open view and the
//! server in agreement.
//!
//!
//!
//! # Sync Model
//!
//! Every edit is a single-field partial update sent to the owning entity's
//! endpoint. The server's response is authoritative: on success the view
//! model is replaced with what came back, on failure the user's unsaved
//! edit is left in place and the error is surfaced once. Nothing is
//! retried automatically.
//!
//! Saves for different fields may be in flight at the same time with no
//! ordering between them. Two overlapping saves of the *same* field are
//! not serialized either; whichever response lands last wins. This is a
//! single-user tool with low-frequency edits, so the race is tolerated
//! rather than guarded.
//!
//!
//!
//! # Storage
//!
//! The only state that outlives a view is the user's display preferences,
//! kept as one JSON document under a fixed key in a local storage file.
//! An unreadable or missing document silently falls back to defaults, and
//! fields written by newer versions of the app survive a round trip
//! through an older one.
//!
//!
//!
//! # Notes
//!
//! - Entity ids are server-assigned UUID strings; the client never mints
//!   ids of its own.
//! - A storage box is referenced by free-text name in the UI and resolved
//!   against a cached listing; an unknown name creates the box first.
//! - An instance update answered with 204 No Content means the server
//!   deleted the instance (quantity reached zero).

pub mod api;
pub mod boxes;
pub mod config;
pub mod error;
pub mod instances;
pub mod models;
pub mod prefs;
pub mod stamps;
pub mod sync;
pub mod upload;
