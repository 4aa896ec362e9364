//! Watchers turning references into live state
//!
//! # Module Organization
//!
//! - [`state`] - Externally observed state and lifecycle phases
//! - [`machine`] - Subscription state machine shared by both watchers
//! - [`document`] - Single document watcher
//! - [`collection`] - Query (collection) watcher

pub mod collection;
pub mod document;
pub mod machine;
pub mod state;

pub use collection::{CollectionWatcher, Many};
pub use document::{DocumentWatcher, Single};
pub use machine::{WatchTarget, Watcher};
pub use state::{Phase, WatcherState};
