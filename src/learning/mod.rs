//! Run-history learning.
//!
//! Every completed run can be recorded with its configuration, the shape of
//! its input and its outcome. Given enough runs on inputs of similar size,
//! the store proposes a [`ConfigPatch`](crate::config::ConfigPatch) averaged
//! from the best of them.
//!
//! The store is an explicit value owned by the caller. Share it across
//! threads through `Arc<LearningStore>`.
//!
//! # Example
//!
//! ```
//! use u_timetable::learning::LearningStore;
//!
//! let store = LearningStore::new();
//! assert_eq!(store.stats().total_records, 0);
//!
//! let document = store.export_json().unwrap();
//! let restored = LearningStore::new();
//! restored.import_json(&document).unwrap();
//! assert!(restored.is_empty());
//! ```

mod record;
mod store;

pub use record::{InputShape, LearningRecord, OutcomeMetrics};
pub use store::{ImportError, LearningStats, LearningStore, Recommendation, DOCUMENT_VERSION};
