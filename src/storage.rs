//! Record hierarchy for study mementos
//!
//! A [`StudyRecord`] owns its [`SeriesRecord`]s, which own their instance
//! records. Records are single-owner: reading a loaded instance advances its
//! decode state, so every accessor that may decode takes `&mut self`. Callers
//! wanting parallelism shard at the study or series boundary.

/// Series record and its base profile lifecycle
pub mod series;
/// Study record, aggregates and memento I/O
pub mod study;


pub use series::SeriesRecord;
pub use study::StudyRecord;
