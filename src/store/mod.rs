//! Record stores and link resolution.
//!
//! # Components
//!
//! - [`RecordStore`]: keyed storage with persistence change tracking
//! - [`RelationIndex`]: `target id | null → assignments` multi-map, rebuilt lazily
//! - [`AssignmentStore`]: assignments plus one index and raw-id cache per side
//! - [`AssignmentResolver`]: links and unlinks assignments as records come and go
//! - [`CalendarStore`]: calendar tree with provider inheritance

mod assignment_store;
mod calendar_store;
mod record_store;
mod relation_index;
mod resolver;

pub use assignment_store::AssignmentStore;
pub use calendar_store::CalendarStore;
pub use record_store::{Origin, Record, RecordStore, StoreChanges};
pub use relation_index::RelationIndex;
pub use resolver::AssignmentResolver;
