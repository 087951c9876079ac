//! Scheduling records.
//!
//! Plain records plus the two-slot field machinery that lets an event hold
//! committed and proposed values side by side.
//!
//! # Records
//!
//! | Record | Store | Links |
//! |--------|-------|-------|
//! | Event | events | calendar (by id) |
//! | Resource | resources | calendar (by id) |
//! | Assignment | assignments | event, resource (lazy references) |
//! | Calendar | calendars | parent calendar (tree) |

mod assignment;
mod calendar;
mod data;
mod event;
mod field;
mod id;
mod resource;

pub use assignment::{Assignment, Link, LinkTarget, Reference};
pub use calendar::Calendar;
pub use data::{AssignmentData, CalendarData, EventData, ProjectData, ResourceData};
pub use event::Event;
pub use field::{Field, FieldTransaction};
pub use id::{EntityKey, RecordId, StoreKind};
pub use resource::Resource;
