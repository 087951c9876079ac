//! Scheduling consistency engine for the U-Engine ecosystem.
//!
//! Keeps a graph of scheduling entities (events, resources, assignments,
//! calendars) mutually consistent under a propose/commit transaction model.
//!
//! # Modules
//!
//! - **`time`**: Unit-aware, DST-safe date arithmetic (`DurationUnit`,
//!   `DateArithmetic`, calendar-aware adapter)
//! - **`models`**: Records: `Event`, `Resource`, `Assignment`, `Calendar`,
//!   two-slot `Field` values and load data
//! - **`store`**: Record stores, change tracking, `RelationIndex` and the
//!   `AssignmentResolver`
//! - **`engine`**: Start/end/duration reconciliation, the `Project`
//!   coordinator and its async `SharedProject` handle
//! - **`validation`**: Input integrity checks for loaded data
//!
//! # Pipeline
//!
//! ```text
//! propose_*() ──► Event (Field slots + FieldTransaction) ──► Project dirty set
//!                                                              │ commit()
//!                                                              ▼
//!                               reconcile every dirty Event (no cross-entity order)
//!                                                              │
//!                                                              ▼
//!                               AssignmentResolver links / unlinks, index rebuild
//!                                                              │
//!                                                              ▼
//!                                               one ChangeSet to observers
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use u_schedule_core::engine::Project;
//! use u_schedule_core::models::Event;
//! use u_schedule_core::time::DurationUnit;
//!
//! let mut project = Project::default();
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! project
//!     .add_event(Event::new(1).with_start(start).with_duration(3.0, DurationUnit::Day))
//!     .unwrap();
//! project.commit();
//!
//! project.propose_duration(1, Some(5.0), None, true).unwrap();
//! project.commit();
//!
//! let end = project.event(1).unwrap().end().unwrap();
//! assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
pub mod time;
pub mod validation;

pub use config::ProjectConfig;
pub use error::{RangeError, SchedulingError, SchedulingResult};
