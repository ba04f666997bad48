pub mod entities;
pub mod events;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{LastRunStatus, TaskRecord, TaskStatus};
pub use events::{EventBus, EventEnvelope, TaskEvent};
pub use freshd_core::{FreshdError, FreshdResult};
pub use repositories::{RecordPatch, RecordQuery, TaskStore, UpdateOptions, UpdateValue};
pub use services::{FnHandler, TaskContext, TaskHandler};
pub use value_objects::{human_duration, AgeWindow};
