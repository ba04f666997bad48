//! # Freshd Testing Utils
//!
//! Shared testing utilities for the freshd workspace: an in-memory
//! `TaskStore` mock, a `TaskRecord` builder, and reusable task handlers
//! for exercising the engine without a real database.
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! freshd-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod handlers;
pub mod mocks;

pub use builders::TaskRecordBuilder;
pub use handlers::{CountingHandler, FailingHandler, SlowHandler};
pub use mocks::MemoryTaskStore;
