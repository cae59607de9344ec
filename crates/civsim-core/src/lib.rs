//! civsim-core - Mass-Scale Citizen Behavior Engine
//!
//! Simulates the daily lives of up to a million city residents inside a
//! per-frame budget. Each citizen follows a personality-shaped routine,
//! satisfies decaying needs, forms relationships and ages through life
//! stages.
//!
//! # Architecture
//!
//! - **Store**: citizens live in one dense, cache-aligned array behind a
//!   generation-checked slot map (`store`)
//! - **Scheduler**: each tick steps one window of citizens from a persistent
//!   cursor, sharded across rayon workers when large (`scheduler`)
//! - **Step**: needs, activities, state machine, relationship decay and aging
//!   for one citizen, with rules from `civsim-logic` (`behavior`)
//! - **Follow-up**: path requests and social pairing run on the engine thread
//!   after each batch (`social`, `collaborators`)
//!
//! # Example
//!
//! ```rust,no_run
//! use civsim_core::prelude::*;
//!
//! let mut engine = CitizenEngine::new(EngineConfig::default()).unwrap();
//! let id = engine
//!     .create_citizen(Location::new(10.0, 20.0), 34, Occupation::Office)
//!     .unwrap();
//!
//! loop {
//!     engine.update(1.0 / 60.0).unwrap(); // 60 FPS
//! #   break;
//! }
//! let snapshot = engine.get_citizen(id).unwrap();
//! println!("{} is {}", snapshot.id, snapshot.state);
//! ```

pub mod behavior;
pub mod citizen;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod demographics;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod social;
pub mod store;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::citizen::{Citizen, CitizenId, CitizenSnapshot, EconomicSnapshot, Location};
    pub use crate::collaborators::{EconomySignals, PathfindingService};
    pub use crate::config::EngineConfig;
    pub use crate::demographics::PopulationStatistics;
    pub use crate::engine::{CitizenEngine, Diagnostics};
    pub use crate::error::{EngineError, Result};
    pub use civsim_logic::schedule::Occupation;
    pub use civsim_logic::social::RelationshipKind;
    pub use civsim_logic::state::BehaviorState;
}
