//! Interfaces to the systems around the engine.
//!
//! The engine never computes routes or prices itself. Path requests go to a
//! [`PathfindingService`] and are polled on later updates; employment and
//! mood baselines come from [`EconomySignals`]. Both are `Send + Sync` so
//! worker threads may poll them during a parallel batch. All mutation
//! (`request_path`, `release`) happens on the engine thread between batches.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::citizen::Location;

/// Opaque handle to a path request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStatus {
    Pending,
    Ready,
    Failed,
    /// The service does not know this handle (released or never issued).
    Unknown,
}

/// Who is travelling, for service-side routing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentClass {
    Pedestrian,
    Commuter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PathPriority {
    Low,
    Normal,
    High,
}

pub trait PathfindingService: Send + Sync {
    fn request_path(
        &mut self,
        from: Location,
        to: Location,
        class: AgentClass,
        priority: PathPriority,
    ) -> PathHandle;

    fn status(&self, handle: PathHandle) -> PathStatus;

    /// The engine no longer needs this path.
    fn release(&mut self, handle: PathHandle);
}

/// Straight-line routing: every request is ready immediately.
#[derive(Debug, Default)]
pub struct DirectRoutePathfinder {
    next: u64,
    live: HashSet<u64>,
}

impl DirectRoutePathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests issued and not yet released.
    pub fn outstanding(&self) -> usize {
        self.live.len()
    }
}

impl PathfindingService for DirectRoutePathfinder {
    fn request_path(
        &mut self,
        _from: Location,
        _to: Location,
        _class: AgentClass,
        _priority: PathPriority,
    ) -> PathHandle {
        let handle = self.next;
        self.next += 1;
        self.live.insert(handle);
        PathHandle(handle)
    }

    fn status(&self, handle: PathHandle) -> PathStatus {
        if self.live.contains(&handle.0) {
            PathStatus::Ready
        } else {
            PathStatus::Unknown
        }
    }

    fn release(&mut self, handle: PathHandle) {
        self.live.remove(&handle.0);
    }
}

pub trait EconomySignals: Send + Sync {
    /// Open positions across the city.
    fn jobs_available(&self) -> u32;

    /// City-wide mood baseline, 0–100.
    fn happiness_baseline(&self) -> f32;
}

/// Fixed economy signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StaticEconomy {
    pub jobs_available: u32,
    pub happiness_baseline: f32,
}

impl Default for StaticEconomy {
    fn default() -> Self {
        Self {
            jobs_available: u32::MAX,
            happiness_baseline: 60.0,
        }
    }
}

impl EconomySignals for StaticEconomy {
    fn jobs_available(&self) -> u32 {
        self.jobs_available
    }

    fn happiness_baseline(&self) -> f32 {
        self.happiness_baseline
    }
}
