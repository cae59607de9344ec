//! Pure citizen behavior rules for civsim.
//!
//! This crate contains the behavior logic that is independent of storage,
//! scheduling and threading. Functions take plain data and return results,
//! making them unit-testable and safe to call from any worker thread.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`activities`] | Activity catalog, desirability scoring, activity choice |
//! | [`batch`] | Round-robin batch windows and per-tick cost stats |
//! | [`demographics`] | Aging, band-change occupations, labor-pool clamping |
//! | [`effects`] | Per-state and per-activity effects on needs and vitals |
//! | [`needs`] | Ten-dimension needs, decay, critical-need detection |
//! | [`personality`] | Big Five traits (0–100) and derived multipliers |
//! | [`schedule`] | Schedule templates, commute time, clock-driven target state |
//! | [`social`] | Bounded relationship slots, decay, interaction kinds |
//! | [`state`] | The eleven behavior states and the transition table |
//! | [`time`] | Minute-of-day windows and day-of-week math |
//! | [`transitions`] | Critical overrides and schedule-driven transitions |
//! | [`vitals`] | Health, energy, happiness and stress drift |

pub mod activities;
pub mod batch;
pub mod demographics;
pub mod effects;
pub mod needs;
pub mod personality;
pub mod schedule;
pub mod social;
pub mod state;
pub mod time;
pub mod transitions;
pub mod vitals;
