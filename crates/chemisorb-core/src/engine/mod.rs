//! # Engine Module
//!
//! Stateful orchestration of the chemisorption pipeline: everything that
//! talks to an energy/force oracle, writes artifacts, or tracks the progress
//! of a run.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Pipeline parameters and their builder
//! - **Oracles** ([`oracle`]) - The energy/force evaluation seam and its adapters
//! - **Optimization** ([`optimizer`]) - BFGS relaxation driver and single points
//! - **State Tracking** ([`state`]) - Relaxation states and outcomes
//! - **Placement** ([`placement`]) - Adsorbate placement, centering and the geometry guard
//! - **Artifacts** ([`context`], [`trajectory`]) - Output namespaces, trajectories and logs
//! - **Progress Monitoring** ([`progress`]) - Progress events for front ends
//! - **Error Handling** ([`error`]) - The pipeline error taxonomy
//!
//! Site variants of one run are independent, so the engine hands each its own
//! oracle and namespace and only ever shares read-only values between them.

pub mod config;
pub mod context;
pub mod error;
pub mod optimizer;
pub mod oracle;
pub mod placement;
pub mod progress;
pub mod state;
pub mod trajectory;
