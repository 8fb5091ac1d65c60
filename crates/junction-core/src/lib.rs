//! Lane scheduler, phase controller and control plane for the junction
//! signal controller.
//!
//! Each junction admits vehicles into four FIFO lane queues. On every
//! scheduler tick the cycle evaluator decides whether a lane gets
//! right-of-way: a top-urgency vehicle triggers a full clearance of its
//! lane, otherwise eligible lanes are ranked by priority and ties are
//! broken round robin. The chosen episode then runs through its timed
//! green, yellow and red sub-states.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `junction-config.yaml` into
//!   strongly-typed structs.
//! - [`controller`] -- [`JunctionController`], the per-junction serializing
//!   unit that runs ticks and drives episodes.
//! - [`operator`] -- Shared pause, speed, block-size and stop controls.
//! - [`phase`] -- The episode state machine.
//! - [`registry`] -- [`JunctionRegistry`], the ingestion and control API
//!   over all junctions.
//! - [`runner`] -- The periodic scheduler loop.
//! - [`scheduler`] -- The pure cycle evaluator.
//! - [`state`] -- [`JunctionState`], the aggregate the above mutate.
//! - [`timing`] -- Base durations and speed scaling.
//!
//! [`JunctionController`]: controller::JunctionController
//! [`JunctionRegistry`]: registry::JunctionRegistry
//! [`JunctionState`]: state::JunctionState

pub mod config;
pub mod controller;
pub mod operator;
pub mod phase;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod state;
pub mod timing;
