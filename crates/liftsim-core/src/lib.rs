//! Dispatch and movement engine for the Liftsim elevator simulation.
//!
//! Each scheduler cycle steps every elevator through three phases:
//! call assignment, door operation, and movement. The result is committed
//! to the store atomically and then pushed to a [`Notifier`].
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `liftsim-config.yaml`.
//! - [`control`] -- [`SchedulerControl`]: stop, pause, tick speed.
//! - [`runtime`] -- Per-elevator target queue and door timer.
//! - [`assigner`] -- Call Assigner.
//! - [`doors`] -- Door Controller.
//! - [`movement`] -- Movement Engine.
//! - [`step`] -- One elevator's step and its commit.
//! - [`scheduler`] -- The tick loop.
//! - [`notifier`] -- The [`Notifier`] trait and combinators.
//! - [`calls`] -- Building and call services.
//!
//! [`Notifier`]: notifier::Notifier
//! [`SchedulerControl`]: control::SchedulerControl

pub mod assigner;
pub mod calls;
pub mod config;
pub mod control;
pub mod doors;
pub mod movement;
pub mod notifier;
pub mod runtime;
pub mod scheduler;
pub mod step;

pub use calls::CallError;
pub use config::{ConfigError, DoorTiming, SimulationConfig};
pub use control::SchedulerControl;
pub use notifier::{FanoutNotifier, NoOpNotifier, Notifier, NotifyError};
pub use scheduler::{CycleSummary, Scheduler, SchedulerReport, run_scheduler};
pub use step::StepError;
