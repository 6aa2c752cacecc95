//! Feather Animation Engine
//!
//! Drives a scalar toward a movable target, one frame at a time, and reports
//! every new value to its owner.
//!
//! # Features
//!
//! - **Spring and decay integration**: explicit damped-spring or exponential
//!   approach, selectable per scalar at any time
//! - **Rest and threshold detection**: the frame loop stops by itself at rest
//!   and signals when the value crosses a threshold
//! - **Delayed targets**: cancellable, last-writer-wins
//! - **Injected hosts**: [`ManualHost`] for deterministic frames and tests,
//!   [`BackgroundHost`] for real-time frames on a background thread
//! - **Two notification channels**: a per-frame value stream and a discrete
//!   notify signal

pub mod background;
pub mod config;
mod controller;
pub mod error;
pub mod host;
pub mod integrator;
pub mod manual;
pub mod notify;
pub mod rest;
pub mod scalar;
pub mod scheduler;

pub use background::BackgroundHost;
pub use config::FeatherConfig;
pub use error::{FeatherError, Result};
pub use host::{FrameCallback, FrameHost, FrameRequestId, TimerCallback, TimerId};
pub use integrator::{step, Algorithm, MotionParams, MotionState};
pub use manual::ManualHost;
pub use notify::{NotifyCallback, ValueCallback};
pub use rest::DEFAULT_EPSILON;
pub use scalar::{
    AnimatedScalar, AnimatedScalarBuilder, AttachmentState, ScalarHandle, ScheduleState,
};
pub use scheduler::{clamp_frame_delta, MAX_FRAME_DELTA_MS};
