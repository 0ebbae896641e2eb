//! redflow handler engine
//!
//! This crate drives a slow, eventually consistent remote service through a
//! lifecycle operation without holding any state between invocations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              External scheduler                 │
//! │   (re-invokes with progress after a delay)      │
//! └─────────────────┬───────────────────────────────┘
//!                   │ HandlerRequest / HandlerResponse
//! ┌─────────────────▼───────────────────────────────┐
//! │              LifecycleDispatcher                │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │ StepChain: Step ▶ Step ▶ Step ▶ ...      │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐ ┌──────────────┐ ┌────────┐   │
//! │  │ RemoteInvoker│ │   Poller     │ │Backoff │   │
//! │  └──────┬───────┘ └──────────────┘ └────────┘   │
//! └─────────┼───────────────────────────────────────┘
//!           │ RemoteClient (injected)
//! ┌─────────▼───────┐
//! │ remote service  │
//! └─────────────────┘
//! ```
//!
//! Every invocation returns exactly one [`Outcome`]: `Success`, `Failed`, or
//! `InProgress` with the [`ProgressRecord`] to hand back next time.

pub mod backoff;
pub mod chain;
pub mod client;
pub mod diff;
pub mod dispatcher;
pub mod error;
pub mod fault;
pub mod outcome;
pub mod poller;
pub mod progress;

// Re-exports
pub use backoff::BackoffPolicy;
pub use chain::{
    ChainConfig, Completion, Resource, Stabilization, Step, StepChain, Target, Terminal,
};
pub use client::{HandlerContext, Probe, RemoteClient, RemoteInvoker, RemoteRequest};
pub use diff::TrackedField;
pub use dispatcher::{
    HandlerRequest, HandlerResponse, LifecycleDispatcher, ListPage, Operation, OperationStatus,
    ResourceHandlers,
};
pub use error::{HandlerError, Result};
pub use fault::{ClassifiedFault, Disposition, FailureClassifier, FailureKind, Fault, FaultTable};
pub use outcome::Outcome;
pub use poller::{Observation, Poll, StabilizationPoller};
pub use progress::ProgressRecord;
