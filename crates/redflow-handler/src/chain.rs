//! Step chain orchestration
//!
//! A [`StepChain`] is an ordered list of [`Step`]s that together make up one
//! lifecycle operation. Each invocation walks the chain from the top:
//!
//! ```text
//!   done? ──yes──▶ next step
//!     │no
//!   should_run? ──no──▶ next step (progress untouched)
//!     │yes
//!   call issued? ──no──▶ settle ▶ invoke ──fault──▶ Failed / retry InProgress
//!     │yes                          │ok
//!     ▼                             ▼
//!   stabilize ──pending──▶ InProgress(policy delay)
//!     │stable
//!   on_complete ──cool-down (first time)──▶ InProgress(cool-down)
//!     │
//!   mark done ▶ next step
//! ```
//!
//! The mutating call of a step is issued at most once per operation: the
//! "issued" flag is persisted before any suspension, and a resumed step only
//! re-checks stabilization.

use crate::backoff::BackoffPolicy;
use crate::client::{HandlerContext, Probe, RemoteRequest};
use crate::fault::{ClassifiedFault, Disposition, FailureKind};
use crate::outcome::Outcome;
use crate::poller::{Observation, Poll, StabilizationPoller};
use crate::progress::ProgressRecord;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::Instrument;

/// A resource model handled by a chain
pub trait Resource:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Primary identifier, when known
    fn identifier(&self) -> Option<&str>;
}

/// Desired state and, for updates, the state it replaces
#[derive(Debug)]
pub struct Target<'a, M> {
    pub desired: &'a M,
    pub previous: Option<&'a M>,
}

impl<M> Clone for Target<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Target<'_, M> {}

impl<'a, M> Target<'a, M> {
    pub fn new(desired: &'a M, previous: Option<&'a M>) -> Self {
        Self { desired, previous }
    }

    pub fn is_create(&self) -> bool {
        self.previous.is_none()
    }
}

/// How a step confirms its mutation took effect
#[derive(Debug, Clone)]
pub struct Stabilization {
    pub probe: Probe,

    /// Consecutive favorable polls required before trusting the remote state
    pub min_observations: u32,

    /// Overrides the chain's stabilization policy
    pub policy: Option<BackoffPolicy>,
}

impl Stabilization {
    pub fn new(probe: Probe) -> Self {
        Self {
            probe,
            min_observations: 1,
            policy: None,
        }
    }

    pub fn describe(resource_id: impl Into<String>) -> Self {
        Self::new(Probe::Describe(resource_id.into()))
    }

    pub fn invoke(request: RemoteRequest) -> Self {
        Self::new(Probe::Invoke(request))
    }

    pub fn with_min_observations(mut self, min_observations: u32) -> Self {
        self.min_observations = min_observations;
        self
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

/// What to do once a step has stabilized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Advance,
    /// Revisit this step once more after the given delay
    CoolDown(u64),
}

/// One conditional remote operation in a chain
pub trait Step<M: Resource>: Send + Sync {
    /// Stable identifier, used as the progress key
    fn name(&self) -> &'static str;

    fn should_run(&self, target: Target<'_, M>, progress: &ProgressRecord<M>) -> bool {
        let _ = (target, progress);
        true
    }

    fn build_request(&self, target: Target<'_, M>, progress: &ProgressRecord<M>) -> RemoteRequest;

    /// Runs right after the call succeeded, before any suspension
    fn capture(&self, response: &Value, progress: &mut ProgressRecord<M>) {
        let _ = (response, progress);
    }

    fn stabilization(
        &self,
        target: Target<'_, M>,
        progress: &ProgressRecord<M>,
    ) -> Option<Stabilization> {
        let _ = (target, progress);
        None
    }

    fn is_stable(&self, observation: Observation<'_>, target: Target<'_, M>) -> bool {
        let _ = target;
        matches!(observation, Observation::Present(_))
    }

    fn on_complete(&self, observed: Option<&Value>, progress: &mut ProgressRecord<M>) -> Completion {
        let _ = (observed, progress);
        Completion::Advance
    }

    /// Bounded in-process wait before the call is issued
    fn settle(&self, progress: &ProgressRecord<M>) -> Option<Duration> {
        let _ = progress;
        None
    }

    /// Faults this step tolerates; the step then counts as complete
    fn suppress(&self, fault: &ClassifiedFault, target: Target<'_, M>) -> bool {
        let _ = (fault, target);
        false
    }
}

/// What a chain returns once every step has run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// `Success` with the accumulated resource model
    Model,
    /// `Success(None)`
    Deleted,
}

/// Policies shared by every step of a chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainConfig {
    pub stabilization: BackoffPolicy,
    pub throttling: BackoffPolicy,
    pub terminal: Terminal,
}

impl ChainConfig {
    pub fn new(stabilization: BackoffPolicy, throttling: BackoffPolicy) -> Self {
        Self {
            stabilization,
            throttling,
            terminal: Terminal::Model,
        }
    }

    pub fn deleting(mut self) -> Self {
        self.terminal = Terminal::Deleted;
        self
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new(
            BackoffPolicy::constant(30, 3 * 60 * 60),
            BackoffPolicy::exponential(5, 60, 15 * 60),
        )
    }
}

enum Flow<M> {
    Continue,
    Skip,
    Halt(Outcome<M>),
}

fn observation_counter(step: &str) -> String {
    format!("{}-stabilize-attempts", step)
}

fn poll_counter(step: &str) -> String {
    format!("{}-polls", step)
}

fn throttle_counter(step: &str) -> String {
    format!("{}-throttles", step)
}

/// Ordered list of steps making up one operation
pub struct StepChain<M: Resource> {
    operation: &'static str,
    steps: Vec<Box<dyn Step<M>>>,
    config: ChainConfig,
}

impl<M: Resource> StepChain<M> {
    pub fn new(operation: &'static str, config: ChainConfig) -> Self {
        Self {
            operation,
            steps: Vec::new(),
            config,
        }
    }

    pub fn step(mut self, step: impl Step<M> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run as many steps as possible in this invocation
    pub async fn run(
        &self,
        ctx: &HandlerContext<'_>,
        desired: &M,
        previous: Option<&M>,
        progress: ProgressRecord<M>,
    ) -> Outcome<M> {
        self.walk(ctx, Target::new(desired, previous), progress)
            .instrument(ctx.span.clone())
            .await
    }

    async fn walk(
        &self,
        ctx: &HandlerContext<'_>,
        target: Target<'_, M>,
        mut progress: ProgressRecord<M>,
    ) -> Outcome<M> {
        if progress.resource_model.is_none() {
            progress.resource_model = Some(target.desired.clone());
        }

        for step in &self.steps {
            let name = step.name();
            if progress.is_done(name) {
                continue;
            }
            if !step.should_run(target, &progress) {
                tracing::debug!("Skipping {} ({})", name, self.operation);
                continue;
            }

            if !progress.is_invoked(name) {
                match self.issue(ctx, step.as_ref(), target, &mut progress).await {
                    Flow::Continue => {}
                    Flow::Skip => {
                        progress.mark_done(name);
                        continue;
                    }
                    Flow::Halt(outcome) => return outcome,
                }
            } else {
                tracing::debug!("{} already issued, re-checking stabilization", name);
            }

            let observed = match self.stabilize(ctx, step.as_ref(), target, &mut progress).await {
                Ok(observed) => observed,
                Err(outcome) => return outcome,
            };

            if let Completion::CoolDown(delay) = step.on_complete(observed.as_ref(), &mut progress) {
                if !progress.is_cooled(name) {
                    progress.mark_cooled(name);
                    tracing::info!("{} stabilized, cooling down for {}s", name, delay);
                    return Outcome::in_progress(delay, progress);
                }
            }

            progress.mark_done(name);
            tracing::info!("{} complete", name);
        }

        tracing::info!("{} finished", self.operation);
        match self.config.terminal {
            Terminal::Model => Outcome::Success(progress.resource_model),
            Terminal::Deleted => Outcome::Success(None),
        }
    }

    /// Issue the step's mutating call
    async fn issue(
        &self,
        ctx: &HandlerContext<'_>,
        step: &dyn Step<M>,
        target: Target<'_, M>,
        progress: &mut ProgressRecord<M>,
    ) -> Flow<M> {
        let name = step.name();

        if let Some(wait) = step.settle(progress) {
            tracing::info!("Settling {:?} before {}", wait, name);
            tokio::time::sleep(wait).await;
        }

        let request = step.build_request(target, progress);
        match ctx.invoker.call(&request).await {
            Ok(response) => {
                tracing::info!("{} issued {}", name, request.operation);
                progress.mark_invoked(name);
                progress.reset_counter(&throttle_counter(name));
                step.capture(&response, progress);
                Flow::Continue
            }
            Err(fault) if step.suppress(&fault, target) => {
                tracing::warn!("{} tolerated {}: {}", name, fault.fault.code, fault.message());
                Flow::Skip
            }
            Err(fault) => match fault.disposition {
                Disposition::Throttled | Disposition::Transient => {
                    let key = throttle_counter(name);
                    match self.config.throttling.next_delay(progress.counter(&key)) {
                        Some(delay) => {
                            progress.increment(&key);
                            tracing::warn!(
                                "{} hit retryable {}, retrying in {}s",
                                name,
                                fault.fault.code,
                                delay
                            );
                            Flow::Halt(Outcome::in_progress(delay, std::mem::take(progress)))
                        }
                        None => Flow::Halt(Outcome::failed(
                            FailureKind::GeneralServiceException,
                            fault.fault.message,
                        )),
                    }
                }
                Disposition::Terminal(_) => {
                    tracing::info!("{} failed with {}", name, fault.fault.code);
                    Flow::Halt(Outcome::failed(fault.kind(), fault.fault.message))
                }
            },
        }
    }

    /// Poll the step's stabilization predicate once
    async fn stabilize(
        &self,
        ctx: &HandlerContext<'_>,
        step: &dyn Step<M>,
        target: Target<'_, M>,
        progress: &mut ProgressRecord<M>,
    ) -> Result<Option<Value>, Outcome<M>> {
        let name = step.name();
        let Some(stabilization) = step.stabilization(target, progress) else {
            return Ok(None);
        };

        let poll = StabilizationPoller::poll(
            &ctx.invoker,
            &stabilization.probe,
            &observation_counter(name),
            stabilization.min_observations,
            progress,
            |observation| step.is_stable(observation, target),
        )
        .await;

        match poll {
            Ok(Poll::Stable(observed)) => Ok(observed),
            Ok(Poll::Pending) => {
                let policy = stabilization.policy.unwrap_or(self.config.stabilization);
                let key = poll_counter(name);
                match policy.next_delay(progress.counter(&key)) {
                    Some(delay) => {
                        progress.increment(&key);
                        tracing::info!("{} not yet stable, checking again in {}s", name, delay);
                        Err(Outcome::in_progress(delay, std::mem::take(progress)))
                    }
                    None => Err(Outcome::failed(
                        FailureKind::NotStabilized,
                        format!(
                            "{} did not stabilize within {}s",
                            name,
                            policy.timeout_seconds()
                        ),
                    )),
                }
            }
            Err(fault) => Err(Outcome::failed(fault.kind(), fault.fault.message)),
        }
    }
}
