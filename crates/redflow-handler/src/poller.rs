//! Stabilization polling
//!
//! One poll issues one query. Predicates that need several consecutive
//! favorable observations keep their tally in the progress record, because the
//! observations are spread over several invocations.

use crate::client::{Probe, RemoteInvoker};
use crate::fault::ClassifiedFault;
use crate::progress::ProgressRecord;
use serde_json::Value;

/// Remote state as seen by a stabilization predicate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation<'a> {
    Present(&'a Value),
    /// The query reported the resource as not found
    Absent,
}

/// Result of a single poll
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    /// Enough favorable observations; carries the last observed state
    Stable(Option<Value>),
    Pending,
}

/// Stateless poller; all memory lives in the progress record
pub struct StabilizationPoller;

impl StabilizationPoller {
    /// Query once and fold the verdict into `counter`
    ///
    /// A not-found fault is handed to the predicate as [`Observation::Absent`].
    /// Throttled and transient faults count as "not yet stable". Any other
    /// fault is returned to the caller.
    pub async fn poll<M, F>(
        invoker: &RemoteInvoker<'_>,
        probe: &Probe,
        counter: &str,
        min_observations: u32,
        progress: &mut ProgressRecord<M>,
        predicate: F,
    ) -> Result<Poll, ClassifiedFault>
    where
        F: FnOnce(Observation<'_>) -> bool,
    {
        let (favorable, observed) = match invoker.query(probe).await {
            Ok(state) => {
                let favorable = predicate(Observation::Present(&state));
                (favorable, Some(state))
            }
            Err(fault) if fault.is_not_found() => (predicate(Observation::Absent), None),
            Err(fault) if fault.is_retryable() => {
                tracing::warn!(
                    "Treating {} during stabilization as not yet stable: {}",
                    fault.fault.code,
                    fault.message()
                );
                (false, None)
            }
            Err(fault) => return Err(fault),
        };

        if !favorable {
            progress.reset_counter(counter);
            return Ok(Poll::Pending);
        }

        let seen = progress.increment(counter);
        if seen < min_observations.max(1) {
            tracing::debug!(
                "{} favorable observation(s) of {} required for {}",
                seen,
                min_observations,
                counter
            );
            return Ok(Poll::Pending);
        }

        Ok(Poll::Stable(observed))
    }
}
