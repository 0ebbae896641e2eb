//! Remote client abstraction and the single-call invoker

use crate::fault::{ClassifiedFault, Fault, FailureClassifier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One outbound call: an operation name and its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub operation: String,
    pub payload: Value,
}

impl RemoteRequest {
    pub fn new(operation: impl Into<String>, payload: Value) -> Self {
        Self {
            operation: operation.into(),
            payload,
        }
    }
}

/// Transport to the remote service
///
/// Implementations own credentials and HTTP plumbing. They must not retry:
/// each call on this trait is exactly one request on the wire.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Invoke a named operation
    async fn invoke(&self, request: &RemoteRequest) -> Result<Value, Fault>;

    /// Current state of a resource, or a not-found fault
    async fn describe(&self, resource_id: &str) -> Result<Value, Fault>;
}

/// Query used to observe remote state
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    Describe(String),
    Invoke(RemoteRequest),
}

/// Performs single remote calls and classifies their faults
#[derive(Clone, Copy)]
pub struct RemoteInvoker<'a> {
    client: &'a dyn RemoteClient,
    classifier: &'a dyn FailureClassifier,
}

impl<'a> RemoteInvoker<'a> {
    pub fn new(client: &'a dyn RemoteClient, classifier: &'a dyn FailureClassifier) -> Self {
        Self { client, classifier }
    }

    pub async fn call(&self, request: &RemoteRequest) -> Result<Value, ClassifiedFault> {
        tracing::debug!("Invoking {}", request.operation);
        self.client
            .invoke(request)
            .await
            .map_err(|fault| self.classify(fault))
    }

    pub async fn describe(&self, resource_id: &str) -> Result<Value, ClassifiedFault> {
        tracing::debug!("Describing {}", resource_id);
        self.client
            .describe(resource_id)
            .await
            .map_err(|fault| self.classify(fault))
    }

    pub async fn query(&self, probe: &Probe) -> Result<Value, ClassifiedFault> {
        match probe {
            Probe::Describe(resource_id) => self.describe(resource_id).await,
            Probe::Invoke(request) => self.call(request).await,
        }
    }

    fn classify(&self, fault: Fault) -> ClassifiedFault {
        let disposition = self.classifier.classify(&fault);
        tracing::debug!("Remote fault {} classified as {:?}", fault.code, disposition);
        ClassifiedFault { disposition, fault }
    }
}

/// Per-invocation context handed explicitly to every chain and step call
pub struct HandlerContext<'a> {
    pub invoker: RemoteInvoker<'a>,
    pub span: tracing::Span,
}

impl<'a> HandlerContext<'a> {
    pub fn new(invoker: RemoteInvoker<'a>, span: tracing::Span) -> Self {
        Self { invoker, span }
    }
}
