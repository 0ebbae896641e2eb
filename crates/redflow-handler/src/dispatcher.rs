//! Lifecycle dispatcher
//!
//! Routes an incoming request to the chain for its operation and converts the
//! resulting [`Outcome`] into the wire response. Progress records are passed
//! through untouched apart from what the chain itself records.

use crate::chain::{Resource, StepChain};
use crate::client::{HandlerContext, RemoteClient, RemoteInvoker};
use crate::error::{HandlerError, Result};
use crate::fault::{ClassifiedFault, FailureClassifier, FailureKind};
use crate::outcome::Outcome;
use crate::progress::ProgressRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

/// Lifecycle operation requested by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::List => write!(f, "list"),
        }
    }
}

/// Incoming invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerRequest<M> {
    pub operation: Operation,

    pub desired_model: Option<M>,

    pub previous_model: Option<M>,

    /// Progress returned by the previous invocation, verbatim
    pub progress: Option<ProgressRecord<M>>,

    #[serde(default)]
    pub next_token: Option<String>,
}

impl<M> HandlerRequest<M> {
    pub fn new(operation: Operation, desired_model: Option<M>) -> Self {
        Self {
            operation,
            desired_model,
            previous_model: None,
            progress: None,
            next_token: None,
        }
    }

    pub fn with_previous(mut self, previous: M) -> Self {
        self.previous_model = Some(previous);
        self
    }

    pub fn with_progress(mut self, progress: ProgressRecord<M>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_next_token(mut self, next_token: impl Into<String>) -> Self {
        self.next_token = Some(next_token.into());
        self
    }
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Success,
    Failed,
    InProgress,
}

/// Outgoing response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse<M> {
    pub status: OperationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_model: Option<M>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_models: Option<Vec<M>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,

    #[serde(default)]
    pub callback_delay_seconds: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressRecord<M>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<FailureKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<M> HandlerResponse<M> {
    fn empty(status: OperationStatus) -> Self {
        Self {
            status,
            resource_model: None,
            resource_models: None,
            next_token: None,
            callback_delay_seconds: 0,
            progress: None,
            error_code: None,
            message: None,
        }
    }

    pub fn listed(page: ListPage<M>) -> Self {
        Self {
            resource_models: Some(page.models),
            next_token: page.next_token,
            ..Self::empty(OperationStatus::Success)
        }
    }
}

impl<M> From<Outcome<M>> for HandlerResponse<M> {
    fn from(outcome: Outcome<M>) -> Self {
        match outcome {
            Outcome::Success(model) => Self {
                resource_model: model,
                ..Self::empty(OperationStatus::Success)
            },
            Outcome::Failed { kind, message } => Self {
                error_code: Some(kind),
                message: Some(message),
                ..Self::empty(OperationStatus::Failed)
            },
            Outcome::InProgress {
                delay_seconds,
                progress,
            } => Self {
                callback_delay_seconds: delay_seconds,
                progress: Some(progress),
                ..Self::empty(OperationStatus::InProgress)
            },
        }
    }
}

/// One page of a list operation
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<M> {
    pub models: Vec<M>,
    pub next_token: Option<String>,
}

/// Chain definitions for one resource family
#[async_trait]
pub trait ResourceHandlers: Send + Sync {
    type Model: Resource;

    /// Resource type name used in logs (e.g. "AWS::Redshift::Cluster")
    fn type_name(&self) -> &'static str;

    fn classifier(&self) -> &dyn FailureClassifier;

    /// Reject a desired model before any remote call is made
    fn validate(
        &self,
        operation: Operation,
        model: &Self::Model,
    ) -> std::result::Result<(), String> {
        let _ = (operation, model);
        Ok(())
    }

    /// Chain for Create, Read, Update or Delete
    fn chain(&self, operation: Operation) -> Option<StepChain<Self::Model>>;

    async fn list(
        &self,
        ctx: &HandlerContext<'_>,
        next_token: Option<&str>,
    ) -> std::result::Result<ListPage<Self::Model>, ClassifiedFault>;
}

/// Routes requests for one resource family
pub struct LifecycleDispatcher<'a, H> {
    handlers: &'a H,
    client: &'a dyn RemoteClient,
}

impl<'a, H: ResourceHandlers> LifecycleDispatcher<'a, H> {
    pub fn new(handlers: &'a H, client: &'a dyn RemoteClient) -> Self {
        Self { handlers, client }
    }

    pub async fn dispatch(&self, request: HandlerRequest<H::Model>) -> HandlerResponse<H::Model> {
        let identifier = request
            .desired_model
            .as_ref()
            .and_then(|model| model.identifier())
            .unwrap_or("-")
            .to_string();
        let span = tracing::info_span!(
            "handler",
            resource_type = self.handlers.type_name(),
            operation = %request.operation,
            identifier = %identifier,
        );
        let invoker = RemoteInvoker::new(self.client, self.handlers.classifier());
        let ctx = HandlerContext::new(invoker, span);

        if request.operation == Operation::List {
            return match self
                .handlers
                .list(&ctx, request.next_token.as_deref())
                .instrument(ctx.span.clone())
                .await
            {
                Ok(page) => HandlerResponse::listed(page),
                Err(fault) => Outcome::<H::Model>::failed(fault.kind(), fault.fault.message).into(),
            };
        }

        let Some(desired) = request.desired_model else {
            let err = HandlerError::MissingDesiredModel(request.operation.to_string());
            return Outcome::<H::Model>::failed(FailureKind::InvalidRequest, err.to_string())
                .into();
        };

        let Some(chain) = self.handlers.chain(request.operation) else {
            let err = HandlerError::UnsupportedOperation(
                request.operation.to_string(),
                self.handlers.type_name().to_string(),
            );
            return Outcome::<H::Model>::failed(FailureKind::InvalidRequest, err.to_string())
                .into();
        };

        if let Err(message) = self.handlers.validate(request.operation, &desired) {
            return Outcome::<H::Model>::failed(FailureKind::InvalidRequest, message).into();
        }

        let progress = request.progress.unwrap_or_default();
        let outcome = chain
            .run(&ctx, &desired, request.previous_model.as_ref(), progress)
            .await;
        ctx.span.in_scope(|| tracing::info!("{} -> {}", chain.operation(), outcome));
        outcome.into()
    }

    /// Byte-level boundary: JSON request in, JSON response out
    pub async fn dispatch_json(&self, payload: &str) -> Result<String> {
        let request: HandlerRequest<H::Model> = serde_json::from_str(payload)?;
        let response = self.dispatch(request).await;
        Ok(serde_json::to_string(&response)?)
    }
}
