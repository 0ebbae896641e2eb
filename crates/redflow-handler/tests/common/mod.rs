#![allow(dead_code)]

use async_trait::async_trait;
use redflow_handler::{
    ClassifiedFault, Completion, FailureKind, Fault, FaultTable, HandlerContext, Observation,
    ProgressRecord, RemoteClient, RemoteInvoker, RemoteRequest, Resource, Stabilization, Step,
    Target, diff,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub size: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl Resource for Widget {
    fn identifier(&self) -> Option<&str> {
        Some(&self.id)
    }
}

pub fn widget(size: u32) -> Widget {
    Widget {
        id: "w-1".to_string(),
        size,
        tags: Vec::new(),
        label: None,
    }
}

pub fn available() -> Result<Value, Fault> {
    Ok(json!({ "Status": "available", "Label": "observed" }))
}

pub fn creating() -> Result<Value, Fault> {
    Ok(json!({ "Status": "creating" }))
}

pub fn not_found() -> Result<Value, Fault> {
    Err(Fault::new("WidgetNotFound", "Widget w-1 not found").with_status(404))
}

/// Remote client answering from per-operation scripts
///
/// The last scripted answer of a queue repeats forever.
#[derive(Default)]
pub struct ScriptedClient {
    calls: Mutex<Vec<String>>,
    invocations: Mutex<HashMap<String, VecDeque<Result<Value, Fault>>>>,
    describes: Mutex<VecDeque<Result<Value, Fault>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_invoke(self, operation: &str, answers: Vec<Result<Value, Fault>>) -> Self {
        self.invocations
            .lock()
            .unwrap()
            .insert(operation.to_string(), answers.into());
        self
    }

    pub fn on_describe(self, answers: Vec<Result<Value, Fault>>) -> Self {
        *self.describes.lock().unwrap() = answers.into();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    fn next(queue: &mut VecDeque<Result<Value, Fault>>) -> Option<Result<Value, Fault>> {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl RemoteClient for ScriptedClient {
    async fn invoke(&self, request: &RemoteRequest) -> Result<Value, Fault> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("invoke:{}", request.operation));
        let mut invocations = self.invocations.lock().unwrap();
        match invocations.get_mut(&request.operation) {
            Some(queue) => Self::next(queue).unwrap_or_else(|| Ok(json!({}))),
            None => Ok(json!({})),
        }
    }

    async fn describe(&self, resource_id: &str) -> Result<Value, Fault> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("describe:{}", resource_id));
        let mut describes = self.describes.lock().unwrap();
        Self::next(&mut describes).unwrap_or_else(available)
    }
}

pub fn classifier() -> FaultTable {
    FaultTable::common()
        .terminal(&["WidgetNotFound"], FailureKind::NotFound)
        .terminal(&["WidgetAlreadyExists"], FailureKind::AlreadyExists)
}

pub fn context<'a>(client: &'a ScriptedClient, classifier: &'a FaultTable) -> HandlerContext<'a> {
    HandlerContext::new(
        RemoteInvoker::new(client, classifier),
        tracing::info_span!("test"),
    )
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Debug, Clone, Copy)]
pub enum Gate {
    Always,
    SizeChanged,
    TagsChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Available,
    Gone,
}

/// Configurable step used to exercise the chain
pub struct TestStep {
    pub name: &'static str,
    pub operation: &'static str,
    pub gate: Gate,
    pub expect: Option<Expect>,
    pub min_observations: u32,
    pub cool_down: Option<u64>,
    pub settle: Option<Duration>,
    pub tolerate: Option<FailureKind>,
}

impl TestStep {
    pub fn new(name: &'static str, operation: &'static str) -> Self {
        Self {
            name,
            operation,
            gate: Gate::Always,
            expect: None,
            min_observations: 1,
            cool_down: None,
            settle: None,
            tolerate: None,
        }
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    pub fn stabilize(mut self, expect: Expect) -> Self {
        self.expect = Some(expect);
        self
    }

    pub fn observations(mut self, min: u32) -> Self {
        self.min_observations = min;
        self
    }

    pub fn cool_down(mut self, seconds: u64) -> Self {
        self.cool_down = Some(seconds);
        self
    }

    pub fn settle(mut self, wait: Duration) -> Self {
        self.settle = Some(wait);
        self
    }

    pub fn tolerate(mut self, kind: FailureKind) -> Self {
        self.tolerate = Some(kind);
        self
    }
}

impl Step<Widget> for TestStep {
    fn name(&self) -> &'static str {
        self.name
    }

    fn should_run(&self, target: Target<'_, Widget>, _progress: &ProgressRecord<Widget>) -> bool {
        match self.gate {
            Gate::Always => true,
            Gate::SizeChanged => diff::value_changed(target.desired, target.previous, |w: &Widget| w.size),
            Gate::TagsChanged => match target.previous {
                None => true,
                Some(previous) => !diff::set_eq(&target.desired.tags, &previous.tags),
            },
        }
    }

    fn build_request(
        &self,
        target: Target<'_, Widget>,
        _progress: &ProgressRecord<Widget>,
    ) -> RemoteRequest {
        RemoteRequest::new(
            self.operation,
            json!({ "Id": target.desired.id, "Size": target.desired.size }),
        )
    }

    fn capture(&self, response: &Value, progress: &mut ProgressRecord<Widget>) {
        if let Some(arn) = response.get("Arn").and_then(Value::as_str) {
            progress.remember("arn", arn);
        }
    }

    fn stabilization(
        &self,
        target: Target<'_, Widget>,
        _progress: &ProgressRecord<Widget>,
    ) -> Option<Stabilization> {
        self.expect.map(|_| {
            Stabilization::describe(target.desired.id.clone())
                .with_min_observations(self.min_observations)
        })
    }

    fn is_stable(&self, observation: Observation<'_>, _target: Target<'_, Widget>) -> bool {
        match (self.expect, observation) {
            (Some(Expect::Gone), Observation::Absent) => true,
            (Some(Expect::Available), Observation::Present(state)) => {
                state.get("Status").and_then(Value::as_str) == Some("available")
            }
            _ => false,
        }
    }

    fn on_complete(
        &self,
        observed: Option<&Value>,
        progress: &mut ProgressRecord<Widget>,
    ) -> Completion {
        let label = observed
            .and_then(|state| state.get("Label"))
            .and_then(Value::as_str);
        if let (Some(label), Some(model)) = (label, progress.resource_model.as_mut()) {
            model.label = Some(label.to_string());
        }
        match self.cool_down {
            Some(seconds) => Completion::CoolDown(seconds),
            None => Completion::Advance,
        }
    }

    fn settle(&self, _progress: &ProgressRecord<Widget>) -> Option<Duration> {
        self.settle
    }

    fn suppress(&self, fault: &ClassifiedFault, _target: Target<'_, Widget>) -> bool {
        self.tolerate == Some(fault.kind())
    }
}
