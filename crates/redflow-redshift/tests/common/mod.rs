#![allow(dead_code)]

use async_trait::async_trait;
use redflow_config::HandlerSettings;
use redflow_handler::{
    Fault, HandlerRequest, HandlerResponse, LifecycleDispatcher, OperationStatus, ProgressRecord,
    RemoteClient, RemoteRequest, ResourceHandlers,
};
use redflow_redshift::{Cluster, ClusterHandlers, ResourceScope};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const CLUSTER_ID: &str = "analytics";
pub const NAMESPACE_ARN: &str = "arn:aws:redshift:us-east-1:123456789012:namespace:4b2f";
pub const CLUSTER_ARN: &str = "arn:aws:redshift:us-east-1:123456789012:cluster:analytics";

const MAX_PASSES: usize = 50;

pub fn cluster_description(status: &str) -> Value {
    json!({
        "ClusterIdentifier": CLUSTER_ID,
        "ClusterStatus": status,
        "NodeType": "ra3.xlplus",
        "NumberOfNodes": 2,
        "MasterUsername": "admin",
        "DBName": "dev",
        "ClusterVersion": "1.0",
        "Endpoint": { "Address": "analytics.abc.us-east-1.redshift.amazonaws.com", "Port": 5439 },
        "ClusterNamespaceArn": NAMESPACE_ARN,
        "Tags": [],
        "PendingModifiedValues": {}
    })
}

pub fn described(status: &str) -> Result<Value, Fault> {
    Ok(cluster_description(status))
}

pub fn cluster_page(status: &str) -> Result<Value, Fault> {
    Ok(json!({ "Clusters": [cluster_description(status)] }))
}

pub fn cluster_not_found() -> Result<Value, Fault> {
    Err(Fault::new("ClusterNotFoundFault", "Cluster analytics not found.").with_status(404))
}

pub fn policy_not_found() -> Result<Value, Fault> {
    Err(Fault::new(
        "ResourceNotFoundException",
        "The resource policy for analytics was not found.",
    )
    .with_status(404))
}

pub fn logging_status(enabled: bool) -> Result<Value, Fault> {
    if enabled {
        Ok(json!({ "LoggingEnabled": true, "BucketName": "audit-logs", "S3KeyPrefix": "redshift/" }))
    } else {
        Ok(json!({ "LoggingEnabled": false }))
    }
}

/// Redshift stand-in answering from per-operation scripts
///
/// The last scripted answer of a queue repeats forever. Unscripted cluster
/// reads answer as an available cluster without logging or policy.
pub struct FakeRedshift {
    calls: Mutex<Vec<String>>,
    requests: Mutex<Vec<RemoteRequest>>,
    invocations: Mutex<HashMap<String, VecDeque<Result<Value, Fault>>>>,
    describes: Mutex<VecDeque<Result<Value, Fault>>>,
}

impl FakeRedshift {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            invocations: Mutex::new(HashMap::new()),
            describes: Mutex::new(VecDeque::from([described("available")])),
        }
        .on_invoke("DescribeClusters", vec![cluster_page("available")])
        .on_invoke("DescribeLoggingStatus", vec![logging_status(false)])
        .on_invoke("GetResourcePolicy", vec![policy_not_found()])
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

    /// Operation names and `describe:<id>` entries, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == operation).count()
    }

    /// Last request issued for an operation
    pub fn request(&self, operation: &str) -> Option<RemoteRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|request| request.operation == operation)
            .cloned()
    }

    pub fn position(&self, operation: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.as_str() == operation)
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
impl RemoteClient for FakeRedshift {
    async fn invoke(&self, request: &RemoteRequest) -> Result<Value, Fault> {
        self.calls.lock().unwrap().push(request.operation.clone());
        self.requests.lock().unwrap().push(request.clone());
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
        Self::next(&mut describes).unwrap_or_else(|| described("available"))
    }
}

pub fn scope() -> ResourceScope {
    ResourceScope::new("aws", "us-east-1", "123456789012")
}

pub fn cluster_handlers() -> ClusterHandlers {
    ClusterHandlers::new(HandlerSettings::default(), scope())
}

/// A new cluster with every property CreateCluster requires
pub fn new_cluster() -> Cluster {
    let mut cluster = Cluster::new(CLUSTER_ID);
    cluster.master_username = Some("admin".to_string());
    cluster.master_user_password = Some("Secret123".to_string());
    cluster.node_type = Some("ra3.xlplus".to_string());
    cluster.number_of_nodes = Some(2);
    cluster
}

/// Re-invoke until the operation leaves `InProgress`
///
/// Progress travels through its JSON form between passes, like it would
/// through the scheduler. Returns the final response and every delay handed
/// out on the way.
pub async fn drive<H: ResourceHandlers>(
    dispatcher: &LifecycleDispatcher<'_, H>,
    mut request: HandlerRequest<H::Model>,
) -> (HandlerResponse<H::Model>, Vec<u64>) {
    let mut delays = Vec::new();
    for _ in 0..MAX_PASSES {
        let response = dispatcher.dispatch(request.clone()).await;
        if response.status != OperationStatus::InProgress {
            return (response, delays);
        }
        delays.push(response.callback_delay_seconds);
        let json = response
            .progress
            .as_ref()
            .expect("in-progress response carries progress")
            .to_json()
            .unwrap();
        request.progress = Some(ProgressRecord::from_json(&json).unwrap());
    }
    panic!("operation still in progress after {} passes", MAX_PASSES);
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
