//! `AWS::Redshift::EndpointAccess` handlers

pub mod model;
pub mod steps;

pub use model::EndpointAccess;

use crate::codes;
use async_trait::async_trait;
use redflow_config::HandlerSettings;
use redflow_handler::{
    ClassifiedFault, FailureClassifier, FaultTable, HandlerContext, ListPage, Operation,
    RemoteRequest, ResourceHandlers, StepChain,
};
use serde_json::{Value, json};
use steps::{CreateEndpointAccess, DeleteEndpointAccess, DescribeEndpointAccess, ModifyEndpointAccess};

pub struct EndpointAccessHandlers {
    settings: HandlerSettings,
    classifier: FaultTable,
}

impl EndpointAccessHandlers {
    pub const TYPE_NAME: &'static str = "AWS::Redshift::EndpointAccess";

    pub fn new(settings: HandlerSettings) -> Self {
        Self {
            settings,
            classifier: codes::endpoint_faults(),
        }
    }
}

#[async_trait]
impl ResourceHandlers for EndpointAccessHandlers {
    type Model = EndpointAccess;

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn classifier(&self) -> &dyn FailureClassifier {
        &self.classifier
    }

    fn validate(&self, operation: Operation, model: &EndpointAccess) -> Result<(), String> {
        if model.endpoint_name.is_none() {
            return Err("EndpointName is required".to_string());
        }
        if operation == Operation::Create
            && (model.cluster_identifier.is_none() || model.subnet_group_name.is_none())
        {
            return Err("ClusterIdentifier and SubnetGroupName are required".to_string());
        }
        Ok(())
    }

    fn chain(&self, operation: Operation) -> Option<StepChain<EndpointAccess>> {
        let config = self.settings.chain_config();
        let chain = match operation {
            Operation::Create => StepChain::new("create", config)
                .step(CreateEndpointAccess)
                .step(DescribeEndpointAccess),
            Operation::Update => StepChain::new("update", config)
                .step(ModifyEndpointAccess)
                .step(DescribeEndpointAccess),
            Operation::Delete => {
                StepChain::new("delete", config.deleting()).step(DeleteEndpointAccess)
            }
            Operation::Read => StepChain::new("read", config).step(DescribeEndpointAccess),
            Operation::List => return None,
        };
        Some(chain)
    }

    async fn list(
        &self,
        ctx: &HandlerContext<'_>,
        next_token: Option<&str>,
    ) -> Result<ListPage<EndpointAccess>, ClassifiedFault> {
        let mut payload = json!({});
        if let Some(marker) = next_token {
            payload["Marker"] = json!(marker);
        }
        let response = ctx
            .invoker
            .call(&RemoteRequest::new("DescribeEndpointAccess", payload))
            .await?;
        Ok(ListPage {
            models: model::endpoints_from_page(&response),
            next_token: response
                .get("Marker")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}
