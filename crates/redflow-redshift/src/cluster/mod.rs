//! `AWS::Redshift::Cluster` handlers
//!
//! | Operation | Chain |
//! |---|---|
//! | Create | create-cluster or restore-from-snapshot, create-tags, enable-logging, configure-aqua, resolve-namespace, put-resource-policy, read-back |
//! | Update | modify-cluster, delete-tags, create-tags, disable-logging, enable-logging, configure-aqua, resolve-namespace, put-resource-policy, delete-resource-policy, read-back |
//! | Delete | delete-resource-policy, delete-cluster |
//! | Read | describe-cluster, describe-logging-status, get-resource-policy |
//!
//! Read-back is the Read chain appended to Create and Update.

pub mod model;
pub mod steps;
pub mod translate;

pub use model::{Cluster, Endpoint, LoggingProperties, Tag};

use crate::codes;
use crate::scope::ResourceScope;
use async_trait::async_trait;
use redflow_config::HandlerSettings;
use redflow_handler::{
    ClassifiedFault, FailureClassifier, FaultTable, HandlerContext, ListPage, Operation,
    ResourceHandlers, StepChain,
};
use serde_json::Value;
use steps::*;

pub struct ClusterHandlers {
    settings: HandlerSettings,
    scope: ResourceScope,
    classifier: FaultTable,
}

impl ClusterHandlers {
    pub const TYPE_NAME: &'static str = "AWS::Redshift::Cluster";

    pub fn new(settings: HandlerSettings, scope: ResourceScope) -> Self {
        Self {
            settings,
            scope,
            classifier: codes::cluster_faults(),
        }
    }

    fn read_back(chain: StepChain<Cluster>) -> StepChain<Cluster> {
        chain
            .step(DescribeCluster)
            .step(DescribeLoggingStatus)
            .step(GetResourcePolicy)
    }

    pub fn create_chain(&self) -> StepChain<Cluster> {
        let cool_down_seconds = self.settings.cool_down_seconds;
        let chain = StepChain::new("create", self.settings.chain_config())
            .step(CreateCluster { cool_down_seconds })
            .step(RestoreFromSnapshot { cool_down_seconds })
            .step(CreateTags {
                scope: self.scope.clone(),
            })
            .step(EnableLogging)
            .step(ConfigureAqua {
                min_observations: self.settings.aqua_min_observations,
                polling: self.settings.modification,
            })
            .step(ResolveNamespace)
            .step(PutResourcePolicy);
        Self::read_back(chain)
    }

    pub fn update_chain(&self) -> StepChain<Cluster> {
        let chain = StepChain::new("update", self.settings.chain_config())
            .step(ModifyCluster {
                patch_min_observations: self.settings.patch_min_observations,
                polling: self.settings.modification,
            })
            .step(DeleteTags {
                scope: self.scope.clone(),
            })
            .step(CreateTags {
                scope: self.scope.clone(),
            })
            .step(DisableLogging)
            .step(EnableLogging)
            .step(ConfigureAqua {
                min_observations: self.settings.aqua_min_observations,
                polling: self.settings.modification,
            })
            .step(ResolveNamespace)
            .step(PutResourcePolicy)
            .step(DeleteResourcePolicy);
        Self::read_back(chain)
    }

    pub fn delete_chain(&self) -> StepChain<Cluster> {
        StepChain::new("delete", self.settings.chain_config().deleting())
            .step(DeleteResourcePolicy)
            .step(DeleteCluster {
                settle: self.settings.settle(),
            })
    }

    pub fn read_chain(&self) -> StepChain<Cluster> {
        Self::read_back(StepChain::new("read", self.settings.chain_config()))
    }
}

#[async_trait]
impl ResourceHandlers for ClusterHandlers {
    type Model = Cluster;

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn classifier(&self) -> &dyn FailureClassifier {
        &self.classifier
    }

    fn validate(&self, operation: Operation, model: &Cluster) -> Result<(), String> {
        if model.cluster_identifier.is_none() {
            return Err("ClusterIdentifier is required".to_string());
        }
        if operation == Operation::Create && !model.is_restore() {
            let missing: Vec<&str> = [
                ("MasterUsername", model.master_username.is_none()),
                ("MasterUserPassword", model.master_user_password.is_none()),
                ("NodeType", model.node_type.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            if !missing.is_empty() {
                return Err(format!(
                    "Missing required properties for a new cluster: {}",
                    missing.join(", ")
                ));
            }
        }
        Ok(())
    }

    fn chain(&self, operation: Operation) -> Option<StepChain<Cluster>> {
        match operation {
            Operation::Create => Some(self.create_chain()),
            Operation::Read => Some(self.read_chain()),
            Operation::Update => Some(self.update_chain()),
            Operation::Delete => Some(self.delete_chain()),
            Operation::List => None,
        }
    }

    async fn list(
        &self,
        ctx: &HandlerContext<'_>,
        next_token: Option<&str>,
    ) -> Result<ListPage<Cluster>, ClassifiedFault> {
        let response = ctx
            .invoker
            .call(&translate::describe_clusters(None, next_token))
            .await?;
        let models = translate::clusters_from_page(&response)
            .into_iter()
            .filter_map(|cluster| cluster.cluster_identifier)
            .map(Cluster::new)
            .collect();
        Ok(ListPage {
            models,
            next_token: response
                .get("Marker")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}
