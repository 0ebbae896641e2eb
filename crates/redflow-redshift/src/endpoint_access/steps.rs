//! Endpoint access chain steps

use super::model::{EndpointAccess, first_endpoint};
use redflow_handler::diff;
use redflow_handler::{Observation, ProgressRecord, RemoteRequest, Stabilization, Step, Target};
use serde_json::{Value, json};

const ACTIVE: &str = "active";

fn endpoint_status(description: &Value) -> Option<&str> {
    description.get("EndpointStatus").and_then(Value::as_str)
}

fn security_groups_differ(target: Target<'_, EndpointAccess>) -> bool {
    target.previous.is_none_or(|previous| {
        !diff::set_eq(target.desired.security_groups(), previous.security_groups())
    })
}

pub struct CreateEndpointAccess;

impl CreateEndpointAccess {
    pub const NAME: &'static str = "create-endpoint-access";
}

impl Step<EndpointAccess> for CreateEndpointAccess {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn build_request(
        &self,
        target: Target<'_, EndpointAccess>,
        _: &ProgressRecord<EndpointAccess>,
    ) -> RemoteRequest {
        let endpoint = target.desired;
        let mut payload = json!({
            "EndpointName": endpoint.name(),
            "ClusterIdentifier": endpoint.cluster_identifier,
            "SubnetGroupName": endpoint.subnet_group_name,
            "VpcSecurityGroupIds": endpoint.security_groups(),
        });
        if let Some(owner) = &endpoint.resource_owner {
            payload["ResourceOwner"] = json!(owner);
        }
        RemoteRequest::new("CreateEndpointAccess", payload)
    }

    fn stabilization(
        &self,
        target: Target<'_, EndpointAccess>,
        _: &ProgressRecord<EndpointAccess>,
    ) -> Option<Stabilization> {
        Some(Stabilization::describe(target.desired.name()))
    }

    fn is_stable(&self, observation: Observation<'_>, _: Target<'_, EndpointAccess>) -> bool {
        matches!(observation, Observation::Present(description) if endpoint_status(description) == Some(ACTIVE))
    }
}

/// Replaces the endpoint's security groups when the set changed
pub struct ModifyEndpointAccess;

impl ModifyEndpointAccess {
    pub const NAME: &'static str = "modify-endpoint-access";
}

impl Step<EndpointAccess> for ModifyEndpointAccess {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(
        &self,
        target: Target<'_, EndpointAccess>,
        _: &ProgressRecord<EndpointAccess>,
    ) -> bool {
        security_groups_differ(target)
    }

    fn build_request(
        &self,
        target: Target<'_, EndpointAccess>,
        _: &ProgressRecord<EndpointAccess>,
    ) -> RemoteRequest {
        RemoteRequest::new(
            "ModifyEndpointAccess",
            json!({
                "EndpointName": target.desired.name(),
                "VpcSecurityGroupIds": target.desired.security_groups(),
            }),
        )
    }

    fn stabilization(
        &self,
        target: Target<'_, EndpointAccess>,
        _: &ProgressRecord<EndpointAccess>,
    ) -> Option<Stabilization> {
        Some(Stabilization::describe(target.desired.name()))
    }

    fn is_stable(&self, observation: Observation<'_>, target: Target<'_, EndpointAccess>) -> bool {
        let Observation::Present(description) = observation else {
            return false;
        };
        let reported = EndpointAccess::from_description(description);
        endpoint_status(description) == Some(ACTIVE)
            && diff::set_eq(reported.security_groups(), target.desired.security_groups())
    }
}

pub struct DeleteEndpointAccess;

impl DeleteEndpointAccess {
    pub const NAME: &'static str = "delete-endpoint-access";
}

impl Step<EndpointAccess> for DeleteEndpointAccess {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn build_request(
        &self,
        target: Target<'_, EndpointAccess>,
        _: &ProgressRecord<EndpointAccess>,
    ) -> RemoteRequest {
        RemoteRequest::new(
            "DeleteEndpointAccess",
            json!({ "EndpointName": target.desired.name() }),
        )
    }

    fn stabilization(
        &self,
        target: Target<'_, EndpointAccess>,
        _: &ProgressRecord<EndpointAccess>,
    ) -> Option<Stabilization> {
        Some(Stabilization::describe(target.desired.name()))
    }

    fn is_stable(&self, observation: Observation<'_>, _: Target<'_, EndpointAccess>) -> bool {
        matches!(observation, Observation::Absent)
    }
}

pub struct DescribeEndpointAccess;

impl DescribeEndpointAccess {
    pub const NAME: &'static str = "describe-endpoint-access";
}

impl Step<EndpointAccess> for DescribeEndpointAccess {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn build_request(
        &self,
        target: Target<'_, EndpointAccess>,
        _: &ProgressRecord<EndpointAccess>,
    ) -> RemoteRequest {
        RemoteRequest::new(
            "DescribeEndpointAccess",
            json!({ "EndpointName": target.desired.name() }),
        )
    }

    fn capture(&self, response: &Value, progress: &mut ProgressRecord<EndpointAccess>) {
        match first_endpoint(response) {
            Some(description) => {
                progress.resource_model = Some(EndpointAccess::from_description(description));
            }
            None => tracing::warn!("DescribeEndpointAccess returned no endpoint"),
        }
    }
}
