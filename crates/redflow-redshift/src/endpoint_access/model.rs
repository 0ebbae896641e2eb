//! Endpoint access resource model

use redflow_handler::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `AWS::Redshift::EndpointAccess`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointAccess {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_identifier: Option<String>,

    /// Account that owns the cluster, for cross-account endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_group_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_security_group_ids: Option<Vec<String>>,

    // Read-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_status: Option<String>,
}

impl Resource for EndpointAccess {
    fn identifier(&self) -> Option<&str> {
        self.endpoint_name.as_deref()
    }
}

impl EndpointAccess {
    pub fn new(endpoint_name: impl Into<String>) -> Self {
        Self {
            endpoint_name: Some(endpoint_name.into()),
            ..Default::default()
        }
    }

    /// # Panics
    ///
    /// Panics when the name is missing; handlers reject such models first.
    pub fn name(&self) -> &str {
        match self.endpoint_name.as_deref() {
            Some(name) => name,
            None => panic!("endpoint model without EndpointName reached a step"),
        }
    }

    pub fn security_groups(&self) -> &[String] {
        self.vpc_security_group_ids.as_deref().unwrap_or_default()
    }

    /// Model of what a DescribeEndpointAccess entry reports
    pub fn from_description(description: &Value) -> Self {
        let string = |key: &str| {
            description
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            endpoint_name: string("EndpointName"),
            cluster_identifier: string("ClusterIdentifier"),
            resource_owner: string("ResourceOwner"),
            subnet_group_name: string("SubnetGroupName"),
            vpc_security_group_ids: description
                .get("VpcSecurityGroups")
                .and_then(Value::as_array)
                .map(|groups| {
                    groups
                        .iter()
                        .filter_map(|group| group.get("VpcSecurityGroupId").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                }),
            address: string("Address"),
            port: description
                .get("Port")
                .and_then(Value::as_u64)
                .and_then(|port| u16::try_from(port).ok()),
            endpoint_status: string("EndpointStatus"),
        }
    }
}

/// First entry of a DescribeEndpointAccess page, or a bare description
pub fn first_endpoint(response: &Value) -> Option<&Value> {
    match response.get("EndpointAccessList") {
        Some(list) => list.get(0),
        None => response.get("EndpointName").map(|_| response),
    }
}

pub fn endpoints_from_page(response: &Value) -> Vec<EndpointAccess> {
    response
        .get("EndpointAccessList")
        .and_then(Value::as_array)
        .map(|list| list.iter().map(EndpointAccess::from_description).collect())
        .unwrap_or_default()
}
