//! Cluster model to Redshift API payloads and back

use super::model::{Cluster, Endpoint, LoggingProperties, Tag, modified_attributes};
use redflow_handler::RemoteRequest;
use serde_json::{Map, Value, json};

/// Drop null members so unset model fields never reach the wire
fn compact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, member)| !member.is_null())
                .collect(),
        ),
        other => other,
    }
}

pub fn create_cluster(cluster: &Cluster) -> RemoteRequest {
    RemoteRequest::new(
        "CreateCluster",
        compact(json!({
            "ClusterIdentifier": cluster.cluster_identifier,
            "MasterUsername": cluster.master_username,
            "MasterUserPassword": cluster.master_user_password,
            "NodeType": cluster.node_type,
            "NumberOfNodes": cluster.number_of_nodes,
            "ClusterType": cluster.cluster_type,
            "DBName": cluster.db_name,
            "ClusterVersion": cluster.cluster_version,
            "AllowVersionUpgrade": cluster.allow_version_upgrade,
            "MaintenanceTrackName": cluster.maintenance_track_name,
            "Port": cluster.port,
            "PubliclyAccessible": cluster.publicly_accessible,
            "Encrypted": cluster.encrypted,
            "KmsKeyId": cluster.kms_key_id,
            "IamRoles": cluster.iam_roles,
            "VpcSecurityGroupIds": cluster.vpc_security_group_ids,
            "AquaConfigurationStatus": cluster.aqua_configuration_status,
            "Tags": cluster.tags,
        })),
    )
}

/// Restore does not accept tags or AQUA settings; later steps apply them
pub fn restore_from_snapshot(cluster: &Cluster) -> RemoteRequest {
    RemoteRequest::new(
        "RestoreFromClusterSnapshot",
        compact(json!({
            "ClusterIdentifier": cluster.cluster_identifier,
            "SnapshotIdentifier": cluster.snapshot_identifier,
            "SnapshotClusterIdentifier": cluster.snapshot_cluster_identifier,
            "OwnerAccount": cluster.owner_account,
            "NodeType": cluster.node_type,
            "NumberOfNodes": cluster.number_of_nodes,
            "AllowVersionUpgrade": cluster.allow_version_upgrade,
            "MaintenanceTrackName": cluster.maintenance_track_name,
            "Port": cluster.port,
            "PubliclyAccessible": cluster.publicly_accessible,
            "KmsKeyId": cluster.kms_key_id,
            "IamRoles": cluster.iam_roles,
            "VpcSecurityGroupIds": cluster.vpc_security_group_ids,
        })),
    )
}

/// ModifyCluster carrying only the attributes that changed
pub fn modify_cluster(desired: &Cluster, previous: &Cluster) -> RemoteRequest {
    let mut payload = Map::new();
    payload.insert("ClusterIdentifier".into(), json!(desired.id()));

    for name in modified_attributes(desired, previous) {
        let (key, value) = match name {
            "node_type" => ("NodeType", json!(desired.node_type)),
            "number_of_nodes" => ("NumberOfNodes", json!(desired.number_of_nodes)),
            "cluster_type" => ("ClusterType", json!(desired.cluster_type)),
            "cluster_version" => ("ClusterVersion", json!(desired.cluster_version)),
            "allow_version_upgrade" => {
                ("AllowVersionUpgrade", json!(desired.allow_version_upgrade))
            }
            "maintenance_track_name" => {
                ("MaintenanceTrackName", json!(desired.maintenance_track_name))
            }
            "master_user_password" => ("MasterUserPassword", json!(desired.master_user_password)),
            "port" => ("Port", json!(desired.port)),
            "publicly_accessible" => ("PubliclyAccessible", json!(desired.publicly_accessible)),
            "encrypted" => ("Encrypted", json!(desired.encrypted)),
            "kms_key_id" => ("KmsKeyId", json!(desired.kms_key_id)),
            // unset lists are left alone rather than cleared
            "iam_roles" => ("IamRoles", json!(desired.iam_roles)),
            "vpc_security_group_ids" => {
                ("VpcSecurityGroupIds", json!(desired.vpc_security_group_ids))
            }
            other => {
                tracing::debug!("No ModifyCluster member for {}", other);
                continue;
            }
        };
        payload.insert(key.into(), value);
    }

    RemoteRequest::new("ModifyCluster", compact(Value::Object(payload)))
}

pub fn delete_cluster(cluster_identifier: &str) -> RemoteRequest {
    RemoteRequest::new(
        "DeleteCluster",
        json!({
            "ClusterIdentifier": cluster_identifier,
            "SkipFinalClusterSnapshot": true,
        }),
    )
}

pub fn describe_clusters(cluster_identifier: Option<&str>, marker: Option<&str>) -> RemoteRequest {
    RemoteRequest::new(
        "DescribeClusters",
        compact(json!({
            "ClusterIdentifier": cluster_identifier,
            "Marker": marker,
        })),
    )
}

pub fn create_tags(resource_arn: &str, tags: &[&Tag]) -> RemoteRequest {
    RemoteRequest::new(
        "CreateTags",
        json!({ "ResourceName": resource_arn, "Tags": tags }),
    )
}

pub fn delete_tags(resource_arn: &str, keys: &[&str]) -> RemoteRequest {
    RemoteRequest::new(
        "DeleteTags",
        json!({ "ResourceName": resource_arn, "TagKeys": keys }),
    )
}

pub fn enable_logging(cluster_identifier: &str, logging: &LoggingProperties) -> RemoteRequest {
    RemoteRequest::new(
        "EnableLogging",
        compact(json!({
            "ClusterIdentifier": cluster_identifier,
            "BucketName": logging.bucket_name,
            "S3KeyPrefix": logging.s3_key_prefix,
            "LogDestinationType": logging.log_destination_type,
            "LogExports": logging.log_exports,
        })),
    )
}

pub fn disable_logging(cluster_identifier: &str) -> RemoteRequest {
    RemoteRequest::new(
        "DisableLogging",
        json!({ "ClusterIdentifier": cluster_identifier }),
    )
}

pub fn describe_logging_status(cluster_identifier: &str) -> RemoteRequest {
    RemoteRequest::new(
        "DescribeLoggingStatus",
        json!({ "ClusterIdentifier": cluster_identifier }),
    )
}

pub fn modify_aqua_configuration(cluster_identifier: &str, status: &str) -> RemoteRequest {
    RemoteRequest::new(
        "ModifyAquaConfiguration",
        json!({
            "ClusterIdentifier": cluster_identifier,
            "AquaConfigurationStatus": status,
        }),
    )
}

/// The service expects the policy document as a JSON string
pub fn put_resource_policy(namespace_arn: &str, policy: &Value) -> RemoteRequest {
    let document = match policy {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    RemoteRequest::new(
        "PutResourcePolicy",
        json!({ "ResourceArn": namespace_arn, "Policy": document }),
    )
}

pub fn get_resource_policy(namespace_arn: &str) -> RemoteRequest {
    RemoteRequest::new("GetResourcePolicy", json!({ "ResourceArn": namespace_arn }))
}

pub fn delete_resource_policy(namespace_arn: &str) -> RemoteRequest {
    RemoteRequest::new(
        "DeleteResourcePolicy",
        json!({ "ResourceArn": namespace_arn }),
    )
}

/// First cluster of a DescribeClusters page, or a bare cluster description
pub fn first_cluster(response: &Value) -> Option<&Value> {
    match response.get("Clusters") {
        Some(clusters) => clusters.get(0),
        None => response.get("ClusterIdentifier").map(|_| response),
    }
}

/// Namespace ARN from a create/restore/describe response
pub fn namespace_arn(response: &Value) -> Option<&str> {
    response
        .get("Cluster")
        .unwrap_or(response)
        .get("ClusterNamespaceArn")
        .and_then(Value::as_str)
        .or_else(|| first_cluster(response)?.get("ClusterNamespaceArn")?.as_str())
}

pub fn cluster_status(description: &Value) -> Option<&str> {
    description.get("ClusterStatus").and_then(Value::as_str)
}

/// Whether the cluster has modifications the service has not applied yet
pub fn has_pending_modifications(description: &Value) -> bool {
    description
        .get("PendingModifiedValues")
        .and_then(Value::as_object)
        .is_some_and(|pending| !pending.is_empty())
}

pub fn aqua_status(description: &Value) -> Option<&str> {
    description
        .get("AquaConfiguration")
        .and_then(|aqua| aqua.get("AquaStatus"))
        .and_then(Value::as_str)
}

fn string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn strings_from(value: &Value, list: &str, member: &str) -> Option<Vec<String>> {
    let items = value.get(list)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.get(member).and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
    )
}

/// Model of the attributes a cluster description reports
pub fn cluster_from_description(description: &Value) -> Cluster {
    let endpoint = description.get("Endpoint").map(|endpoint| Endpoint {
        address: string(endpoint, "Address"),
        port: endpoint
            .get("Port")
            .and_then(Value::as_u64)
            .and_then(|port| u16::try_from(port).ok()),
    });
    let number_of_nodes = description
        .get("NumberOfNodes")
        .and_then(Value::as_u64)
        .and_then(|nodes| u32::try_from(nodes).ok());
    let tags = description.get("Tags").and_then(|tags| {
        serde_json::from_value::<Vec<Tag>>(tags.clone())
            .map_err(|e| tracing::debug!("Ignoring unreadable tags: {}", e))
            .ok()
    });

    Cluster {
        cluster_identifier: string(description, "ClusterIdentifier"),
        master_username: string(description, "MasterUsername"),
        node_type: string(description, "NodeType"),
        number_of_nodes,
        cluster_type: number_of_nodes
            .map(|nodes| if nodes > 1 { "multi-node" } else { "single-node" })
            .map(str::to_string),
        db_name: string(description, "DBName"),
        cluster_version: string(description, "ClusterVersion"),
        allow_version_upgrade: description.get("AllowVersionUpgrade").and_then(Value::as_bool),
        maintenance_track_name: string(description, "MaintenanceTrackName"),
        port: endpoint.as_ref().and_then(|endpoint| endpoint.port),
        publicly_accessible: description.get("PubliclyAccessible").and_then(Value::as_bool),
        encrypted: description.get("Encrypted").and_then(Value::as_bool),
        kms_key_id: string(description, "KmsKeyId"),
        iam_roles: strings_from(description, "IamRoles", "IamRoleArn"),
        vpc_security_group_ids: strings_from(description, "VpcSecurityGroups", "VpcSecurityGroupId"),
        tags,
        aqua_configuration_status: description
            .get("AquaConfiguration")
            .and_then(|aqua| string(aqua, "AquaConfigurationStatus")),
        endpoint,
        cluster_namespace_arn: string(description, "ClusterNamespaceArn"),
        ..Default::default()
    }
}

/// Refresh `model` from a description, keeping what the service never returns
///
/// Logging and the resource policy are cleared; their own reads fill them in.
pub fn apply_description(model: &mut Cluster, description: &Value) {
    let mut described = cluster_from_description(description);
    described.master_user_password = model.master_user_password.take();
    described.snapshot_identifier = model.snapshot_identifier.take();
    described.snapshot_cluster_identifier = model.snapshot_cluster_identifier.take();
    described.owner_account = model.owner_account.take();
    if described.cluster_identifier.is_none() {
        described.cluster_identifier = model.cluster_identifier.take();
    }
    *model = described;
}

/// Logging destination from a DescribeLoggingStatus response
pub fn logging_from_status(status: &Value) -> Option<LoggingProperties> {
    if !status.get("LoggingEnabled").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    Some(LoggingProperties {
        bucket_name: string(status, "BucketName"),
        s3_key_prefix: string(status, "S3KeyPrefix"),
        log_destination_type: string(status, "LogDestinationType"),
        log_exports: status
            .get("LogExports")
            .and_then(|exports| serde_json::from_value(exports.clone()).ok()),
    })
}

pub fn logging_enabled(status: &Value) -> bool {
    status.get("LoggingEnabled").and_then(Value::as_bool).unwrap_or(false)
}

/// Policy document from a GetResourcePolicy response
pub fn policy_from_response(response: &Value) -> Option<Value> {
    let policy = response.get("ResourcePolicy")?.get("Policy")?;
    match policy {
        Value::String(text) => Some(serde_json::from_str(text).unwrap_or_else(|_| policy.clone())),
        other => Some(other.clone()),
    }
}

/// Every cluster on a DescribeClusters page
pub fn clusters_from_page(response: &Value) -> Vec<Cluster> {
    response
        .get("Clusters")
        .and_then(Value::as_array)
        .map(|clusters| clusters.iter().map(cluster_from_description).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description() -> Value {
        json!({
            "ClusterIdentifier": "analytics",
            "ClusterStatus": "available",
            "NodeType": "ra3.xlplus",
            "NumberOfNodes": 2,
            "MasterUsername": "admin",
            "DBName": "dev",
            "Endpoint": { "Address": "analytics.example.com", "Port": 5439 },
            "IamRoles": [{ "IamRoleArn": "arn:aws:iam::1:role/copy", "ApplyStatus": "in-sync" }],
            "VpcSecurityGroups": [{ "VpcSecurityGroupId": "sg-1", "Status": "active" }],
            "Tags": [{ "Key": "team", "Value": "data" }],
            "AquaConfiguration": { "AquaStatus": "disabled", "AquaConfigurationStatus": "auto" },
            "ClusterNamespaceArn": "arn:aws:redshift:us-east-1:1:namespace:abc",
            "PendingModifiedValues": {}
        })
    }

    #[test]
    fn test_create_request_omits_unset_fields() {
        let mut cluster = Cluster::new("analytics");
        cluster.node_type = Some("ra3.xlplus".to_string());

        let request = create_cluster(&cluster);

        assert_eq!(request.operation, "CreateCluster");
        assert_eq!(
            request.payload,
            json!({ "ClusterIdentifier": "analytics", "NodeType": "ra3.xlplus" })
        );
    }

    #[test]
    fn test_modify_request_carries_only_changes() {
        let mut previous = Cluster::new("analytics");
        previous.node_type = Some("ra3.xlplus".to_string());
        previous.number_of_nodes = Some(2);
        let mut desired = previous.clone();
        desired.number_of_nodes = Some(4);

        let request = modify_cluster(&desired, &previous);

        assert_eq!(
            request.payload,
            json!({ "ClusterIdentifier": "analytics", "NumberOfNodes": 4 })
        );
    }

    #[test]
    fn test_modify_request_leaves_unset_lists_alone() {
        let mut previous = Cluster::new("analytics");
        previous.iam_roles = Some(vec!["arn:aws:iam::123456789012:role/loader".to_string()]);
        previous.vpc_security_group_ids = Some(vec!["sg-1".to_string()]);
        let mut desired = previous.clone();
        desired.iam_roles = None;
        desired.vpc_security_group_ids = Some(vec!["sg-2".to_string()]);

        let request = modify_cluster(&desired, &previous);

        assert_eq!(
            request.payload,
            json!({ "ClusterIdentifier": "analytics", "VpcSecurityGroupIds": ["sg-2"] })
        );
    }

    #[test]
    fn test_description_to_model() {
        let cluster = cluster_from_description(&description());

        assert_eq!(cluster.cluster_identifier.as_deref(), Some("analytics"));
        assert_eq!(cluster.cluster_type.as_deref(), Some("multi-node"));
        assert_eq!(cluster.port, Some(5439));
        assert_eq!(cluster.iam_roles, Some(vec!["arn:aws:iam::1:role/copy".to_string()]));
        assert_eq!(cluster.vpc_security_group_ids, Some(vec!["sg-1".to_string()]));
        assert_eq!(cluster.tags, Some(vec![Tag::new("team", "data")]));
        assert_eq!(cluster.aqua_configuration_status.as_deref(), Some("auto"));
        assert!(!has_pending_modifications(&description()));
    }

    #[test]
    fn test_apply_description_keeps_write_only_fields() {
        let mut model = Cluster::new("analytics");
        model.master_user_password = Some("Secret123".to_string());
        model.snapshot_identifier = Some("snap-1".to_string());
        model.namespace_resource_policy = Some(json!({ "Version": "2012-10-17" }));

        apply_description(&mut model, &description());

        assert_eq!(model.master_user_password.as_deref(), Some("Secret123"));
        assert_eq!(model.snapshot_identifier.as_deref(), Some("snap-1"));
        assert!(model.namespace_resource_policy.is_none());
        assert!(model.endpoint.is_some());
    }

    #[test]
    fn test_namespace_arn_locations() {
        let created = json!({ "Cluster": { "ClusterNamespaceArn": "arn:ns:1" } });
        let page = json!({ "Clusters": [{ "ClusterIdentifier": "a", "ClusterNamespaceArn": "arn:ns:2" }] });

        assert_eq!(namespace_arn(&created), Some("arn:ns:1"));
        assert_eq!(namespace_arn(&page), Some("arn:ns:2"));
        assert_eq!(namespace_arn(&json!({})), None);
    }

    #[test]
    fn test_policy_document_round_trip() {
        let policy = json!({ "Version": "2012-10-17", "Statement": [] });
        let request = put_resource_policy("arn:ns:1", &policy);
        let stored = request.payload["Policy"].clone();

        let response = json!({ "ResourcePolicy": { "ResourceArn": "arn:ns:1", "Policy": stored } });
        assert_eq!(policy_from_response(&response), Some(policy));
    }

    #[test]
    fn test_logging_status() {
        assert_eq!(logging_from_status(&json!({ "LoggingEnabled": false })), None);
        let status = json!({ "LoggingEnabled": true, "BucketName": "audit", "S3KeyPrefix": "logs/" });
        assert_eq!(
            logging_from_status(&status).and_then(|logging| logging.bucket_name),
            Some("audit".to_string())
        );
    }
}
