//! Cluster resource model

use redflow_handler::diff::{self, TrackedField};
use redflow_handler::{Resource, tracked_fields};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `AWS::Redshift::Cluster`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cluster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_username: Option<String>,

    /// Write-only; never returned by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_user_password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_nodes: Option<u32>,

    /// `single-node` or `multi-node`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<String>,

    #[serde(rename = "DBName", default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_version_upgrade: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_track_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publicly_accessible: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_roles: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_security_group_ids: Option<Vec<String>>,

    /// Restore source; selects restore-from-snapshot on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_cluster_identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_properties: Option<LoggingProperties>,

    /// `enabled`, `disabled` or `auto`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aqua_configuration_status: Option<String>,

    /// Policy document attached to the cluster's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_resource_policy: Option<Value>,

    // Read-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_namespace_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Audit logging destination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggingProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_key_prefix: Option<String>,

    /// `s3` or `cloudwatch`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_destination_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_exports: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Resource for Cluster {
    fn identifier(&self) -> Option<&str> {
        self.cluster_identifier.as_deref()
    }
}

impl Cluster {
    pub fn new(cluster_identifier: impl Into<String>) -> Self {
        Self {
            cluster_identifier: Some(cluster_identifier.into()),
            ..Default::default()
        }
    }

    /// Identifier of a model the chain is about to act on
    ///
    /// # Panics
    ///
    /// Panics when the identifier is missing; handlers reject such models
    /// before building a chain.
    pub fn id(&self) -> &str {
        match self.cluster_identifier.as_deref() {
            Some(id) => id,
            None => panic!("cluster model without ClusterIdentifier reached a step"),
        }
    }

    pub fn is_restore(&self) -> bool {
        self.snapshot_identifier.is_some()
    }

    pub fn tag_list(&self) -> &[Tag] {
        self.tags.as_deref().unwrap_or_default()
    }
}

/// Attributes applied through ModifyCluster, compared as plain values
pub const MODIFY_ATTRIBUTES: &[TrackedField<Cluster>] = tracked_fields!(
    Cluster;
    node_type,
    number_of_nodes,
    cluster_type,
    cluster_version,
    allow_version_upgrade,
    maintenance_track_name,
    master_user_password,
    port,
    publicly_accessible,
    encrypted,
    kms_key_id,
);

/// Attributes applied through ModifyCluster, compared as sets
pub const MODIFY_SET_ATTRIBUTES: &[TrackedField<Cluster>] = &[
    TrackedField {
        name: "iam_roles",
        differs: |a: &Cluster, b: &Cluster| !optional_set_eq(&a.iam_roles, &b.iam_roles),
    },
    TrackedField {
        name: "vpc_security_group_ids",
        differs: |a: &Cluster, b: &Cluster| {
            !optional_set_eq(&a.vpc_security_group_ids, &b.vpc_security_group_ids)
        },
    },
];

/// Changes that need more than one favorable observation to trust
pub const PATCH_ATTRIBUTES: &[TrackedField<Cluster>] =
    tracked_fields!(Cluster; cluster_version, maintenance_track_name);

pub(crate) fn optional_set_eq(a: &Option<Vec<String>>, b: &Option<Vec<String>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => diff::set_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Tracked attribute names that differ between two versions
pub fn modified_attributes(desired: &Cluster, previous: &Cluster) -> Vec<&'static str> {
    let mut changed = diff::changed_fields(MODIFY_ATTRIBUTES, desired, previous);
    changed.extend(diff::changed_fields(MODIFY_SET_ATTRIBUTES, desired, previous));
    changed
}
