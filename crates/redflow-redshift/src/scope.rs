//! Account and region the handlers operate in

use serde::{Deserialize, Serialize};

/// Where the managed resources live; used to build ARNs the API requires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceScope {
    pub partition: String,
    pub region: String,
    pub account_id: String,
}

impl ResourceScope {
    pub fn new(
        partition: impl Into<String>,
        region: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            partition: partition.into(),
            region: region.into(),
            account_id: account_id.into(),
        }
    }

    /// ARN of a cluster, as tag operations expect it
    pub fn cluster_arn(&self, cluster_identifier: &str) -> String {
        format!(
            "arn:{}:redshift:{}:{}:cluster:{}",
            self.partition, self.region, self.account_id, cluster_identifier
        )
    }
}
