//! Redshift fault codes
//!
//! Codes are registered without their `Fault` suffix; the table matches
//! `ClusterNotFoundFault` and `ClusterNotFound` alike.

use redflow_handler::{FailureKind, FaultTable};

/// Faults raised by cluster, tag, logging and resource-policy calls
pub fn cluster_faults() -> FaultTable {
    FaultTable::common()
        .throttled(&["DependentServiceRequestThrottling"])
        .transient(&["DependentServiceUnavailable"])
        .terminal(&["ClusterAlreadyExists"], FailureKind::AlreadyExists)
        .terminal(&["ClusterNotFound", "ResourceNotFound"], FailureKind::NotFound)
        .terminal(
            &[
                "InvalidClusterState",
                "InvalidClusterSnapshotState",
                "ClusterSnapshotNotFound",
                "InvalidVPCNetworkState",
                "InvalidSubnet",
                "InvalidTag",
                "InvalidS3BucketName",
                "InvalidS3KeyPrefix",
                "BucketNotFound",
                "InsufficientS3BucketPolicy",
                "InvalidPolicy",
                "ConflictPolicyUpdate",
                "UnsupportedOperation",
                "InvalidClusterTrack",
                "InvalidRetentionPeriod",
            ],
            FailureKind::InvalidRequest,
        )
        .terminal(
            &[
                "ClusterQuotaExceeded",
                "NumberOfNodesQuotaExceeded",
                "NumberOfNodesPerClusterLimitExceeded",
                "InsufficientClusterCapacity",
                "TagLimitExceeded",
                "LimitExceeded",
            ],
            FailureKind::ServiceLimitExceeded,
        )
        .terminal(&["AccessToClusterDenied"], FailureKind::AccessDenied)
}

/// Faults raised by endpoint-access calls
pub fn endpoint_faults() -> FaultTable {
    FaultTable::common()
        .terminal(&["EndpointAlreadyExists"], FailureKind::AlreadyExists)
        .terminal(&["EndpointNotFound"], FailureKind::NotFound)
        .terminal(
            &[
                "InvalidEndpointState",
                "InvalidClusterState",
                "ClusterNotFound",
                "ClusterSubnetGroupNotFound",
                "InvalidClusterSecurityGroupState",
                "UnsupportedOperation",
                "InvalidAuthorizationState",
            ],
            FailureKind::InvalidRequest,
        )
        .terminal(
            &[
                "EndpointsPerClusterLimitExceeded",
                "EndpointsPerAuthorizationLimitExceeded",
            ],
            FailureKind::ServiceLimitExceeded,
        )
        .terminal(&["AccessToClusterDenied"], FailureKind::AccessDenied)
}
