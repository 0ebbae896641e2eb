//! Remote faults and their classification
//!
//! Classification happens exactly once, at the invoker boundary. Everything
//! downstream works with a [`ClassifiedFault`] and never re-reads fault codes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Fault reported by the remote service
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct Fault {
    /// Machine-readable error code (e.g. "ClusterNotFound")
    pub code: String,

    /// Remote message, surfaced verbatim
    pub message: String,

    /// HTTP-like status
    pub status: u16,
}

impl Fault {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status: 400,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Failure kinds an operation can terminate with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    AlreadyExists,
    NotFound,
    InvalidRequest,
    ServiceLimitExceeded,
    AccessDenied,
    NotStabilized,
    GeneralServiceException,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::AlreadyExists => write!(f, "AlreadyExists"),
            FailureKind::NotFound => write!(f, "NotFound"),
            FailureKind::InvalidRequest => write!(f, "InvalidRequest"),
            FailureKind::ServiceLimitExceeded => write!(f, "ServiceLimitExceeded"),
            FailureKind::AccessDenied => write!(f, "AccessDenied"),
            FailureKind::NotStabilized => write!(f, "NotStabilized"),
            FailureKind::GeneralServiceException => write!(f, "GeneralServiceException"),
        }
    }
}

/// What the engine should do about a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Request was rejected before taking effect; retry after a backoff
    Throttled,
    /// Service-side hiccup; a poll is simply "not yet stable"
    Transient,
    /// Stop with this failure kind
    Terminal(FailureKind),
}

/// A fault together with its disposition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{fault} ({disposition:?})")]
pub struct ClassifiedFault {
    pub disposition: Disposition,
    pub fault: Fault,
}

impl ClassifiedFault {
    /// Failure kind reported when this fault ends an operation
    pub fn kind(&self) -> FailureKind {
        match self.disposition {
            Disposition::Terminal(kind) => kind,
            Disposition::Throttled | Disposition::Transient => {
                FailureKind::GeneralServiceException
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.disposition == Disposition::Terminal(FailureKind::NotFound)
    }

    /// Throttled or transient
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.disposition,
            Disposition::Throttled | Disposition::Transient
        )
    }

    pub fn message(&self) -> &str {
        &self.fault.message
    }
}

/// Maps remote faults to dispositions
pub trait FailureClassifier: Send + Sync {
    fn classify(&self, fault: &Fault) -> Disposition;
}

/// Code-table classifier with an HTTP-status fallback
#[derive(Debug, Clone, Default)]
pub struct FaultTable {
    codes: HashMap<String, Disposition>,
}

impl FaultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Throttling and permission codes shared by every service family
    pub fn common() -> Self {
        Self::new()
            .throttled(&[
                "Throttling",
                "ThrottlingException",
                "RequestLimitExceeded",
                "TooManyRequestsException",
            ])
            .transient(&["InternalFailure", "ServiceUnavailable", "InternalError"])
            .terminal(
                &[
                    "AccessDenied",
                    "AccessDeniedException",
                    "UnauthorizedOperation",
                    "UnauthorizedException",
                ],
                FailureKind::AccessDenied,
            )
            .terminal(
                &[
                    "InvalidParameterValue",
                    "InvalidParameterCombination",
                    "MissingParameter",
                    "ValidationError",
                ],
                FailureKind::InvalidRequest,
            )
    }

    pub fn with(mut self, code: impl Into<String>, disposition: Disposition) -> Self {
        self.codes.insert(code.into(), disposition);
        self
    }

    pub fn terminal(self, codes: &[&str], kind: FailureKind) -> Self {
        codes.iter().fold(self, |table, code| {
            table.with(*code, Disposition::Terminal(kind))
        })
    }

    pub fn throttled(self, codes: &[&str]) -> Self {
        codes
            .iter()
            .fold(self, |table, code| table.with(*code, Disposition::Throttled))
    }

    pub fn transient(self, codes: &[&str]) -> Self {
        codes
            .iter()
            .fold(self, |table, code| table.with(*code, Disposition::Transient))
    }

    fn lookup(&self, code: &str) -> Option<Disposition> {
        self.codes.get(code).copied().or_else(|| {
            let trimmed = code
                .strip_suffix("Fault")
                .or_else(|| code.strip_suffix("Exception"))?;
            self.codes.get(trimmed).copied()
        })
    }

    fn by_status(status: u16) -> Disposition {
        match status {
            429 => Disposition::Throttled,
            403 => Disposition::Terminal(FailureKind::AccessDenied),
            404 => Disposition::Terminal(FailureKind::NotFound),
            500..=599 => Disposition::Transient,
            _ => Disposition::Terminal(FailureKind::GeneralServiceException),
        }
    }
}

impl FailureClassifier for FaultTable {
    fn classify(&self, fault: &Fault) -> Disposition {
        self.lookup(&fault.code)
            .unwrap_or_else(|| Self::by_status(fault.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FaultTable {
        FaultTable::common()
            .terminal(&["ClusterNotFound"], FailureKind::NotFound)
            .terminal(&["ClusterAlreadyExists"], FailureKind::AlreadyExists)
    }

    #[test]
    fn test_exact_and_suffixed_codes() {
        let table = table();
        assert_eq!(
            table.classify(&Fault::new("ClusterNotFound", "gone")),
            Disposition::Terminal(FailureKind::NotFound)
        );
        assert_eq!(
            table.classify(&Fault::new("ClusterAlreadyExistsFault", "taken")),
            Disposition::Terminal(FailureKind::AlreadyExists)
        );
        assert_eq!(
            table.classify(&Fault::new("ThrottlingException", "slow down")),
            Disposition::Throttled
        );
    }

    #[test]
    fn test_status_fallback() {
        let table = table();
        assert_eq!(
            table.classify(&Fault::new("Mystery", "x").with_status(503)),
            Disposition::Transient
        );
        assert_eq!(
            table.classify(&Fault::new("Mystery", "x").with_status(429)),
            Disposition::Throttled
        );
        assert_eq!(
            table.classify(&Fault::new("Mystery", "x")),
            Disposition::Terminal(FailureKind::GeneralServiceException)
        );
    }

    #[test]
    fn test_code_wins_over_status() {
        let fault = Fault::new("ClusterNotFound", "gone").with_status(500);
        assert_eq!(
            table().classify(&fault),
            Disposition::Terminal(FailureKind::NotFound)
        );
    }

    #[test]
    fn test_retryable_faults_report_general_kind() {
        let classified = ClassifiedFault {
            disposition: Disposition::Transient,
            fault: Fault::new("InternalFailure", "boom").with_status(500),
        };
        assert!(classified.is_retryable());
        assert_eq!(classified.kind(), FailureKind::GeneralServiceException);
        assert_eq!(classified.message(), "boom");
    }
}
