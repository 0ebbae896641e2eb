//! Redshift resource handlers for redflow
//!
//! Two resource families built on the [`redflow_handler`] step-chain engine:
//!
//! - [`ClusterHandlers`] (`AWS::Redshift::Cluster`): create or restore from a
//!   snapshot, tags, audit logging, AQUA, and the namespace resource policy
//! - [`EndpointAccessHandlers`] (`AWS::Redshift::EndpointAccess`): managed VPC
//!   endpoints in front of a cluster
//!
//! # Example
//!
//! ```ignore
//! use redflow_handler::{HandlerRequest, LifecycleDispatcher, Operation};
//! use redflow_redshift::{ClusterHandlers, ResourceScope};
//!
//! let settings = redflow_config::load_settings()?;
//! let handlers = ClusterHandlers::new(settings, ResourceScope::new("aws", "us-east-1", "123456789012"));
//! let dispatcher = LifecycleDispatcher::new(&handlers, &client);
//!
//! let response = dispatcher
//!     .dispatch(HandlerRequest::new(Operation::Create, Some(cluster)))
//!     .await;
//! ```
//!
//! The remote client is injected: it owns credentials and signing, and each
//! call on it is a single Redshift API request. `describe` on the client used
//! with a family returns that family's resource description (a single
//! `Cluster` or `EndpointAccess` object) or a not-found fault.

pub mod cluster;
pub mod codes;
pub mod endpoint_access;
pub mod scope;

pub use cluster::{Cluster, ClusterHandlers, Endpoint, LoggingProperties, Tag};
pub use endpoint_access::{EndpointAccess, EndpointAccessHandlers};
pub use scope::ResourceScope;
