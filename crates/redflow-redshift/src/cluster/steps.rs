//! Cluster chain steps

use super::model::{Cluster, PATCH_ATTRIBUTES, Tag, modified_attributes};
use super::translate;
use crate::scope::ResourceScope;
use redflow_handler::diff;
use redflow_handler::{
    BackoffPolicy, ClassifiedFault, Completion, FailureKind, Observation, ProgressRecord, RemoteRequest,
    Stabilization, Step, Target,
};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Progress key of the namespace ARN needed by resource-policy calls
pub const NAMESPACE_ARN: &str = "namespace-arn";

fn cluster_available(observation: Observation<'_>) -> bool {
    matches!(
        observation,
        Observation::Present(description) if translate::cluster_status(description) == Some("available")
    )
}

fn known_namespace_arn(
    target: Target<'_, Cluster>,
    progress: &ProgressRecord<Cluster>,
) -> Option<String> {
    progress
        .try_identifier(NAMESPACE_ARN)
        .or(target.desired.cluster_namespace_arn.as_deref())
        .or(target
            .previous
            .and_then(|previous| previous.cluster_namespace_arn.as_deref()))
        .map(str::to_string)
}

/// Namespace ARN a resource-policy call must target; panics if no step found it
fn namespace_arn(target: Target<'_, Cluster>, progress: &ProgressRecord<Cluster>) -> String {
    known_namespace_arn(target, progress)
        .unwrap_or_else(|| progress.identifier(NAMESPACE_ARN).to_string())
}

fn remember_namespace(response: &Value, progress: &mut ProgressRecord<Cluster>) {
    if let Some(arn) = translate::namespace_arn(response) {
        progress.remember(NAMESPACE_ARN, arn);
    }
}

fn policy_changed(target: Target<'_, Cluster>) -> bool {
    diff::value_changed(target.desired, target.previous, |cluster: &Cluster| {
        cluster.namespace_resource_policy.clone()
    })
}

fn model_mut(progress: &mut ProgressRecord<Cluster>) -> &mut Cluster {
    progress.resource_model.get_or_insert_with(Cluster::default)
}

fn created(
    observed: Option<&Value>,
    progress: &mut ProgressRecord<Cluster>,
    cool_down_seconds: u64,
) -> Completion {
    if let Some(description) = observed {
        remember_namespace(description, progress);
    }
    // dependent subsystems lag behind the reported status right after creation
    match cool_down_seconds {
        0 => Completion::Advance,
        seconds => Completion::CoolDown(seconds),
    }
}

pub struct CreateCluster {
    pub cool_down_seconds: u64,
}

impl CreateCluster {
    pub const NAME: &'static str = "create-cluster";
}

impl Step<Cluster> for CreateCluster {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> bool {
        !target.desired.is_restore()
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::create_cluster(target.desired)
    }

    fn capture(&self, response: &Value, progress: &mut ProgressRecord<Cluster>) {
        remember_namespace(response, progress);
    }

    fn stabilization(
        &self,
        target: Target<'_, Cluster>,
        _: &ProgressRecord<Cluster>,
    ) -> Option<Stabilization> {
        Some(Stabilization::describe(target.desired.id()))
    }

    fn is_stable(&self, observation: Observation<'_>, _: Target<'_, Cluster>) -> bool {
        cluster_available(observation)
    }

    fn on_complete(&self, observed: Option<&Value>, progress: &mut ProgressRecord<Cluster>) -> Completion {
        created(observed, progress, self.cool_down_seconds)
    }
}

pub struct RestoreFromSnapshot {
    pub cool_down_seconds: u64,
}

impl RestoreFromSnapshot {
    pub const NAME: &'static str = "restore-from-snapshot";
}

impl Step<Cluster> for RestoreFromSnapshot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> bool {
        target.desired.is_restore()
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::restore_from_snapshot(target.desired)
    }

    fn capture(&self, response: &Value, progress: &mut ProgressRecord<Cluster>) {
        remember_namespace(response, progress);
    }

    fn stabilization(
        &self,
        target: Target<'_, Cluster>,
        _: &ProgressRecord<Cluster>,
    ) -> Option<Stabilization> {
        Some(Stabilization::describe(target.desired.id()))
    }

    fn is_stable(&self, observation: Observation<'_>, _: Target<'_, Cluster>) -> bool {
        cluster_available(observation)
    }

    fn on_complete(&self, observed: Option<&Value>, progress: &mut ProgressRecord<Cluster>) -> Completion {
        created(observed, progress, self.cool_down_seconds)
    }
}

pub struct ModifyCluster {
    pub patch_min_observations: u32,
    pub polling: BackoffPolicy,
}

impl ModifyCluster {
    pub const NAME: &'static str = "modify-cluster";
}

impl Step<Cluster> for ModifyCluster {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> bool {
        target
            .previous
            .is_none_or(|previous| !modified_attributes(target.desired, previous).is_empty())
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        let baseline = Cluster::default();
        translate::modify_cluster(target.desired, target.previous.unwrap_or(&baseline))
    }

    fn stabilization(
        &self,
        target: Target<'_, Cluster>,
        _: &ProgressRecord<Cluster>,
    ) -> Option<Stabilization> {
        // version and track changes flap through "available" while patching
        let min_observations = if diff::any_changed(PATCH_ATTRIBUTES, target.desired, target.previous) {
            self.patch_min_observations
        } else {
            1
        };
        Some(
            Stabilization::describe(target.desired.id())
                .with_min_observations(min_observations)
                .with_policy(self.polling),
        )
    }

    fn is_stable(&self, observation: Observation<'_>, _: Target<'_, Cluster>) -> bool {
        match observation {
            Observation::Present(description) => {
                translate::cluster_status(description) == Some("available")
                    && !translate::has_pending_modifications(description)
            }
            Observation::Absent => false,
        }
    }
}

fn tags_to_add<'a>(target: Target<'a, Cluster>) -> Vec<&'a Tag> {
    let previous = target.previous.map(Cluster::tag_list).unwrap_or_default();
    diff::set_difference(target.desired.tag_list(), previous)
}

fn tag_keys_to_remove<'a>(target: Target<'a, Cluster>) -> Vec<&'a str> {
    let Some(previous) = target.previous else {
        return Vec::new();
    };
    let kept: HashSet<&str> = target
        .desired
        .tag_list()
        .iter()
        .map(|tag| tag.key.as_str())
        .collect();
    previous
        .tag_list()
        .iter()
        .map(|tag| tag.key.as_str())
        .filter(|key| !kept.contains(key))
        .collect()
}

pub struct DeleteTags {
    pub scope: ResourceScope,
}

impl DeleteTags {
    pub const NAME: &'static str = "delete-tags";
}

impl Step<Cluster> for DeleteTags {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> bool {
        !tag_keys_to_remove(target).is_empty()
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::delete_tags(
            &self.scope.cluster_arn(target.desired.id()),
            &tag_keys_to_remove(target),
        )
    }
}

/// Adds new or changed tags; on create only a restore needs this
pub struct CreateTags {
    pub scope: ResourceScope,
}

impl CreateTags {
    pub const NAME: &'static str = "create-tags";
}

impl Step<Cluster> for CreateTags {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> bool {
        (!target.is_create() || target.desired.is_restore()) && !tags_to_add(target).is_empty()
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::create_tags(
            &self.scope.cluster_arn(target.desired.id()),
            &tags_to_add(target),
        )
    }
}

pub struct DisableLogging;

impl DisableLogging {
    pub const NAME: &'static str = "disable-logging";
}

impl Step<Cluster> for DisableLogging {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> bool {
        target.desired.logging_properties.is_none()
            && target
                .previous
                .is_some_and(|previous| previous.logging_properties.is_some())
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::disable_logging(target.desired.id())
    }

    fn stabilization(
        &self,
        target: Target<'_, Cluster>,
        _: &ProgressRecord<Cluster>,
    ) -> Option<Stabilization> {
        Some(Stabilization::invoke(translate::describe_logging_status(
            target.desired.id(),
        )))
    }

    fn is_stable(&self, observation: Observation<'_>, _: Target<'_, Cluster>) -> bool {
        matches!(observation, Observation::Present(status) if !translate::logging_enabled(status))
    }
}

pub struct EnableLogging;

impl EnableLogging {
    pub const NAME: &'static str = "enable-logging";
}

impl Step<Cluster> for EnableLogging {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> bool {
        target.desired.logging_properties.is_some()
            && diff::value_changed(target.desired, target.previous, |cluster: &Cluster| {
                cluster.logging_properties.clone()
            })
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        let logging = target.desired.logging_properties.clone().unwrap_or_default();
        translate::enable_logging(target.desired.id(), &logging)
    }

    fn stabilization(
        &self,
        target: Target<'_, Cluster>,
        _: &ProgressRecord<Cluster>,
    ) -> Option<Stabilization> {
        Some(Stabilization::invoke(translate::describe_logging_status(
            target.desired.id(),
        )))
    }

    fn is_stable(&self, observation: Observation<'_>, _: Target<'_, Cluster>) -> bool {
        matches!(observation, Observation::Present(status) if translate::logging_enabled(status))
    }
}

/// Applies AQUA settings; CreateCluster carries them itself, restores do not
pub struct ConfigureAqua {
    pub min_observations: u32,
    pub polling: BackoffPolicy,
}

impl ConfigureAqua {
    pub const NAME: &'static str = "configure-aqua";
}

impl Step<Cluster> for ConfigureAqua {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> bool {
        if target.desired.aqua_configuration_status.is_none() {
            return false;
        }
        if target.is_create() {
            return target.desired.is_restore();
        }
        diff::value_changed(target.desired, target.previous, |cluster: &Cluster| {
            cluster.aqua_configuration_status.clone()
        })
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::modify_aqua_configuration(
            target.desired.id(),
            target.desired.aqua_configuration_status.as_deref().unwrap_or("auto"),
        )
    }

    fn stabilization(
        &self,
        target: Target<'_, Cluster>,
        _: &ProgressRecord<Cluster>,
    ) -> Option<Stabilization> {
        Some(
            Stabilization::describe(target.desired.id())
                .with_min_observations(self.min_observations)
                .with_policy(self.polling),
        )
    }

    fn is_stable(&self, observation: Observation<'_>, _: Target<'_, Cluster>) -> bool {
        match observation {
            Observation::Present(description) => {
                translate::cluster_status(description) == Some("available")
                    && translate::aqua_status(description) != Some("applying")
            }
            Observation::Absent => false,
        }
    }
}

/// Looks up the namespace ARN when a policy change needs it and nothing knows it
pub struct ResolveNamespace;

impl ResolveNamespace {
    pub const NAME: &'static str = "resolve-namespace";
}

impl Step<Cluster> for ResolveNamespace {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, progress: &ProgressRecord<Cluster>) -> bool {
        let needs_arn = if target.is_create() {
            target.desired.namespace_resource_policy.is_some()
        } else {
            policy_changed(target)
        };
        needs_arn && known_namespace_arn(target, progress).is_none()
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::describe_clusters(Some(target.desired.id()), None)
    }

    fn capture(&self, response: &Value, progress: &mut ProgressRecord<Cluster>) {
        remember_namespace(response, progress);
    }

    // keep describing until the namespace shows up, or time out
    fn stabilization(
        &self,
        target: Target<'_, Cluster>,
        progress: &ProgressRecord<Cluster>,
    ) -> Option<Stabilization> {
        if known_namespace_arn(target, progress).is_some() {
            return None;
        }
        Some(Stabilization::invoke(translate::describe_clusters(
            Some(target.desired.id()),
            None,
        )))
    }

    fn is_stable(&self, observation: Observation<'_>, _: Target<'_, Cluster>) -> bool {
        matches!(
            observation,
            Observation::Present(page) if translate::namespace_arn(page).is_some()
        )
    }

    fn on_complete(&self, observed: Option<&Value>, progress: &mut ProgressRecord<Cluster>) -> Completion {
        if let Some(page) = observed {
            remember_namespace(page, progress);
        }
        Completion::Advance
    }
}

pub struct PutResourcePolicy;

impl PutResourcePolicy {
    pub const NAME: &'static str = "put-resource-policy";
}

impl Step<Cluster> for PutResourcePolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> bool {
        target.desired.namespace_resource_policy.is_some() && policy_changed(target)
    }

    fn build_request(&self, target: Target<'_, Cluster>, progress: &ProgressRecord<Cluster>) -> RemoteRequest {
        let policy = target
            .desired
            .namespace_resource_policy
            .clone()
            .unwrap_or_default();
        translate::put_resource_policy(&namespace_arn(target, progress), &policy)
    }
}

/// Removes the namespace policy; a policy that is already gone counts as removed
pub struct DeleteResourcePolicy;

impl DeleteResourcePolicy {
    pub const NAME: &'static str = "delete-resource-policy";
}

impl Step<Cluster> for DeleteResourcePolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, progress: &ProgressRecord<Cluster>) -> bool {
        let had_policy = match target.previous {
            Some(previous) => {
                previous.namespace_resource_policy.is_some()
                    && target.desired.namespace_resource_policy.is_none()
            }
            None => target.desired.namespace_resource_policy.is_some(),
        };
        had_policy && known_namespace_arn(target, progress).is_some()
    }

    fn build_request(&self, target: Target<'_, Cluster>, progress: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::delete_resource_policy(&namespace_arn(target, progress))
    }

    fn suppress(&self, fault: &ClassifiedFault, _: Target<'_, Cluster>) -> bool {
        fault.is_not_found()
    }
}

/// Deletes the cluster and waits until describe no longer finds it
pub struct DeleteCluster {
    /// Wait applied when the namespace policy was removed on this pass
    pub settle: Duration,
}

impl DeleteCluster {
    pub const NAME: &'static str = "delete-cluster";
}

impl Step<Cluster> for DeleteCluster {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::delete_cluster(target.desired.id())
    }

    fn stabilization(
        &self,
        target: Target<'_, Cluster>,
        _: &ProgressRecord<Cluster>,
    ) -> Option<Stabilization> {
        Some(Stabilization::describe(target.desired.id()))
    }

    fn is_stable(&self, observation: Observation<'_>, _: Target<'_, Cluster>) -> bool {
        matches!(observation, Observation::Absent)
    }

    fn settle(&self, progress: &ProgressRecord<Cluster>) -> Option<Duration> {
        (progress.is_invoked(DeleteResourcePolicy::NAME) && !self.settle.is_zero())
            .then_some(self.settle)
    }
}

pub struct DescribeCluster;

impl DescribeCluster {
    pub const NAME: &'static str = "describe-cluster";
}

impl Step<Cluster> for DescribeCluster {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::describe_clusters(Some(target.desired.id()), None)
    }

    fn capture(&self, response: &Value, progress: &mut ProgressRecord<Cluster>) {
        let Some(description) = translate::first_cluster(response) else {
            tracing::warn!("DescribeClusters returned no cluster");
            return;
        };
        remember_namespace(description, progress);
        translate::apply_description(model_mut(progress), description);
    }
}

pub struct DescribeLoggingStatus;

impl DescribeLoggingStatus {
    pub const NAME: &'static str = "describe-logging-status";
}

impl Step<Cluster> for DescribeLoggingStatus {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn build_request(&self, target: Target<'_, Cluster>, _: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::describe_logging_status(target.desired.id())
    }

    fn capture(&self, response: &Value, progress: &mut ProgressRecord<Cluster>) {
        model_mut(progress).logging_properties = translate::logging_from_status(response);
    }
}

/// Reads the namespace policy; a missing policy leaves the model without one
pub struct GetResourcePolicy;

impl GetResourcePolicy {
    pub const NAME: &'static str = "get-resource-policy";
}

impl Step<Cluster> for GetResourcePolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run(&self, target: Target<'_, Cluster>, progress: &ProgressRecord<Cluster>) -> bool {
        known_namespace_arn(target, progress).is_some()
    }

    fn build_request(&self, target: Target<'_, Cluster>, progress: &ProgressRecord<Cluster>) -> RemoteRequest {
        translate::get_resource_policy(&namespace_arn(target, progress))
    }

    fn capture(&self, response: &Value, progress: &mut ProgressRecord<Cluster>) {
        model_mut(progress).namespace_resource_policy = translate::policy_from_response(response);
    }

    fn suppress(&self, fault: &ClassifiedFault, target: Target<'_, Cluster>) -> bool {
        if fault.is_not_found() {
            return true;
        }
        // callers that never asked for a policy must not start failing on it
        if fault.kind() == FailureKind::AccessDenied
            && target.desired.namespace_resource_policy.is_none()
        {
            tracing::warn!(
                "No permission to read the namespace resource policy, leaving it unset: {}",
                fault.message()
            );
            return true;
        }
        false
    }
}
