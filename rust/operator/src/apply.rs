//! Create-if-missing application of a cluster's child objects.
//!
//! Objects that already exist are left untouched, whatever their content. A failure on one object
//! never prevents the remaining ones from being attempted.

use snafu::{ResultExt, Snafu};
use stackable_operator::k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use strum::{EnumDiscriminants, IntoStaticStr};

use crate::{
    resource::{ClusterResource, ResourceId, ResourceKind},
    store::{self, ResourceStore},
};

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("{kind} has no name or namespace"))]
    MissingIdentity { kind: ResourceKind },

    #[snafu(display("failed to look up {id}"))]
    FetchResource { source: store::Error, id: ResourceId },

    #[snafu(display("failed to create {id}"))]
    CreateResource { source: store::Error, id: ResourceId },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApplyOutcome {
    Created,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub outcomes: Vec<(ResourceId, ApplyOutcome)>,
    pub failures: Vec<Error>,
}

impl ApplyReport {
    pub fn created(&self) -> usize {
        self.count(ApplyOutcome::Created)
    }

    pub fn unchanged(&self) -> usize {
        self.count(ApplyOutcome::Unchanged)
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of objects that were attempted.
    pub fn total(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    fn count(&self, outcome: ApplyOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }
}

/// Makes sure every object in `resources` exists, in the given order.
pub async fn apply_cluster_resources<S>(
    store: &S,
    owner: &OwnerReference,
    resources: Vec<ClusterResource>,
) -> ApplyReport
where
    S: ResourceStore + ?Sized,
{
    let mut report = ApplyReport::default();
    for resource in resources {
        match apply_resource(store, owner, resource).await {
            Ok((id, outcome)) => {
                match outcome {
                    ApplyOutcome::Created => tracing::info!("Created {id}"),
                    ApplyOutcome::Unchanged => tracing::debug!("{id} already exists"),
                }
                report.outcomes.push((id, outcome));
            }
            Err(error) => {
                tracing::warn!(error = &error as &dyn std::error::Error, "Failed to apply resource");
                report.failures.push(error);
            }
        }
    }
    report
}

async fn apply_resource<S>(
    store: &S,
    owner: &OwnerReference,
    mut resource: ClusterResource,
) -> Result<(ResourceId, ApplyOutcome), Error>
where
    S: ResourceStore + ?Sized,
{
    let id = resource.id().ok_or(Error::MissingIdentity {
        kind: resource.kind(),
    })?;

    if store
        .get(&id)
        .await
        .with_context(|_| FetchResourceSnafu { id: id.clone() })?
        .is_some()
    {
        return Ok((id, ApplyOutcome::Unchanged));
    }

    resource.stamp_owner_reference(owner);
    store
        .create(&resource)
        .await
        .with_context(|_| CreateResourceSnafu { id: id.clone() })?;
    Ok((id, ApplyOutcome::Created))
}
