use std::{
    fmt::{self, Display},
    sync::Arc,
};

use const_format::concatcp;
use hdfs_ha_crd::{constants::OPERATOR_NAME, HdfsCluster, HdfsRole};
use snafu::{OptionExt, ResultExt, Snafu};
use stackable_operator::{
    client::Client,
    kube::{
        runtime::{controller::Action, events::Recorder, reflector::ObjectRef},
        Resource,
    },
    logging::controller::ReconcilerError,
    time::Duration,
};
use strum::{EnumDiscriminants, IntoStaticStr};

use crate::{
    apply::{self, apply_cluster_resources, ApplyReport},
    event::{self, build_invalid_replica_message, publish_warning_event},
    store::{self, KubeStore, ResourceStore},
    topology::{self, build_topology},
};

const HDFS_CONTROLLER_NAME: &str = "hdfs-controller";
pub const HDFS_FULL_CONTROLLER_NAME: &str = concatcp!(HDFS_CONTROLLER_NAME, '.', OPERATOR_NAME);

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("object defines no namespace"))]
    ObjectHasNoNamespace,

    #[snafu(display("failed to fetch HdfsCluster {name:?}"))]
    FetchCluster { source: store::Error, name: String },

    #[snafu(display("failed to build the cluster topology"))]
    BuildTopology { source: topology::Error },

    #[snafu(display(
        "failed to apply {} of {total} cluster resources: {failures}",
        failures.0.len()
    ))]
    ApplyClusterResources {
        failures: FailedResources,
        total: usize,
    },

    #[snafu(display("failed to create cluster event"))]
    FailedToCreateClusterEvent { source: event::Error },
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        ErrorDiscriminants::from(self).into()
    }
}

pub type HdfsOperatorResult<T> = Result<T, Error>;

/// Per-resource failures of one reconcile cycle.
#[derive(Debug)]
pub struct FailedResources(pub Vec<apply::Error>);

impl Display for FailedResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, failure) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
            let mut source = std::error::Error::source(failure);
            while let Some(cause) = source {
                write!(f, ": {cause}")?;
                source = cause.source();
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The cluster is gone, nothing to do.
    NotFound,
    /// Cleanup is left to the garbage collector.
    MarkedForDeletion,
    Applied(ApplyReport),
}

pub struct Ctx {
    pub client: Client,
    pub event_recorder: Arc<Recorder>,
}

/// Runs one full cycle for the cluster behind `obj_ref`.
///
/// The cluster is re-read from `store`, its topology derived from scratch and every child object
/// created if missing. All per-resource failures are collected into a single
/// [`Error::ApplyClusterResources`].
pub async fn reconcile_cluster<S>(
    store: &S,
    obj_ref: &ObjectRef<HdfsCluster>,
) -> HdfsOperatorResult<ReconcileOutcome>
where
    S: ResourceStore + ?Sized,
{
    let namespace = obj_ref
        .namespace
        .as_deref()
        .context(ObjectHasNoNamespaceSnafu)?;

    let Some(hdfs) = store
        .get_cluster(namespace, &obj_ref.name)
        .await
        .with_context(|_| FetchClusterSnafu {
            name: obj_ref.name.clone(),
        })?
    else {
        tracing::debug!("{obj_ref} not found, skipping reconcile");
        return Ok(ReconcileOutcome::NotFound);
    };

    if hdfs.is_marked_for_deletion() {
        tracing::debug!("{obj_ref} is being deleted, skipping reconcile");
        return Ok(ReconcileOutcome::MarkedForDeletion);
    }

    let ports = hdfs.port_set();
    tracing::debug!(
        version = %hdfs.spec.version,
        namenode_rpc = ports.namenode_rpc,
        namenode_http = ports.namenode_http,
        datanode_http = ports.datanode_http,
        "Selected Hadoop ports"
    );

    let topology = build_topology(&hdfs, ports).context(BuildTopologySnafu)?;
    let owner = topology.owner.clone();
    let report = apply_cluster_resources(store, &owner, topology.into_resources()).await;

    if !report.is_success() {
        let total = report.total();
        return ApplyClusterResourcesSnafu {
            failures: FailedResources(report.failures),
            total,
        }
        .fail();
    }

    tracing::info!(
        created = report.created(),
        unchanged = report.unchanged(),
        "Reconciled {obj_ref}"
    );
    Ok(ReconcileOutcome::Applied(report))
}

pub async fn reconcile_hdfs(hdfs: Arc<HdfsCluster>, ctx: Arc<Ctx>) -> HdfsOperatorResult<Action> {
    tracing::info!("Starting reconcile");

    if !hdfs.is_marked_for_deletion() {
        let hdfs_obj_ref = hdfs.object_ref(&());
        for role in [HdfsRole::NameNode, HdfsRole::JournalNode] {
            if let Some(message) = build_invalid_replica_message(&hdfs, role) {
                tracing::warn!("{message}");
                publish_warning_event(
                    &ctx.event_recorder,
                    &hdfs_obj_ref,
                    "Reconcile".to_owned(),
                    "Invalid replicas".to_owned(),
                    message,
                )
                .await
                .context(FailedToCreateClusterEventSnafu)?;
            }
        }
    }

    let store = KubeStore::new(ctx.client.clone());
    reconcile_cluster(&store, &ObjectRef::from_obj(&*hdfs)).await?;

    Ok(Action::await_change())
}

pub fn error_policy(_obj: Arc<HdfsCluster>, _error: &Error, _ctx: Arc<Ctx>) -> Action {
    Action::requeue(*Duration::from_secs(5))
}
