//! Derives the complete set of child objects of an [`HdfsCluster`].
//!
//! Building is pure: the same cluster always yields the same objects, which is what makes the
//! create-if-missing reconciliation idempotent.

use std::collections::BTreeMap;

use hdfs_ha_crd::{
    constants::*,
    version::PortSet,
    HdfsCluster, YarnGroup,
};
use snafu::{OptionExt, ResultExt, Snafu};
use stackable_operator::{
    k8s_openapi::{
        api::{
            apps::v1::{
                DaemonSet, DaemonSetSpec, StatefulSet, StatefulSetSpec, StatefulSetUpdateStrategy,
            },
            core::v1::{ConfigMap, PersistentVolumeClaim, PodTemplateSpec, Service},
        },
        apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference},
    },
    kube::{runtime::reflector::ObjectRef, Resource, ResourceExt},
};
use strum::{EnumDiscriminants, IntoStaticStr};

use crate::{
    config::{self, ConfigDocument},
    container::{
        self, DataStorage, YarnDaemon, DATANODE_DATA_VOLUME_NAME, JOURNALNODE_PVC_NAME,
        NAMENODE_PVC_NAME,
    },
    resource::ClusterResource,
    scripts::{self, DATANODE_CHECK_SCRIPT, NAMENODE_FORMAT_SCRIPT},
    service::headless_service,
};

const UPDATE_STRATEGY_ON_DELETE: &str = "OnDelete";

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("object defines no namespace"))]
    ObjectHasNoNamespace,

    #[snafu(display("no metadata for {obj_ref}, cannot build an owner reference"))]
    ObjectMissingMetadataForOwnerRef { obj_ref: ObjectRef<HdfsCluster> },

    #[snafu(display("failed to render {file} for ConfigMap {name:?}"))]
    RenderConfig {
        source: config::Error,
        file: String,
        name: String,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything derived from the cluster once per build.
pub(crate) struct ClusterContext<'a> {
    pub hdfs: &'a HdfsCluster,
    pub namespace: String,
    pub owner: OwnerReference,
    pub ports: PortSet,
}

impl<'a> ClusterContext<'a> {
    pub fn new(hdfs: &'a HdfsCluster, ports: PortSet) -> Result<Self> {
        Ok(Self {
            hdfs,
            namespace: hdfs.namespace().context(ObjectHasNoNamespaceSnafu)?,
            owner: hdfs
                .controller_owner_ref(&())
                .with_context(|| ObjectMissingMetadataForOwnerRefSnafu {
                    obj_ref: ObjectRef::from_obj(hdfs),
                })?,
            ports,
        })
    }

    pub fn object_meta(&self, name: &str, labels: BTreeMap<String, String>) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(self.namespace.clone()),
            labels: Some(labels),
            owner_references: Some(vec![self.owner.clone()]),
            ..ObjectMeta::default()
        }
    }
}

/// The desired child objects of one cluster, in the order they are applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterTopology {
    /// Reference to the cluster every object is owned by.
    pub owner: OwnerReference,
    pub config_maps: Vec<ConfigMap>,
    pub services: Vec<Service>,
    pub stateful_sets: Vec<StatefulSet>,
    pub daemon_sets: Vec<DaemonSet>,
}

impl ClusterTopology {
    pub fn len(&self) -> usize {
        self.config_maps.len()
            + self.services.len()
            + self.stateful_sets.len()
            + self.daemon_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configuration first, so that workloads never start without their ConfigMaps.
    pub fn into_resources(self) -> Vec<ClusterResource> {
        self.config_maps
            .into_iter()
            .map(ClusterResource::ConfigMap)
            .chain(self.services.into_iter().map(ClusterResource::Service))
            .chain(self.stateful_sets.into_iter().map(ClusterResource::StatefulSet))
            .chain(self.daemon_sets.into_iter().map(ClusterResource::DaemonSet))
            .collect()
    }
}

pub fn build_topology(hdfs: &HdfsCluster, ports: PortSet) -> Result<ClusterTopology> {
    let ctx = ClusterContext::new(hdfs, ports)?;
    let mut topology = ClusterTopology {
        owner: ctx.owner.clone(),
        ..ClusterTopology::default()
    };

    topology.config_maps.push(common_config_map(&ctx)?);
    topology.config_maps.push(namenode_scripts_config_map(&ctx));
    topology.config_maps.push(datanode_scripts_config_map(&ctx));

    let namenode_name = hdfs.namenode_name();
    topology.services.push(headless_service(
        &ctx,
        &namenode_name,
        &[
            (SERVICE_PORT_NAME_HTTP, ports.namenode_http),
            (SERVICE_PORT_NAME_FS, ports.namenode_rpc),
        ],
    ));
    topology.stateful_sets.push(stateful_set(
        &ctx,
        &namenode_name,
        hdfs.spec.namenode.replicas,
        container::namenode_pod_template(hdfs, &ports),
        container::volume_claim_templates(
            &hdfs.spec.namenode.volume_claim_templates,
            NAMENODE_PVC_NAME,
            hdfs.spec.namenode.storage_class.as_ref(),
            &hdfs.spec.namenode.capacity,
        ),
        None,
    ));

    let journalnode_name = hdfs.journalnode_name();
    topology.services.push(headless_service(
        &ctx,
        &journalnode_name,
        &[
            (SERVICE_PORT_NAME_JN, JOURNAL_NODE_RPC_PORT),
            (SERVICE_PORT_NAME_HTTP, JOURNAL_NODE_HTTP_PORT),
        ],
    ));
    topology.stateful_sets.push(stateful_set(
        &ctx,
        &journalnode_name,
        hdfs.spec.journalnode.replicas,
        container::journalnode_pod_template(hdfs),
        container::volume_claim_templates(
            &hdfs.spec.journalnode.volume_claim_templates,
            JOURNALNODE_PVC_NAME,
            hdfs.spec.journalnode.storage_class.as_ref(),
            &hdfs.spec.journalnode.capacity,
        ),
        Some(UPDATE_STRATEGY_ON_DELETE),
    ));

    let datanode_name = hdfs.datanode_name();
    match hdfs.spec.datanode.replicas {
        Some(replicas) => {
            topology.services.push(headless_service(
                &ctx,
                &datanode_name,
                &[(SERVICE_PORT_NAME_HTTP, ports.datanode_http)],
            ));
            topology.stateful_sets.push(stateful_set(
                &ctx,
                &datanode_name,
                replicas,
                container::datanode_pod_template(hdfs, &ports, DataStorage::VolumeClaim),
                vec![container::persistent_volume_claim(
                    DATANODE_DATA_VOLUME_NAME,
                    hdfs.spec.datanode.storage_class.as_ref(),
                    &hdfs.spec.datanode.capacity,
                )],
                Some(UPDATE_STRATEGY_ON_DELETE),
            ));
        }
        None => topology.daemon_sets.push(datanode_daemon_set(&ctx)),
    }

    if let Some(yarn) = hdfs.yarn() {
        add_yarn(&ctx, yarn, &mut topology)?;
    }

    tracing::debug!(
        resources = topology.len(),
        "Built topology for HdfsCluster {}",
        hdfs.name_any()
    );
    Ok(topology)
}

fn add_yarn(ctx: &ClusterContext, yarn: &YarnGroup, topology: &mut ClusterTopology) -> Result<()> {
    let hdfs = ctx.hdfs;
    let config_map_name = hdfs.yarn_config_name();
    topology.config_maps.push(ConfigMap {
        metadata: ctx.object_meta(&config_map_name, hdfs.cluster_labels()),
        data: Some(BTreeMap::from([
            (
                MAPRED_SITE_XML.to_string(),
                render_xml(&config::render_mapred_site(yarn), MAPRED_SITE_XML, &config_map_name)?,
            ),
            (
                YARN_SITE_XML.to_string(),
                render_xml(
                    &config::render_yarn_site(hdfs, yarn, &ctx.namespace),
                    YARN_SITE_XML,
                    &config_map_name,
                )?,
            ),
        ])),
        ..ConfigMap::default()
    });

    for (daemon, name, replicas) in [
        (
            YarnDaemon::ResourceManager,
            hdfs.resource_manager_name(yarn),
            yarn.rm_replicas,
        ),
        (
            YarnDaemon::NodeManager,
            hdfs.node_manager_name(yarn),
            yarn.nm_replicas,
        ),
    ] {
        topology
            .services
            .push(headless_service(ctx, &name, daemon.ports()));
        topology.stateful_sets.push(stateful_set(
            ctx,
            &name,
            replicas,
            container::yarn_pod_template(hdfs, yarn, daemon),
            Vec::new(),
            None,
        ));
    }
    Ok(())
}

fn common_config_map(ctx: &ClusterContext) -> Result<ConfigMap> {
    let hdfs = ctx.hdfs;
    let name = hdfs.common_config_name();
    let core_site = config::render_core_site(hdfs);
    let hdfs_site = config::render_hdfs_site(hdfs, &ctx.namespace, &ctx.ports);

    Ok(ConfigMap {
        metadata: ctx.object_meta(&name, hdfs.cluster_labels()),
        data: Some(BTreeMap::from([
            (
                CORE_SITE_XML.to_string(),
                render_xml(&core_site, CORE_SITE_XML, &name)?,
            ),
            (
                HDFS_SITE_XML.to_string(),
                render_xml(&hdfs_site, HDFS_SITE_XML, &name)?,
            ),
        ])),
        ..ConfigMap::default()
    })
}

fn namenode_scripts_config_map(ctx: &ClusterContext) -> ConfigMap {
    let hdfs = ctx.hdfs;
    ConfigMap {
        metadata: ctx.object_meta(&hdfs.namenode_scripts_name(), hdfs.cluster_labels()),
        data: Some(BTreeMap::from([(
            NAMENODE_FORMAT_SCRIPT.to_string(),
            scripts::namenode_format_and_run(hdfs.hadoop_release(), &hdfs.nameservice_id()),
        )])),
        ..ConfigMap::default()
    }
}

fn datanode_scripts_config_map(ctx: &ClusterContext) -> ConfigMap {
    let hdfs = ctx.hdfs;
    ConfigMap {
        metadata: ctx.object_meta(&hdfs.datanode_scripts_name(), hdfs.cluster_labels()),
        data: Some(BTreeMap::from([(
            DATANODE_CHECK_SCRIPT.to_string(),
            scripts::datanode_check_status(ctx.ports.datanode_http),
        )])),
        ..ConfigMap::default()
    }
}

fn render_xml(document: &ConfigDocument, file: &str, config_map_name: &str) -> Result<String> {
    document.to_hadoop_xml().with_context(|_| RenderConfigSnafu {
        file,
        name: config_map_name,
    })
}

fn stateful_set(
    ctx: &ClusterContext,
    name: &str,
    replicas: u16,
    template: PodTemplateSpec,
    volume_claim_templates: Vec<PersistentVolumeClaim>,
    update_strategy: Option<&str>,
) -> StatefulSet {
    tracing::info!("Setting up StatefulSet {name}");

    let labels = ctx.hdfs.workload_labels(name);
    StatefulSet {
        metadata: ctx.object_meta(name, labels.clone()),
        spec: Some(StatefulSetSpec {
            pod_management_policy: Some("OrderedReady".to_string()),
            replicas: Some(i32::from(replicas)),
            selector: LabelSelector {
                match_labels: Some(labels),
                ..LabelSelector::default()
            },
            service_name: Some(name.to_string()),
            template,
            update_strategy: update_strategy.map(|strategy| StatefulSetUpdateStrategy {
                type_: Some(strategy.to_string()),
                rolling_update: None,
            }),
            volume_claim_templates: (!volume_claim_templates.is_empty())
                .then_some(volume_claim_templates),
            ..StatefulSetSpec::default()
        }),
        status: None,
    }
}

fn datanode_daemon_set(ctx: &ClusterContext) -> DaemonSet {
    let name = ctx.hdfs.datanode_name();
    tracing::info!("Setting up DaemonSet {name}");

    let labels = ctx.hdfs.workload_labels(&name);
    DaemonSet {
        metadata: ctx.object_meta(&name, labels.clone()),
        spec: Some(DaemonSetSpec {
            selector: LabelSelector {
                match_labels: Some(labels),
                ..LabelSelector::default()
            },
            template: container::datanode_pod_template(
                ctx.hdfs,
                &ctx.ports,
                DataStorage::HostPath,
            ),
            ..DaemonSetSpec::default()
        }),
        status: None,
    }
}
