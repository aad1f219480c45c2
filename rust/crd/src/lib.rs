pub mod constants;
pub mod naming;
pub mod version;

use std::collections::BTreeMap;

use constants::*;
use serde::{Deserialize, Serialize};
use stackable_operator::{
    k8s_openapi::api::core::v1::PersistentVolumeClaim,
    kube::{CustomResource, ResourceExt},
    schemars::{self, JsonSchema},
};
use strum::Display;
use version::{HadoopRelease, PortSet};

/// A highly available HDFS cluster (two namenodes, a three member journal quorum, datanodes on every
/// node), optionally accompanied by YARN.
#[derive(Clone, CustomResource, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "hdfs.dataworkbench.com",
    version = "v1",
    kind = "HdfsCluster",
    plural = "hdfsclusters",
    shortname = "hdfs",
    namespaced,
    crates(
        kube_core = "stackable_operator::kube::core",
        k8s_openapi = "stackable_operator::k8s_openapi",
        schemars = "stackable_operator::schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct HdfsClusterSpec {
    /// Hadoop version shipped in `image`, e.g. `3.2.1`. Selects the port layout.
    #[serde(default = "default_version")]
    pub version: String,
    pub image: String,
    #[serde(default = "default_image_pull_policy")]
    pub image_pull_policy: String,
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,
    /// Zookeeper connection string used for automatic namenode failover.
    pub zk_quorum: String,
    #[serde(default)]
    pub namenode: NamenodeGroup,
    #[serde(default)]
    pub journalnode: JournalnodeGroup,
    #[serde(default)]
    pub datanode: DatanodeGroup,
    /// Appended to core-site.xml after the generated properties.
    #[serde(default)]
    pub core_site: Vec<ConfigProperty>,
    /// Appended to hdfs-site.xml after the generated properties.
    #[serde(default)]
    pub hdfs_site: Vec<ConfigProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yarn: Option<YarnGroup>,
}

#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigProperty {
    pub property: String,
    pub value: String,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamenodeGroup {
    #[serde(default = "default_namenode_name")]
    pub name: String,
    /// The HA wiring always addresses two namenodes, other values only change the pod count.
    #[serde(default = "default_namenode_replicas")]
    pub replicas: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default = "default_capacity")]
    pub capacity: String,
    #[serde(default)]
    pub volume_claim_templates: Vec<PersistentVolumeClaim>,
}

impl Default for NamenodeGroup {
    fn default() -> Self {
        Self {
            name: default_namenode_name(),
            replicas: default_namenode_replicas(),
            image: None,
            image_pull_policy: None,
            storage_class: None,
            capacity: default_capacity(),
            volume_claim_templates: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalnodeGroup {
    #[serde(default = "default_journalnode_name")]
    pub name: String,
    /// The shared edits URI always addresses three journalnodes.
    #[serde(default = "default_journalnode_replicas")]
    pub replicas: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default = "default_capacity")]
    pub capacity: String,
    #[serde(default)]
    pub volume_claim_templates: Vec<PersistentVolumeClaim>,
}

impl Default for JournalnodeGroup {
    fn default() -> Self {
        Self {
            name: default_journalnode_name(),
            replicas: default_journalnode_replicas(),
            image: None,
            image_pull_policy: None,
            storage_class: None,
            capacity: default_capacity(),
            volume_claim_templates: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatanodeGroup {
    #[serde(default = "default_datanode_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default = "default_capacity")]
    pub capacity: String,
    /// Sub directories of the data mount handed to `dfs.datanode.data.dir`.
    #[serde(default)]
    pub datadirs: Vec<String>,
    /// Node directory backing the data mount of the DaemonSet variant.
    #[serde(default = "default_datanode_host_path")]
    pub host_path: String,
    /// When set, datanodes run as a StatefulSet with one volume claim per replica instead of a
    /// DaemonSet on every node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u16>,
}

impl Default for DatanodeGroup {
    fn default() -> Self {
        Self {
            name: default_datanode_name(),
            image: None,
            image_pull_policy: None,
            storage_class: None,
            capacity: default_capacity(),
            datadirs: Vec::new(),
            host_path: default_datanode_host_path(),
            replicas: None,
        }
    }
}

impl DatanodeGroup {
    /// Configured data directories, `["0"]` when none are given.
    pub fn effective_datadirs(&self) -> Vec<String> {
        if self.datadirs.is_empty() {
            vec![DEFAULT_DATANODE_DATADIR.to_string()]
        } else {
            self.datadirs.clone()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YarnGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub rm_replicas: u16,
    #[serde(default)]
    pub nm_replicas: u16,
    #[serde(default)]
    pub mapred_site: Vec<ConfigProperty>,
    #[serde(default)]
    pub yarn_site: Vec<ConfigProperty>,
}

impl YarnGroup {
    /// An all-default block (`yarn: {}`) counts as absent.
    pub fn is_configured(&self) -> bool {
        *self != YarnGroup::default()
    }

    pub fn name(&self) -> &str {
        if self.name.is_empty() {
            DEFAULT_YARN_NAME
        } else {
            &self.name
        }
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum HdfsRole {
    #[strum(serialize = "namenode")]
    NameNode,
    #[strum(serialize = "journalnode")]
    JournalNode,
    #[strum(serialize = "datanode")]
    DataNode,
    #[strum(serialize = "resourcemanager")]
    ResourceManager,
    #[strum(serialize = "nodemanager")]
    NodeManager,
}

impl HdfsRole {
    /// Replica count the HA wiring is built around, if the role has one.
    pub fn expected_replicas(&self) -> Option<u16> {
        match self {
            HdfsRole::NameNode => Some(HA_NAMENODE_COUNT),
            HdfsRole::JournalNode => Some(JOURNAL_QUORUM_SIZE),
            HdfsRole::DataNode | HdfsRole::ResourceManager | HdfsRole::NodeManager => None,
        }
    }
}

/// A pod of a StatefulSet governed by a headless service of the same name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HdfsPodRef {
    pub namespace: String,
    pub role_group_service_name: String,
    pub ordinal: u16,
}

impl HdfsPodRef {
    pub fn pod_name(&self) -> String {
        format!("{}-{}", self.role_group_service_name, self.ordinal)
    }

    pub fn fqdn(&self) -> String {
        naming::pod_fqdn(&self.role_group_service_name, self.ordinal, &self.namespace)
    }

    pub fn address(&self, port: u16) -> String {
        format!("{}:{port}", self.fqdn())
    }
}

impl HdfsCluster {
    pub fn is_marked_for_deletion(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn hadoop_release(&self) -> HadoopRelease {
        HadoopRelease::from_version(&self.spec.version)
    }

    pub fn port_set(&self) -> PortSet {
        PortSet::for_release(self.hadoop_release())
    }

    /// The YARN block, if it holds anything beyond defaults.
    pub fn yarn(&self) -> Option<&YarnGroup> {
        self.spec.yarn.as_ref().filter(|yarn| yarn.is_configured())
    }

    /// Logical HA name clients use to address the namenode pair.
    pub fn nameservice_id(&self) -> String {
        self.name_any()
    }

    pub fn namenode_name(&self) -> String {
        naming::compose_name(&self.name_any(), &self.spec.namenode.name)
    }

    pub fn journalnode_name(&self) -> String {
        naming::compose_name(&self.name_any(), &self.spec.journalnode.name)
    }

    pub fn datanode_name(&self) -> String {
        naming::compose_name(&self.name_any(), &self.spec.datanode.name)
    }

    pub fn resource_manager_name(&self, yarn: &YarnGroup) -> String {
        format!("{}-rm", naming::compose_name(&self.name_any(), yarn.name()))
    }

    pub fn node_manager_name(&self, yarn: &YarnGroup) -> String {
        format!("{}-nm", naming::compose_name(&self.name_any(), yarn.name()))
    }

    pub fn common_config_name(&self) -> String {
        naming::compose_name(&self.name_any(), "common-config")
    }

    pub fn namenode_scripts_name(&self) -> String {
        naming::compose_name(&self.name_any(), "namenode-scripts")
    }

    pub fn datanode_scripts_name(&self) -> String {
        naming::compose_name(&self.name_any(), "datanode-scripts")
    }

    pub fn yarn_config_name(&self) -> String {
        naming::compose_name(&self.name_any(), "yarn-config")
    }

    /// The two namenodes the HA wiring addresses, independent of the configured replica count.
    pub fn namenode_pod_refs(&self, namespace: &str) -> Vec<HdfsPodRef> {
        self.pod_refs(namespace, self.namenode_name(), HA_NAMENODE_COUNT)
    }

    /// The journal quorum members, independent of the configured replica count.
    pub fn journalnode_pod_refs(&self, namespace: &str) -> Vec<HdfsPodRef> {
        self.pod_refs(namespace, self.journalnode_name(), JOURNAL_QUORUM_SIZE)
    }

    fn pod_refs(&self, namespace: &str, service_name: String, count: u16) -> Vec<HdfsPodRef> {
        (0..count)
            .map(|ordinal| HdfsPodRef {
                namespace: namespace.to_string(),
                role_group_service_name: service_name.clone(),
                ordinal,
            })
            .collect()
    }

    /// Labels shared by every object of the cluster.
    pub fn cluster_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (LABEL_CLUSTER_NAME.to_string(), self.name_any()),
            (LABEL_TYPE.to_string(), APP_NAME.to_string()),
        ])
    }

    /// Labels identifying the pods of one workload, also used as its selector.
    pub fn workload_labels(&self, workload_name: &str) -> BTreeMap<String, String> {
        let mut labels = self.cluster_labels();
        labels.insert(
            LABEL_STATEFULSET_NAME.to_string(),
            workload_name.to_string(),
        );
        labels
    }

    pub fn configured_replicas(&self, role: HdfsRole) -> u16 {
        match role {
            HdfsRole::NameNode => self.spec.namenode.replicas,
            HdfsRole::JournalNode => self.spec.journalnode.replicas,
            HdfsRole::DataNode => self.spec.datanode.replicas.unwrap_or_default(),
            HdfsRole::ResourceManager => self.yarn().map_or(0, |yarn| yarn.rm_replicas),
            HdfsRole::NodeManager => self.yarn().map_or(0, |yarn| yarn.nm_replicas),
        }
    }

    pub fn role_image<'a>(&'a self, image_override: Option<&'a String>) -> &'a str {
        image_override.unwrap_or(&self.spec.image)
    }

    pub fn role_image_pull_policy<'a>(&'a self, policy_override: Option<&'a String>) -> &'a str {
        policy_override.unwrap_or(&self.spec.image_pull_policy)
    }
}

fn default_version() -> String {
    DEFAULT_HADOOP_VERSION.to_string()
}

fn default_image_pull_policy() -> String {
    DEFAULT_IMAGE_PULL_POLICY.to_string()
}

fn default_capacity() -> String {
    DEFAULT_CAPACITY.to_string()
}

fn default_namenode_name() -> String {
    DEFAULT_NAMENODE_NAME.to_string()
}

fn default_journalnode_name() -> String {
    DEFAULT_JOURNALNODE_NAME.to_string()
}

fn default_datanode_name() -> String {
    DEFAULT_DATANODE_NAME.to_string()
}

fn default_datanode_host_path() -> String {
    DEFAULT_DATANODE_HOST_PATH.to_string()
}

fn default_namenode_replicas() -> u16 {
    HA_NAMENODE_COUNT
}

fn default_journalnode_replicas() -> u16 {
    JOURNAL_QUORUM_SIZE
}
