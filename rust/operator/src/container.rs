//! Pod templates, containers and volumes of every role.
//!
//! Each template is assembled as one struct literal from parts computed up front, so volumes and
//! their mounts are always derived from the same names.

use std::collections::BTreeMap;

use hdfs_ha_crd::{constants::*, version::PortSet, HdfsCluster, YarnGroup};
use stackable_operator::k8s_openapi::{
    api::core::v1::{
        ConfigMapProjection, ConfigMapVolumeSource, Container, ContainerPort, EnvVar,
        EnvVarSource, ExecAction, HostPathVolumeSource, LocalObjectReference, ObjectFieldSelector,
        PersistentVolumeClaim, PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec, Probe,
        ProjectedVolumeSource, SecurityContext, Volume, VolumeMount, VolumeProjection,
        VolumeResourceRequirements,
    },
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta},
};

use crate::{
    config::datanode_data_path,
    scripts::{DATANODE_CHECK_SCRIPT, NAMENODE_FORMAT_SCRIPT},
};

pub const HADOOP_CUSTOM_CONF_DIR: &str = "/etc/hadoop-custom-conf";
pub const HADOOP_CONF_DIR: &str = "/etc/hadoop";
pub const CONFIG_VOLUME_NAME: &str = "hdfs-config";

pub const NAMENODE_SCRIPTS_VOLUME_NAME: &str = "nn-scripts";
pub const NAMENODE_SCRIPTS_DIR: &str = "/nn-scripts";
pub const DATANODE_SCRIPTS_VOLUME_NAME: &str = "dn-scripts";
pub const DATANODE_SCRIPTS_DIR: &str = "/dn-scripts";
pub const SCRIPTS_MODE: i32 = 0o744;

pub const NAMENODE_PVC_NAME: &str = "metadatadir";
pub const NAMENODE_NAME_DIR: &str = "/hadoop/dfs/name";
pub const JOURNALNODE_PVC_NAME: &str = "editdir";
pub const JOURNALNODE_EDITS_DIR: &str = "/hadoop/dfs/journal";
pub const DATANODE_DATA_VOLUME_NAME: &str = "hdfs-data";
pub const DATANODE_DATA_DIR: &str = "/hadoop/dfs/data";

const DNS_POLICY_HOST_NETWORK: &str = "ClusterFirstWithHostNet";
const RESTART_POLICY_ALWAYS: &str = "Always";
const PROBE_INITIAL_DELAY_SECONDS: i32 = 60;
const PROBE_PERIOD_SECONDS: i32 = 30;

/// How datanode data directories are backed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataStorage {
    /// Directory on the node, used by the DaemonSet variant.
    HostPath,
    /// Per replica volume claim, used by the StatefulSet variant.
    VolumeClaim,
}

pub fn namenode_pod_template(hdfs: &HdfsCluster, ports: &PortSet) -> PodTemplateSpec {
    let name = hdfs.namenode_name();
    let group = &hdfs.spec.namenode;

    let container = Container {
        name: name.clone(),
        image: Some(hdfs.role_image(group.image.as_ref()).to_string()),
        image_pull_policy: Some(
            hdfs.role_image_pull_policy(group.image_pull_policy.as_ref())
                .to_string(),
        ),
        command: Some(vec!["/bin/sh".to_string(), "-c".to_string()]),
        args: Some(vec![format!(
            "/entrypoint.sh \"{NAMENODE_SCRIPTS_DIR}/{NAMENODE_FORMAT_SCRIPT}\""
        )]),
        env: Some(
            [
                base_env_vars(),
                vec![
                    pod_name_env_var("MY_POD"),
                    env_var("NAMENODE_POD_0", &format!("{name}-0")),
                    env_var("NAMENODE_POD_1", &format!("{name}-1")),
                ],
            ]
            .concat(),
        ),
        ports: Some(container_ports(&[
            (SERVICE_PORT_NAME_HTTP, ports.namenode_http),
            (SERVICE_PORT_NAME_FS, ports.namenode_rpc),
        ])),
        volume_mounts: Some(vec![
            volume_mount(NAMENODE_SCRIPTS_VOLUME_NAME, NAMENODE_SCRIPTS_DIR, None),
            config_volume_mount(),
            volume_mount(NAMENODE_PVC_NAME, NAMENODE_NAME_DIR, Some("name")),
        ]),
        ..Container::default()
    };

    pod_template(
        hdfs,
        &name,
        PodSpec {
            containers: vec![container],
            volumes: Some(sorted_volumes(vec![
                config_map_volume(
                    NAMENODE_SCRIPTS_VOLUME_NAME,
                    &hdfs.namenode_scripts_name(),
                    Some(SCRIPTS_MODE),
                ),
                config_map_volume(CONFIG_VOLUME_NAME, &hdfs.common_config_name(), None),
            ])),
            host_network: Some(true),
            dns_policy: Some(DNS_POLICY_HOST_NETWORK.to_string()),
            ..base_pod_spec(hdfs)
        },
    )
}

pub fn journalnode_pod_template(hdfs: &HdfsCluster) -> PodTemplateSpec {
    let name = hdfs.journalnode_name();
    let group = &hdfs.spec.journalnode;

    let container = Container {
        name: name.clone(),
        image: Some(hdfs.role_image(group.image.as_ref()).to_string()),
        image_pull_policy: Some(
            hdfs.role_image_pull_policy(group.image_pull_policy.as_ref())
                .to_string(),
        ),
        command: Some(vec!["/entrypoint.sh".to_string()]),
        args: Some(hadoop_daemon_args(hdfs, "hdfs", "journalnode")),
        env: Some(base_env_vars()),
        ports: Some(container_ports(&[
            (SERVICE_PORT_NAME_JN, JOURNAL_NODE_RPC_PORT),
            (SERVICE_PORT_NAME_HTTP, JOURNAL_NODE_HTTP_PORT),
        ])),
        volume_mounts: Some(vec![
            config_volume_mount(),
            volume_mount(JOURNALNODE_PVC_NAME, JOURNALNODE_EDITS_DIR, Some("journal")),
            volume_mount(JOURNALNODE_PVC_NAME, NAMENODE_NAME_DIR, Some("name")),
        ]),
        ..Container::default()
    };

    pod_template(
        hdfs,
        &name,
        PodSpec {
            containers: vec![container],
            volumes: Some(vec![config_map_volume(
                CONFIG_VOLUME_NAME,
                &hdfs.common_config_name(),
                None,
            )]),
            host_network: Some(true),
            dns_policy: Some(DNS_POLICY_HOST_NETWORK.to_string()),
            ..base_pod_spec(hdfs)
        },
    )
}

pub fn datanode_pod_template(
    hdfs: &HdfsCluster,
    ports: &PortSet,
    storage: DataStorage,
) -> PodTemplateSpec {
    let name = hdfs.datanode_name();
    let group = &hdfs.spec.datanode;

    let probe = Probe {
        exec: Some(ExecAction {
            command: Some(vec![format!(
                "{DATANODE_SCRIPTS_DIR}/{DATANODE_CHECK_SCRIPT}"
            )]),
        }),
        initial_delay_seconds: Some(PROBE_INITIAL_DELAY_SECONDS),
        period_seconds: Some(PROBE_PERIOD_SECONDS),
        ..Probe::default()
    };

    let data_mounts = group
        .effective_datadirs()
        .iter()
        .map(|dir| {
            volume_mount(
                DATANODE_DATA_VOLUME_NAME,
                &datanode_data_path(dir),
                Some(dir.trim_start_matches('/')),
            )
        })
        .collect::<Vec<_>>();

    let container = Container {
        name: name.clone(),
        image: Some(hdfs.role_image(group.image.as_ref()).to_string()),
        image_pull_policy: Some(
            hdfs.role_image_pull_policy(group.image_pull_policy.as_ref())
                .to_string(),
        ),
        command: Some(vec!["/entrypoint.sh".to_string()]),
        args: Some(hadoop_daemon_args(hdfs, "hdfs", "datanode")),
        env: Some(base_env_vars()),
        ports: Some(container_ports(&[(
            SERVICE_PORT_NAME_HTTP,
            ports.datanode_http,
        )])),
        volume_mounts: Some(
            [
                data_mounts,
                vec![
                    volume_mount(DATANODE_SCRIPTS_VOLUME_NAME, DATANODE_SCRIPTS_DIR, None),
                    config_volume_mount(),
                ],
            ]
            .concat(),
        ),
        liveness_probe: Some(probe.clone()),
        readiness_probe: Some(probe),
        security_context: Some(SecurityContext {
            privileged: Some(true),
            ..SecurityContext::default()
        }),
        ..Container::default()
    };

    let mut volumes = vec![
        config_map_volume(
            DATANODE_SCRIPTS_VOLUME_NAME,
            &hdfs.datanode_scripts_name(),
            Some(SCRIPTS_MODE),
        ),
        config_map_volume(CONFIG_VOLUME_NAME, &hdfs.common_config_name(), None),
    ];
    if storage == DataStorage::HostPath {
        volumes.push(Volume {
            name: DATANODE_DATA_VOLUME_NAME.to_string(),
            host_path: Some(HostPathVolumeSource {
                path: group.host_path.clone(),
                type_: Some("DirectoryOrCreate".to_string()),
            }),
            ..Volume::default()
        });
    }

    pod_template(
        hdfs,
        &name,
        PodSpec {
            containers: vec![container],
            volumes: Some(sorted_volumes(volumes)),
            host_network: Some(true),
            host_pid: Some(true),
            dns_policy: Some(DNS_POLICY_HOST_NETWORK.to_string()),
            ..base_pod_spec(hdfs)
        },
    )
}

/// Which YARN daemon a pod runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum YarnDaemon {
    ResourceManager,
    NodeManager,
}

impl YarnDaemon {
    fn command(&self) -> &'static str {
        match self {
            YarnDaemon::ResourceManager => "resourcemanager",
            YarnDaemon::NodeManager => "nodemanager",
        }
    }

    pub fn ports(&self) -> &'static [(&'static str, u16)] {
        match self {
            YarnDaemon::ResourceManager => &RESOURCE_MANAGER_PORTS,
            YarnDaemon::NodeManager => &NODE_MANAGER_PORTS,
        }
    }
}

pub fn yarn_pod_template(
    hdfs: &HdfsCluster,
    yarn: &YarnGroup,
    daemon: YarnDaemon,
) -> PodTemplateSpec {
    let name = match daemon {
        YarnDaemon::ResourceManager => hdfs.resource_manager_name(yarn),
        YarnDaemon::NodeManager => hdfs.node_manager_name(yarn),
    };

    let container = Container {
        name: name.clone(),
        image: Some(hdfs.role_image(yarn.image.as_ref()).to_string()),
        image_pull_policy: Some(hdfs.spec.image_pull_policy.clone()),
        command: Some(vec!["/entrypoint.sh".to_string()]),
        args: Some(hadoop_daemon_args(hdfs, "yarn", daemon.command())),
        env: Some(base_env_vars()),
        ports: Some(container_ports(daemon.ports())),
        volume_mounts: Some(vec![config_volume_mount()]),
        ..Container::default()
    };

    // YARN daemons need the HDFS client configuration next to their own.
    let config_volume = Volume {
        name: CONFIG_VOLUME_NAME.to_string(),
        projected: Some(ProjectedVolumeSource {
            sources: Some(
                [hdfs.common_config_name(), hdfs.yarn_config_name()]
                    .into_iter()
                    .map(|config_map| VolumeProjection {
                        config_map: Some(ConfigMapProjection {
                            name: config_map,
                            optional: Some(false),
                            ..ConfigMapProjection::default()
                        }),
                        ..VolumeProjection::default()
                    })
                    .collect(),
            ),
            ..ProjectedVolumeSource::default()
        }),
        ..Volume::default()
    };

    pod_template(
        hdfs,
        &name,
        PodSpec {
            containers: vec![container],
            volumes: Some(vec![config_volume]),
            ..base_pod_spec(hdfs)
        },
    )
}

/// Volume claim templates of a role: the user supplied ones, or a single `default_name` claim.
pub fn volume_claim_templates(
    templates: &[PersistentVolumeClaim],
    default_name: &str,
    storage_class: Option<&String>,
    capacity: &str,
) -> Vec<PersistentVolumeClaim> {
    if templates.is_empty() {
        vec![persistent_volume_claim(default_name, storage_class, capacity)]
    } else {
        templates.to_vec()
    }
}

pub fn persistent_volume_claim(
    name: &str,
    storage_class: Option<&String>,
    capacity: &str,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name: storage_class.cloned(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(capacity.to_string()),
                )])),
                ..VolumeResourceRequirements::default()
            }),
            ..PersistentVolumeClaimSpec::default()
        }),
        ..PersistentVolumeClaim::default()
    }
}

fn pod_template(hdfs: &HdfsCluster, workload_name: &str, spec: PodSpec) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(hdfs.workload_labels(workload_name)),
            ..ObjectMeta::default()
        }),
        spec: Some(spec),
    }
}

fn base_pod_spec(hdfs: &HdfsCluster) -> PodSpec {
    PodSpec {
        restart_policy: Some(RESTART_POLICY_ALWAYS.to_string()),
        image_pull_secrets: (!hdfs.spec.image_pull_secrets.is_empty()).then(|| {
            hdfs.spec
                .image_pull_secrets
                .iter()
                .map(|name| LocalObjectReference { name: name.clone() })
                .collect()
        }),
        ..PodSpec::default()
    }
}

fn hadoop_daemon_args(hdfs: &HdfsCluster, binary: &str, daemon: &str) -> Vec<String> {
    vec![
        format!("/opt/hadoop-{}/bin/{binary}", hdfs.spec.version),
        "--config".to_string(),
        HADOOP_CONF_DIR.to_string(),
        daemon.to_string(),
    ]
}

fn base_env_vars() -> Vec<EnvVar> {
    vec![
        env_var("HADOOP_CUSTOM_CONF_DIR", HADOOP_CUSTOM_CONF_DIR),
        env_var("MULTIHOMED_NETWORK", "0"),
    ]
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    }
}

fn pod_name_env_var(name: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: "metadata.name".to_string(),
                api_version: None,
            }),
            ..EnvVarSource::default()
        }),
    }
}

fn container_ports(ports: &[(&str, u16)]) -> Vec<ContainerPort> {
    ports
        .iter()
        .map(|(name, port)| ContainerPort {
            name: Some(name.to_string()),
            container_port: i32::from(*port),
            protocol: Some("TCP".to_string()),
            ..ContainerPort::default()
        })
        .collect()
}

fn config_map_volume(volume_name: &str, config_map_name: &str, default_mode: Option<i32>) -> Volume {
    Volume {
        name: volume_name.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map_name.to_string(),
            default_mode,
            optional: Some(false),
            ..ConfigMapVolumeSource::default()
        }),
        ..Volume::default()
    }
}

fn config_volume_mount() -> VolumeMount {
    VolumeMount {
        read_only: Some(true),
        ..volume_mount(CONFIG_VOLUME_NAME, HADOOP_CUSTOM_CONF_DIR, None)
    }
}

fn volume_mount(name: &str, mount_path: &str, sub_path: Option<&str>) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: mount_path.to_string(),
        sub_path: sub_path.map(str::to_string),
        ..VolumeMount::default()
    }
}

fn sorted_volumes(mut volumes: Vec<Volume>) -> Vec<Volume> {
    volumes.sort_by(|a, b| a.name.cmp(&b.name));
    volumes
}
