pub const APP_NAME: &str = "hdfs";
pub const OPERATOR_NAME: &str = "hdfs.dataworkbench.com";

pub const CLUSTER_DOMAIN: &str = "cluster.local";

pub const LABEL_CLUSTER_NAME: &str = "dataworkbench.com/cluster-name";
pub const LABEL_TYPE: &str = "dataworkbench.com/type";
pub const LABEL_STATEFULSET_NAME: &str = "dataworkbench.com/statefulset-name";

pub const DEFAULT_HADOOP_VERSION: &str = "3.2.1";
pub const DEFAULT_IMAGE_PULL_POLICY: &str = "IfNotPresent";
pub const DEFAULT_CAPACITY: &str = "10Gi";
pub const DEFAULT_DATANODE_HOST_PATH: &str = "/mnt/hdfs/dn-data";
pub const DEFAULT_DATANODE_DATADIR: &str = "0";

pub const DEFAULT_NAMENODE_NAME: &str = "nn";
pub const DEFAULT_JOURNALNODE_NAME: &str = "jn";
pub const DEFAULT_DATANODE_NAME: &str = "dn";
pub const DEFAULT_YARN_NAME: &str = "yarn";

/// The HA wiring always addresses exactly this many namenodes.
pub const HA_NAMENODE_COUNT: u16 = 2;
/// The shared edits quorum always addresses exactly this many journalnodes.
pub const JOURNAL_QUORUM_SIZE: u16 = 3;

pub const HDFS_SITE_XML: &str = "hdfs-site.xml";
pub const CORE_SITE_XML: &str = "core-site.xml";
pub const MAPRED_SITE_XML: &str = "mapred-site.xml";
pub const YARN_SITE_XML: &str = "yarn-site.xml";

pub const SERVICE_PORT_NAME_HTTP: &str = "http";
pub const SERVICE_PORT_NAME_FS: &str = "fs";
pub const SERVICE_PORT_NAME_JN: &str = "jn";

pub const HADOOP2_NAME_NODE_RPC_PORT: u16 = 8020;
pub const HADOOP2_NAME_NODE_HTTP_PORT: u16 = 50070;
pub const HADOOP2_DATA_NODE_HTTP_PORT: u16 = 50075;

pub const HADOOP3_NAME_NODE_RPC_PORT: u16 = 9820;
pub const HADOOP3_NAME_NODE_HTTP_PORT: u16 = 9870;
pub const HADOOP3_DATA_NODE_HTTP_PORT: u16 = 9864;

/// Privileged data transfer port checked by the datanode probe next to the HTTP port.
pub const DATA_NODE_SECURE_PORT: u16 = 1006;

pub const JOURNAL_NODE_RPC_PORT: u16 = 8485;
pub const JOURNAL_NODE_HTTP_PORT: u16 = 8480;

pub const RESOURCE_MANAGER_PORTS: [(&str, u16); 5] = [
    ("web", 8088),
    ("scheduler", 8030),
    ("resource", 8031),
    ("address", 8032),
    ("admin", 8033),
];
pub const NODE_MANAGER_PORTS: [(&str, u16); 2] = [("api", 8040), ("web", 8042)];
