use hdfs_ha_crd::{version::PortSet, ConfigProperty, HdfsCluster, HdfsPodRef, YarnGroup};
use snafu::{ensure, Snafu};

use crate::container::{DATANODE_DATA_DIR, JOURNALNODE_EDITS_DIR, NAMENODE_NAME_DIR};

// hdfs-site.xml
pub const DFS_NAME_SERVICES: &str = "dfs.nameservices";
pub const DFS_HA_NAMENODES: &str = "dfs.ha.namenodes";
pub const DFS_NAMENODE_RPC_ADDRESS: &str = "dfs.namenode.rpc-address";
pub const DFS_NAMENODE_HTTP_ADDRESS: &str = "dfs.namenode.http-address";
pub const DFS_NAMENODE_SHARED_EDITS_DIR: &str = "dfs.namenode.shared.edits.dir";
pub const DFS_HA_AUTOMATIC_FAILOVER_ENABLED: &str = "dfs.ha.automatic-failover.enabled";
pub const DFS_HA_FENCING_METHODS: &str = "dfs.ha.fencing.methods";
pub const DFS_JOURNALNODE_EDITS_DIR: &str = "dfs.journalnode.edits.dir";
pub const DFS_CLIENT_FAILOVER_PROXY_PROVIDER: &str = "dfs.client.failover.proxy.provider";
pub const DFS_NAMENODE_NAME_DIR: &str = "dfs.namenode.name.dir";
pub const DFS_NAMENODE_DATANODE_REGISTRATION_IP_HOSTNAME_CHECK: &str =
    "dfs.namenode.datanode.registration.ip-hostname-check";
pub const DFS_DATANODE_DATA_DIR: &str = "dfs.datanode.data.dir";

// core-site.xml
pub const FS_DEFAULT_FS: &str = "fs.defaultFS";
pub const HA_ZOOKEEPER_QUORUM: &str = "ha.zookeeper.quorum";

// mapred-site.xml
pub const MAPREDUCE_FRAMEWORK_NAME: &str = "mapreduce.framework.name";

// yarn-site.xml
pub const YARN_RESOURCEMANAGER_HOSTNAME: &str = "yarn.resourcemanager.hostname";
pub const YARN_NODEMANAGER_VMEM_CHECK_ENABLED: &str = "yarn.nodemanager.vmem-check-enabled";
pub const YARN_NODEMANAGER_AUX_SERVICES: &str = "yarn.nodemanager.aux-services";
pub const YARN_NODEMANAGER_SHUFFLE_CLASS: &str =
    "yarn.nodemanager.aux-services.mapreduce_shuffle.class";
pub const YARN_NODEMANAGER_REMOTE_APP_LOG_DIR: &str = "yarn.nodemanager.remote-app-log-dir";

const FAILOVER_PROXY_PROVIDER_CLASS: &str =
    "org.apache.hadoop.hdfs.server.namenode.ha.ConfiguredFailoverProxyProvider";
const FENCING_METHOD: &str = "shell(/bin/true)";
const SHUFFLE_HANDLER_CLASS: &str = "org.apache.hadoop.mapred.ShuffleHandler";
const YARN_REMOTE_APP_LOG_DIR: &str = "/var/log/hadoop-yarn/apps";

#[derive(Snafu, Debug, PartialEq)]
pub enum Error {
    #[snafu(display("configuration property names must not be empty"))]
    EmptyPropertyName,

    #[snafu(display("configuration property name {name:?} contains the illegal character {character:?}"))]
    IllegalPropertyName { name: String, character: char },

    #[snafu(display("value of configuration property {name:?} contains the illegal character {character:?}"))]
    IllegalPropertyValue { name: String, character: char },
}

/// An ordered list of Hadoop configuration properties.
///
/// Names may repeat: overrides are appended after the generated wiring and Hadoop lets the last
/// occurrence win.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigDocument {
    properties: Vec<(String, String)>,
}

impl ConfigDocument {
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.push((name.into(), value.into()));
    }

    pub fn extend_overrides(&mut self, overrides: &[ConfigProperty]) {
        self.properties.extend(
            overrides
                .iter()
                .map(|o| (o.property.clone(), o.value.clone())),
        );
    }

    /// Effective value of `name`, i.e. its last occurrence.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Serializes into a Hadoop `<configuration>` XML document. Fails without output if any
    /// property cannot be represented.
    pub fn to_hadoop_xml(&self) -> Result<String, Error> {
        for (name, value) in &self.properties {
            validate_property(name, value)?;
        }
        let transformed = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect::<Vec<(String, Option<String>)>>();

        Ok(product_config::writer::to_hadoop_xml(
            transformed.iter().map(|(k, v)| (k, v)),
        ))
    }
}

fn validate_property(name: &str, value: &str) -> Result<(), Error> {
    ensure!(!name.is_empty(), EmptyPropertyNameSnafu);
    if let Some(character) = name
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '<' | '>' | '&' | '"' | '\'') || !is_xml_char(*c))
    {
        return IllegalPropertyNameSnafu { name, character }.fail();
    }
    if let Some(character) = value.chars().find(|c| !is_xml_char(*c)) {
        return IllegalPropertyValueSnafu { name, character }.fail();
    }
    Ok(())
}

/// Characters allowed in XML 1.0 documents.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || (c >= ' ' && c <= '\u{D7FF}')
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || c >= '\u{10000}'
}

fn namenode_id(namenode: &HdfsPodRef) -> String {
    format!("nn{}", namenode.ordinal)
}

#[derive(Clone, Debug, Default)]
pub struct HdfsSiteConfigBuilder {
    config: ConfigDocument,
    logical_name: String,
}

impl HdfsSiteConfigBuilder {
    pub fn new(logical_name: String) -> Self {
        HdfsSiteConfigBuilder {
            config: ConfigDocument::default(),
            logical_name,
        }
    }

    pub fn extend(&mut self, overrides: &[ConfigProperty]) -> &mut Self {
        self.config.extend_overrides(overrides);
        self
    }

    pub fn dfs_name_services(&mut self) -> &mut Self {
        self.config
            .push(DFS_NAME_SERVICES, self.logical_name.clone());
        self
    }

    pub fn dfs_ha_namenodes(&mut self, namenode_podrefs: &[HdfsPodRef]) -> &mut Self {
        self.config.push(
            format!("{}.{}", DFS_HA_NAMENODES, self.logical_name),
            namenode_podrefs
                .iter()
                .map(namenode_id)
                .collect::<Vec<String>>()
                .join(","),
        );
        self
    }

    pub fn dfs_namenode_rpc_address_ha(
        &mut self,
        namenode_podrefs: &[HdfsPodRef],
        port: u16,
    ) -> &mut Self {
        self.dfs_namenode_address_ha(namenode_podrefs, DFS_NAMENODE_RPC_ADDRESS, port)
    }

    pub fn dfs_namenode_http_address_ha(
        &mut self,
        namenode_podrefs: &[HdfsPodRef],
        port: u16,
    ) -> &mut Self {
        self.dfs_namenode_address_ha(namenode_podrefs, DFS_NAMENODE_HTTP_ADDRESS, port)
    }

    fn dfs_namenode_address_ha(
        &mut self,
        namenode_podrefs: &[HdfsPodRef],
        address: &str,
        port: u16,
    ) -> &mut Self {
        for nn in namenode_podrefs {
            self.config.push(
                format!("{}.{}.{}", address, self.logical_name, namenode_id(nn)),
                nn.address(port),
            );
        }
        self
    }

    pub fn dfs_namenode_shared_edits_dir(
        &mut self,
        journalnode_podrefs: &[HdfsPodRef],
        port: u16,
    ) -> &mut Self {
        self.config.push(
            DFS_NAMENODE_SHARED_EDITS_DIR,
            format!(
                "qjournal://{}/{}",
                journalnode_podrefs
                    .iter()
                    .map(|jn| jn.address(port))
                    .collect::<Vec<_>>()
                    .join(";"),
                self.logical_name
            ),
        );
        self
    }

    pub fn dfs_ha_automatic_failover(&mut self) -> &mut Self {
        self.config.push(DFS_HA_AUTOMATIC_FAILOVER_ENABLED, "true");
        self
    }

    pub fn dfs_ha_fencing_methods(&mut self) -> &mut Self {
        self.config.push(DFS_HA_FENCING_METHODS, FENCING_METHOD);
        self
    }

    pub fn dfs_journalnode_edits_dir(&mut self) -> &mut Self {
        self.config
            .push(DFS_JOURNALNODE_EDITS_DIR, JOURNALNODE_EDITS_DIR);
        self
    }

    pub fn dfs_client_failover_proxy_provider(&mut self) -> &mut Self {
        self.config.push(
            format!("{}.{}", DFS_CLIENT_FAILOVER_PROXY_PROVIDER, self.logical_name),
            FAILOVER_PROXY_PROVIDER_CLASS,
        );
        self
    }

    pub fn dfs_namenode_name_dir(&mut self) -> &mut Self {
        self.config
            .push(DFS_NAMENODE_NAME_DIR, format!("file://{NAMENODE_NAME_DIR}"));
        self
    }

    pub fn dfs_namenode_datanode_registration_ip_hostname_check(&mut self) -> &mut Self {
        self.config
            .push(DFS_NAMENODE_DATANODE_REGISTRATION_IP_HOSTNAME_CHECK, "false");
        self
    }

    pub fn dfs_datanode_data_dir(&mut self, datadirs: &[String]) -> &mut Self {
        self.config.push(
            DFS_DATANODE_DATA_DIR,
            datadirs
                .iter()
                .map(|dir| datanode_data_path(dir))
                .collect::<Vec<_>>()
                .join(","),
        );
        self
    }

    pub fn build(&self) -> ConfigDocument {
        self.config.clone()
    }
}

/// Mount path of one datanode data directory.
pub fn datanode_data_path(dir: &str) -> String {
    format!("{DATANODE_DATA_DIR}/{}", dir.trim_start_matches('/'))
}

#[derive(Clone, Debug, Default)]
pub struct CoreSiteConfigBuilder {
    config: ConfigDocument,
    logical_name: String,
}

impl CoreSiteConfigBuilder {
    pub fn new(logical_name: String) -> Self {
        CoreSiteConfigBuilder {
            config: ConfigDocument::default(),
            logical_name,
        }
    }

    pub fn fs_default_fs(&mut self) -> &mut Self {
        self.config
            .push(FS_DEFAULT_FS, format!("hdfs://{}", self.logical_name));
        self
    }

    pub fn ha_zookeeper_quorum(&mut self, quorum: &str) -> &mut Self {
        self.config.push(HA_ZOOKEEPER_QUORUM, quorum);
        self
    }

    pub fn extend(&mut self, overrides: &[ConfigProperty]) -> &mut Self {
        self.config.extend_overrides(overrides);
        self
    }

    pub fn build(&self) -> ConfigDocument {
        self.config.clone()
    }
}

pub fn render_core_site(hdfs: &HdfsCluster) -> ConfigDocument {
    CoreSiteConfigBuilder::new(hdfs.nameservice_id())
        .fs_default_fs()
        .ha_zookeeper_quorum(&hdfs.spec.zk_quorum)
        .extend(&hdfs.spec.core_site)
        .build()
}

pub fn render_hdfs_site(hdfs: &HdfsCluster, namespace: &str, ports: &PortSet) -> ConfigDocument {
    let namenodes = hdfs.namenode_pod_refs(namespace);
    let journalnodes = hdfs.journalnode_pod_refs(namespace);

    HdfsSiteConfigBuilder::new(hdfs.nameservice_id())
        .dfs_name_services()
        .dfs_ha_namenodes(&namenodes)
        .dfs_namenode_rpc_address_ha(&namenodes, ports.namenode_rpc)
        .dfs_namenode_http_address_ha(&namenodes, ports.namenode_http)
        .dfs_namenode_shared_edits_dir(
            &journalnodes,
            hdfs_ha_crd::constants::JOURNAL_NODE_RPC_PORT,
        )
        .dfs_ha_automatic_failover()
        .dfs_ha_fencing_methods()
        .dfs_journalnode_edits_dir()
        .dfs_client_failover_proxy_provider()
        .dfs_namenode_name_dir()
        .dfs_namenode_datanode_registration_ip_hostname_check()
        .dfs_datanode_data_dir(&hdfs.spec.datanode.effective_datadirs())
        .extend(&hdfs.spec.hdfs_site)
        .build()
}

pub fn render_mapred_site(yarn: &YarnGroup) -> ConfigDocument {
    let mut config = ConfigDocument::default();
    config.push(MAPREDUCE_FRAMEWORK_NAME, "yarn");
    config.extend_overrides(&yarn.mapred_site);
    config
}

pub fn render_yarn_site(hdfs: &HdfsCluster, yarn: &YarnGroup, namespace: &str) -> ConfigDocument {
    let resource_manager = hdfs.resource_manager_name(yarn);

    let mut config = ConfigDocument::default();
    config.push(
        YARN_RESOURCEMANAGER_HOSTNAME,
        hdfs_ha_crd::naming::pod_fqdn(&resource_manager, 0, namespace),
    );
    config.push(YARN_NODEMANAGER_VMEM_CHECK_ENABLED, "false");
    config.push(YARN_NODEMANAGER_AUX_SERVICES, "mapreduce_shuffle");
    config.push(YARN_NODEMANAGER_SHUFFLE_CLASS, SHUFFLE_HANDLER_CLASS);
    config.push(YARN_NODEMANAGER_REMOTE_APP_LOG_DIR, YARN_REMOTE_APP_LOG_DIR);
    config.extend_overrides(&yarn.yarn_site);
    config
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;
    use crate::testing::{cluster_from_yaml, MINIMAL_CLUSTER};

    #[test]
    fn test_core_site() {
        let hdfs = cluster_from_yaml(&format!(
            "{MINIMAL_CLUSTER}  coreSite:\n    - property: hadoop.tmp.dir\n      value: /tmp/hadoop\n"
        ));
        let core_site = render_core_site(&hdfs);

        assert_eq!(
            core_site.properties(),
            &[
                (FS_DEFAULT_FS.to_string(), "hdfs://mycluster".to_string()),
                (
                    HA_ZOOKEEPER_QUORUM.to_string(),
                    "zk-0.zk:2181,zk-1.zk:2181,zk-2.zk:2181".to_string()
                ),
                ("hadoop.tmp.dir".to_string(), "/tmp/hadoop".to_string()),
            ]
        );
    }

    #[rstest]
    #[case::hadoop3("3.2.1", 9820, 9870)]
    #[case::hadoop2("2.7.2", 8020, 50070)]
    fn test_hdfs_site_addresses(
        #[case] version: &str,
        #[case] rpc_port: u16,
        #[case] http_port: u16,
    ) {
        let mut hdfs = cluster_from_yaml(MINIMAL_CLUSTER);
        hdfs.spec.version = version.to_string();
        let hdfs_site = render_hdfs_site(&hdfs, "prod", &PortSet::for_version(version));

        assert_eq!(hdfs_site.get("dfs.nameservices"), Some("mycluster"));
        assert_eq!(hdfs_site.get("dfs.ha.namenodes.mycluster"), Some("nn0,nn1"));
        assert_eq!(
            hdfs_site.get("dfs.namenode.rpc-address.mycluster.nn0"),
            Some(format!("mycluster-nn-0.mycluster-nn.prod.svc.cluster.local:{rpc_port}").as_str())
        );
        assert_eq!(
            hdfs_site.get("dfs.namenode.http-address.mycluster.nn1"),
            Some(format!("mycluster-nn-1.mycluster-nn.prod.svc.cluster.local:{http_port}").as_str())
        );
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 3)]
    #[case(4, 5)]
    fn test_hdfs_site_ha_wiring_ignores_replicas(#[case] namenodes: u16, #[case] journalnodes: u16) {
        let mut hdfs = cluster_from_yaml(MINIMAL_CLUSTER);
        hdfs.spec.namenode.replicas = namenodes;
        hdfs.spec.journalnode.replicas = journalnodes;
        let hdfs_site = render_hdfs_site(&hdfs, "prod", &PortSet::HADOOP3);

        let rpc_addresses = hdfs_site
            .properties()
            .iter()
            .filter(|(name, _)| name.starts_with("dfs.namenode.rpc-address."))
            .count();
        let http_addresses = hdfs_site
            .properties()
            .iter()
            .filter(|(name, _)| name.starts_with("dfs.namenode.http-address."))
            .count();
        assert_eq!(rpc_addresses, 2);
        assert_eq!(http_addresses, 2);

        assert_eq!(
            hdfs_site.get(DFS_NAMENODE_SHARED_EDITS_DIR),
            Some(
                "qjournal://mycluster-jn-0.mycluster-jn.prod.svc.cluster.local:8485;\
                 mycluster-jn-1.mycluster-jn.prod.svc.cluster.local:8485;\
                 mycluster-jn-2.mycluster-jn.prod.svc.cluster.local:8485/mycluster"
            )
        );
    }

    #[test]
    fn test_hdfs_site_fixed_wiring_then_overrides() {
        let hdfs = cluster_from_yaml(&format!(
            "{MINIMAL_CLUSTER}  hdfsSite:\n    - property: dfs.replication\n      value: \"2\"\n    - property: dfs.ha.fencing.methods\n      value: sshfence\n"
        ));
        let hdfs_site = render_hdfs_site(&hdfs, "prod", &PortSet::HADOOP3);
        let names = hdfs_site
            .properties()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            vec![
                "dfs.nameservices",
                "dfs.ha.namenodes.mycluster",
                "dfs.namenode.rpc-address.mycluster.nn0",
                "dfs.namenode.rpc-address.mycluster.nn1",
                "dfs.namenode.http-address.mycluster.nn0",
                "dfs.namenode.http-address.mycluster.nn1",
                "dfs.namenode.shared.edits.dir",
                "dfs.ha.automatic-failover.enabled",
                "dfs.ha.fencing.methods",
                "dfs.journalnode.edits.dir",
                "dfs.client.failover.proxy.provider.mycluster",
                "dfs.namenode.name.dir",
                "dfs.namenode.datanode.registration.ip-hostname-check",
                "dfs.datanode.data.dir",
                "dfs.replication",
                "dfs.ha.fencing.methods",
            ]
        );
        // the override is appended, not substituted
        assert_eq!(hdfs_site.properties()[8].1, "shell(/bin/true)");
        assert_eq!(hdfs_site.get(DFS_HA_FENCING_METHODS), Some("sshfence"));
        assert_eq!(
            hdfs_site.get(DFS_NAMENODE_NAME_DIR),
            Some("file:///hadoop/dfs/name")
        );
        assert_eq!(
            hdfs_site.get(DFS_JOURNALNODE_EDITS_DIR),
            Some("/hadoop/dfs/journal")
        );
    }

    #[rstest]
    #[case::default(&[], "/hadoop/dfs/data/0")]
    #[case::single(&["disk1"], "/hadoop/dfs/data/disk1")]
    #[case::several(&["disk1", "/disk2"], "/hadoop/dfs/data/disk1,/hadoop/dfs/data/disk2")]
    fn test_datanode_data_dir(#[case] datadirs: &[&str], #[case] expected: &str) {
        let mut hdfs = cluster_from_yaml(MINIMAL_CLUSTER);
        hdfs.spec.datanode.datadirs = datadirs.iter().map(|d| d.to_string()).collect();
        let hdfs_site = render_hdfs_site(&hdfs, "prod", &PortSet::HADOOP3);

        assert_eq!(hdfs_site.get(DFS_DATANODE_DATA_DIR), Some(expected));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let hdfs = cluster_from_yaml(MINIMAL_CLUSTER);

        assert_eq!(render_core_site(&hdfs), render_core_site(&hdfs));
        assert_eq!(
            render_hdfs_site(&hdfs, "prod", &PortSet::HADOOP2),
            render_hdfs_site(&hdfs, "prod", &PortSet::HADOOP2)
        );
    }

    #[test]
    fn test_yarn_documents() {
        let hdfs = cluster_from_yaml(&format!(
            "{MINIMAL_CLUSTER}  yarn:\n    rmReplicas: 1\n    nmReplicas: 2\n    yarnSite:\n      - property: yarn.nodemanager.resource.memory-mb\n        value: \"8192\"\n"
        ));
        let yarn = hdfs.yarn().expect("yarn is configured");

        let mapred_site = render_mapred_site(yarn);
        assert_eq!(mapred_site.len(), 1);
        assert_eq!(mapred_site.get(MAPREDUCE_FRAMEWORK_NAME), Some("yarn"));

        let yarn_site = render_yarn_site(&hdfs, yarn, "prod");
        assert_eq!(
            yarn_site.get(YARN_RESOURCEMANAGER_HOSTNAME),
            Some("mycluster-yarn-rm-0.mycluster-yarn-rm.prod.svc.cluster.local")
        );
        assert_eq!(
            yarn_site.properties().last().map(|(n, _)| n.as_str()),
            Some("yarn.nodemanager.resource.memory-mb")
        );
        assert_eq!(yarn_site.len(), 6);
    }

    #[test]
    fn test_xml_contains_properties() {
        let hdfs = cluster_from_yaml(MINIMAL_CLUSTER);
        let xml = render_core_site(&hdfs)
            .to_hadoop_xml()
            .expect("valid properties");

        assert!(xml.contains("<configuration>"));
        assert!(xml.contains("<name>fs.defaultFS</name>"));
        assert!(xml.contains("<value>hdfs://mycluster</value>"));
    }

    #[test]
    fn test_xml_escapes_override_values() {
        let mut config = ConfigDocument::default();
        config.extend_overrides(&[ConfigProperty {
            property: "dfs.custom".to_string(),
            value: "a&b<c".to_string(),
        }]);
        let xml = config.to_hadoop_xml().expect("valid properties");

        assert!(xml.contains("<value>a&amp;b&lt;c</value>"));
        assert!(!xml.contains("a&b<c"));
    }

    #[rstest]
    #[case::empty_name("", "x", Error::EmptyPropertyName)]
    #[case::whitespace("dfs replication", "1", Error::IllegalPropertyName { name: "dfs replication".to_string(), character: ' ' })]
    #[case::markup("dfs.<x>", "1", Error::IllegalPropertyName { name: "dfs.<x>".to_string(), character: '<' })]
    #[case::control_value("dfs.replication", "1\u{1}", Error::IllegalPropertyValue { name: "dfs.replication".to_string(), character: '\u{1}' })]
    fn test_malformed_overrides_fail(
        #[case] property: &str,
        #[case] value: &str,
        #[case] expected: Error,
    ) {
        let mut config = ConfigDocument::default();
        config.push("fs.defaultFS", "hdfs://mycluster");
        config.extend_overrides(&[ConfigProperty {
            property: property.to_string(),
            value: value.to_string(),
        }]);

        assert_eq!(config.to_hadoop_xml(), Err(expected));
    }
}
