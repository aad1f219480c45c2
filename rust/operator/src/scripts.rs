//! Shell scripts shipped to the pods through ConfigMaps. They are opaque payload for the operator.

use hdfs_ha_crd::{constants::DATA_NODE_SECURE_PORT, version::HadoopRelease};
use indoc::formatdoc;

use crate::container::NAMENODE_NAME_DIR;

pub const NAMENODE_FORMAT_SCRIPT: &str = "format-and-run.sh";
pub const DATANODE_CHECK_SCRIPT: &str = "check-status.sh";

/// Startup script of a namenode pod.
///
/// Pod 0 formats the metadata directory and the failover state in Zookeeper on first start, pod 1
/// bootstraps itself as standby from pod 0. Both then run the failover controller next to the
/// namenode.
pub fn namenode_format_and_run(release: HadoopRelease, nameservice_id: &str) -> String {
    let hadoop_home = release.home_env_var();
    formatdoc! {r#"
        #!/usr/bin/env bash
        set -o errexit
        set -o errtrace
        set -o nounset
        set -o pipefail
        set -o xtrace
        _HDFS_BIN=${hadoop_home}/bin/hdfs
        _METADATA_DIR={NAMENODE_NAME_DIR}/current
        if [[ "$MY_POD" = "$NAMENODE_POD_0" ]]; then
          if [[ ! -d $_METADATA_DIR ]]; then
            $_HDFS_BIN --config $HADOOP_CONF_DIR namenode -format \
                -nonInteractive {nameservice_id} ||
                (rm -rf $_METADATA_DIR; exit 1)
          fi
          _ZKFC_FORMATTED=$_METADATA_DIR/.{nameservice_id}-zkfc-formatted
          if [[ ! -f $_ZKFC_FORMATTED ]]; then
            _OUT=$($_HDFS_BIN --config $HADOOP_CONF_DIR zkfc -formatZK -nonInteractive 2>&1)
            (echo $_OUT | grep -q "FATAL") && exit 1
            touch $_ZKFC_FORMATTED
          fi
        elif [[ "$MY_POD" = "$NAMENODE_POD_1" ]]; then
          if [[ ! -d $_METADATA_DIR ]]; then
            sleep 1m
            $_HDFS_BIN --config $HADOOP_CONF_DIR namenode -bootstrapStandby \
                -nonInteractive ||
                (rm -rf $_METADATA_DIR; exit 1)
          fi
        fi
        nohup $_HDFS_BIN --config $HADOOP_CONF_DIR zkfc &
        $_HDFS_BIN --config $HADOOP_CONF_DIR namenode
    "#}
}

/// Liveness and readiness probe of a datanode: succeeds once the datanode reports the id of the
/// cluster it joined.
pub fn datanode_check_status(datanode_http_port: u16) -> String {
    formatdoc! {r#"
        #!/usr/bin/env bash
        _PORTS="{datanode_http_port} {DATA_NODE_SECURE_PORT}"
        _URL_PATH="jmx?qry=Hadoop:service=DataNode,name=DataNodeInfo"
        _CLUSTER_ID=""
        for _PORT in $_PORTS; do
          _CLUSTER_ID+=$(curl -s http://localhost:${{_PORT}}/$_URL_PATH | \
              grep ClusterId) || true
        done
        echo $_CLUSTER_ID | grep -q -v null
    "#}
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::hadoop3(HadoopRelease::Hadoop3, "_HDFS_BIN=$HADOOP_HOME/bin/hdfs")]
    #[case::hadoop2(HadoopRelease::Hadoop2, "_HDFS_BIN=$HADOOP_PREFIX/bin/hdfs")]
    fn test_namenode_script_binary(#[case] release: HadoopRelease, #[case] expected: &str) {
        let script = namenode_format_and_run(release, "mycluster");

        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains(expected));
        assert!(script.contains("-nonInteractive mycluster"));
        assert!(script.contains("_METADATA_DIR=/hadoop/dfs/name/current"));
    }

    #[rstest]
    #[case(9864, "_PORTS=\"9864 1006\"")]
    #[case(50075, "_PORTS=\"50075 1006\"")]
    fn test_datanode_probe_tracks_ports(#[case] port: u16, #[case] expected: &str) {
        let script = datanode_check_status(port);

        assert!(script.contains(expected));
        assert!(script.contains("http://localhost:${_PORT}/$_URL_PATH"));
    }
}
