//! Hadoop release line detection and the ports that depend on it.

use crate::constants::*;

/// The Hadoop release line a cluster runs. Only Hadoop 3 changes the wiring, every other version
/// (including unparseable ones) is treated as the 2.x line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HadoopRelease {
    Hadoop2,
    Hadoop3,
}

impl HadoopRelease {
    pub fn from_version(version: &str) -> Self {
        match major_version(version) {
            Some(3) => HadoopRelease::Hadoop3,
            _ => HadoopRelease::Hadoop2,
        }
    }

    /// Environment variable pointing at the Hadoop installation inside the image.
    pub fn home_env_var(&self) -> &'static str {
        match self {
            HadoopRelease::Hadoop2 => "HADOOP_PREFIX",
            HadoopRelease::Hadoop3 => "HADOOP_HOME",
        }
    }
}

/// Ports whose defaults moved between Hadoop 2 and Hadoop 3.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PortSet {
    pub namenode_rpc: u16,
    pub namenode_http: u16,
    pub datanode_http: u16,
}

impl PortSet {
    pub const HADOOP2: PortSet = PortSet {
        namenode_rpc: HADOOP2_NAME_NODE_RPC_PORT,
        namenode_http: HADOOP2_NAME_NODE_HTTP_PORT,
        datanode_http: HADOOP2_DATA_NODE_HTTP_PORT,
    };

    pub const HADOOP3: PortSet = PortSet {
        namenode_rpc: HADOOP3_NAME_NODE_RPC_PORT,
        namenode_http: HADOOP3_NAME_NODE_HTTP_PORT,
        datanode_http: HADOOP3_DATA_NODE_HTTP_PORT,
    };

    pub fn for_release(release: HadoopRelease) -> Self {
        match release {
            HadoopRelease::Hadoop2 => Self::HADOOP2,
            HadoopRelease::Hadoop3 => Self::HADOOP3,
        }
    }

    pub fn for_version(version: &str) -> Self {
        Self::for_release(HadoopRelease::from_version(version))
    }
}

/// Extracts the major version of a Hadoop version string.
///
/// Full semantic versions are parsed with [`semver`]. Shorter forms such as `3.2` or `2` fall back to
/// the leading run of digits, so `30.0` yields `30` rather than matching `3`.
pub fn major_version(version: &str) -> Option<u64> {
    let version = version.trim().trim_start_matches(['v', 'V']);
    match semver::Version::parse(version) {
        Ok(parsed) => Some(parsed.major),
        Err(_) => version
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .and_then(|major| major.parse().ok()),
    }
}
