//! Deterministic names and in-cluster DNS addresses for the objects of an HDFS cluster.
//!
//! All functions here are pure and total.

use std::fmt::Display;

use crate::constants::CLUSTER_DOMAIN;

/// Joins a cluster name and a role (or object) name into `<cluster>-<role>`.
pub fn compose_name(cluster_name: &str, role_name: &str) -> String {
    format!("{cluster_name}-{role_name}")
}

/// Internal DNS name of the headless service `resource_name` in `namespace`.
pub fn service_fqdn(resource_name: &str, namespace: &str) -> String {
    format!("{resource_name}.{namespace}.svc.{CLUSTER_DOMAIN}")
}

/// Internal DNS name of replica `ordinal` of the StatefulSet `resource_name`, which is governed by a
/// headless service of the same name.
pub fn pod_fqdn(resource_name: &str, ordinal: impl Display, namespace: &str) -> String {
    format!(
        "{resource_name}-{ordinal}.{}",
        service_fqdn(resource_name, namespace)
    )
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("mycluster", "nn", "mycluster-nn")]
    #[case("hdfs", "common-config", "hdfs-common-config")]
    #[case("a", "b-rm", "a-b-rm")]
    fn test_compose_name(#[case] cluster: &str, #[case] role: &str, #[case] expected: &str) {
        assert_eq!(compose_name(cluster, role), expected);
    }

    #[test]
    fn test_pod_fqdn() {
        assert_eq!(
            pod_fqdn("mycluster-nn", 1, "prod"),
            "mycluster-nn-1.mycluster-nn.prod.svc.cluster.local"
        );
    }

    #[test]
    fn test_service_fqdn() {
        assert_eq!(
            service_fqdn("mycluster-jn", "data"),
            "mycluster-jn.data.svc.cluster.local"
        );
    }
}
