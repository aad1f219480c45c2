use hdfs_ha_crd::{HdfsCluster, HdfsRole};
use snafu::{ResultExt, Snafu};
use stackable_operator::{
    k8s_openapi::api::core::v1::ObjectReference,
    kube::runtime::events::{Event, EventType, Recorder},
};
use strum::{EnumDiscriminants, IntoStaticStr};

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("failed to publish event"))]
    PublishEvent {
        source: stackable_operator::kube::Error,
    },
}

/// Publish a Kubernetes warning event for the `hdfs` cluster resource.
pub async fn publish_warning_event(
    recorder: &Recorder,
    hdfs_object_ref: &ObjectReference,
    action: String,
    reason: String,
    message: String,
) -> Result<(), Error> {
    recorder
        .publish(
            &Event {
                action,
                reason,
                note: Some(message),
                type_: EventType::Warning,
                secondary: None,
            },
            hdfs_object_ref,
        )
        .await
        .context(PublishEventSnafu)
}

/// Roles whose HA wiring is built for a fixed replica count complain when configured otherwise.
/// The wiring itself is not affected by the configured count.
pub fn build_invalid_replica_message(hdfs: &HdfsCluster, role: HdfsRole) -> Option<String> {
    let expected = role.expected_replicas()?;
    let replicas = hdfs.configured_replicas(role);

    (replicas != expected).then(|| {
        format!(
            "{role}: has {replicas} replicas configured, but the HA setup always uses exactly [{expected}]"
        )
    })
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;
    use crate::testing::{cluster_from_yaml, MINIMAL_CLUSTER};

    #[rstest]
    #[case::defaults("", HdfsRole::NameNode, None)]
    #[case::defaults("", HdfsRole::JournalNode, None)]
    #[case::datanodes_have_no_fixed_count(
        "  datanode:\n    replicas: 1\n",
        HdfsRole::DataNode,
        None
    )]
    #[case::single_namenode(
        "  namenode:\n    replicas: 1\n",
        HdfsRole::NameNode,
        Some("namenode: has 1 replicas configured, but the HA setup always uses exactly [2]")
    )]
    #[case::five_journalnodes(
        "  journalnode:\n    replicas: 5\n",
        HdfsRole::JournalNode,
        Some("journalnode: has 5 replicas configured, but the HA setup always uses exactly [3]")
    )]
    fn test_invalid_replica_message(
        #[case] extra_spec: &str,
        #[case] role: HdfsRole,
        #[case] expected: Option<&str>,
    ) {
        let hdfs = cluster_from_yaml(&format!("{MINIMAL_CLUSTER}{extra_spec}"));

        assert_eq!(
            build_invalid_replica_message(&hdfs, role).as_deref(),
            expected
        );
    }
}
