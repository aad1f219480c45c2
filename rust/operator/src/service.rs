use stackable_operator::k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};

use crate::topology::ClusterContext;

/// Headless service governing the StatefulSet `name`, giving every replica a stable DNS name.
pub(crate) fn headless_service(ctx: &ClusterContext, name: &str, ports: &[(&str, u16)]) -> Service {
    tracing::info!("Setting up Service {name}");

    let service_spec = ServiceSpec {
        // Internal communication does not need to be exposed
        type_: Some("ClusterIP".to_string()),
        cluster_ip: Some("None".to_string()),
        ports: Some(
            ports
                .iter()
                .map(|(port_name, port)| ServicePort {
                    name: Some(port_name.to_string()),
                    port: i32::from(*port),
                    protocol: Some("TCP".to_string()),
                    ..ServicePort::default()
                })
                .collect(),
        ),
        selector: Some(ctx.hdfs.workload_labels(name)),
        publish_not_ready_addresses: Some(true),
        ..ServiceSpec::default()
    };

    Service {
        metadata: ctx.object_meta(name, ctx.hdfs.workload_labels(name)),
        spec: Some(service_spec),
        status: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{cluster_from_yaml, MINIMAL_CLUSTER};

    #[test]
    fn test_headless_service() {
        let hdfs = cluster_from_yaml(MINIMAL_CLUSTER);
        let ctx = ClusterContext::new(&hdfs, hdfs.port_set()).expect("valid cluster");
        let service = headless_service(&ctx, "mycluster-jn", &[("jn", 8485), ("http", 8480)]);
        let spec = service.spec.expect("service spec");

        assert_eq!(service.metadata.name.as_deref(), Some("mycluster-jn"));
        assert_eq!(service.metadata.namespace.as_deref(), Some("prod"));
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
        assert_eq!(spec.publish_not_ready_addresses, Some(true));
        assert_eq!(spec.selector, Some(hdfs.workload_labels("mycluster-jn")));
        assert_eq!(
            spec.ports
                .unwrap_or_default()
                .into_iter()
                .map(|p| (p.name.unwrap_or_default(), p.port))
                .collect::<Vec<_>>(),
            vec![("jn".to_string(), 8485), ("http".to_string(), 8480)]
        );
    }
}
