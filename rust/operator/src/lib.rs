pub mod apply;
pub mod config;
pub mod container;
pub mod event;
pub mod hdfs_controller;
pub mod resource;
pub mod scripts;
mod service;
pub mod store;
pub mod topology;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use futures::StreamExt;
use hdfs_ha_crd::HdfsCluster;
use hdfs_controller::HDFS_FULL_CONTROLLER_NAME;
use stackable_operator::{
    client::Client,
    k8s_openapi::api::{
        apps::v1::{DaemonSet, StatefulSet},
        core::v1::{ConfigMap, Service},
    },
    kube::runtime::{
        events::{Recorder, Reporter},
        watcher, Controller,
    },
    logging::controller::report_controller_reconciled,
    namespace::WatchNamespace,
};
use tracing::info_span;
use tracing_futures::Instrument;

/// Watches `HdfsCluster` objects and everything they own until a shutdown signal arrives.
pub async fn create_controller(client: Client, namespace: WatchNamespace) {
    let event_recorder = Arc::new(Recorder::new(
        client.as_kube_client(),
        Reporter {
            controller: HDFS_FULL_CONTROLLER_NAME.to_string(),
            instance: None,
        },
    ));

    Controller::new(
        namespace.get_api::<HdfsCluster>(&client),
        watcher::Config::default(),
    )
    .owns(
        namespace.get_api::<StatefulSet>(&client),
        watcher::Config::default(),
    )
    .owns(
        namespace.get_api::<DaemonSet>(&client),
        watcher::Config::default(),
    )
    .owns(
        namespace.get_api::<Service>(&client),
        watcher::Config::default(),
    )
    .owns(
        namespace.get_api::<ConfigMap>(&client),
        watcher::Config::default(),
    )
    .shutdown_on_signal()
    .run(
        hdfs_controller::reconcile_hdfs,
        hdfs_controller::error_policy,
        Arc::new(hdfs_controller::Ctx {
            client: client.clone(),
            event_recorder: event_recorder.clone(),
        }),
    )
    .for_each_concurrent(
        16, // concurrency limit
        |result| {
            // The event_recorder needs to be shared across all invocations, so that
            // events are correctly aggregated
            let event_recorder = event_recorder.clone();
            async move {
                report_controller_reconciled(&event_recorder, HDFS_FULL_CONTROLLER_NAME, &result)
                    .await;
            }
        },
    )
    .instrument(info_span!("hdfs_controller"))
    .await;
}
