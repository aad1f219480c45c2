//! Access to the objects the reconciler reads and creates.

use std::fmt::Debug;

use async_trait::async_trait;
use hdfs_ha_crd::HdfsCluster;
use serde::{de::DeserializeOwned, Serialize};
use snafu::{ResultExt, Snafu};
use stackable_operator::{
    client::{self, Client, GetApi},
    kube::Resource,
};

use crate::resource::{ClusterResource, ResourceId, ResourceKind};

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("request to the Kubernetes API failed"))]
    Kube { source: client::Error },

    #[snafu(display("{kind} {name:?} has no namespace"))]
    MissingIdentity { kind: ResourceKind, name: String },

    #[snafu(display("request rejected: {message}"))]
    Rejected { message: String },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// Keyed storage of clusters and their child objects.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Option<HdfsCluster>>;

    /// `Ok(None)` if nothing is stored under `id`.
    async fn get(&self, id: &ResourceId) -> Result<Option<ClusterResource>>;

    /// Stores `resource` and returns it as persisted.
    async fn create(&self, resource: &ClusterResource) -> Result<ClusterResource>;
}

/// [`ResourceStore`] backed by the Kubernetes API server.
///
/// Creates go through the operator [`Client`], so they are attributed to its field manager.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_opt<K>(&self, namespace: &str, name: &str) -> Result<Option<K>>
    where
        K: Resource + GetApi<Namespace = str> + Clone + Debug + DeserializeOwned,
        K::DynamicType: Default,
    {
        self.client
            .get_opt::<K>(name, namespace)
            .await
            .context(KubeSnafu)
    }

    async fn create_object<K>(&self, kind: ResourceKind, object: &K) -> Result<K>
    where
        K: Resource + GetApi<Namespace = str> + Clone + Debug + DeserializeOwned + Serialize,
        K::DynamicType: Default,
    {
        if object.meta().namespace.is_none() {
            return MissingIdentitySnafu {
                kind,
                name: object.meta().name.clone().unwrap_or_default(),
            }
            .fail();
        }
        self.client.create(object).await.context(KubeSnafu)
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Option<HdfsCluster>> {
        self.get_opt(namespace, name).await
    }

    async fn get(&self, id: &ResourceId) -> Result<Option<ClusterResource>> {
        let (namespace, name) = (id.namespace.as_str(), id.name.as_str());
        Ok(match id.kind {
            ResourceKind::ConfigMap => self
                .get_opt(namespace, name)
                .await?
                .map(ClusterResource::ConfigMap),
            ResourceKind::Service => self
                .get_opt(namespace, name)
                .await?
                .map(ClusterResource::Service),
            ResourceKind::StatefulSet => self
                .get_opt(namespace, name)
                .await?
                .map(ClusterResource::StatefulSet),
            ResourceKind::DaemonSet => self
                .get_opt(namespace, name)
                .await?
                .map(ClusterResource::DaemonSet),
        })
    }

    async fn create(&self, resource: &ClusterResource) -> Result<ClusterResource> {
        let kind = resource.kind();
        Ok(match resource {
            ClusterResource::ConfigMap(cm) => {
                ClusterResource::ConfigMap(self.create_object(kind, cm).await?)
            }
            ClusterResource::Service(svc) => {
                ClusterResource::Service(self.create_object(kind, svc).await?)
            }
            ClusterResource::StatefulSet(sts) => {
                ClusterResource::StatefulSet(self.create_object(kind, sts).await?)
            }
            ClusterResource::DaemonSet(ds) => {
                ClusterResource::DaemonSet(self.create_object(kind, ds).await?)
            }
        })
    }
}
