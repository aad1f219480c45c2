//! Fixtures shared by the unit tests of this crate.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Mutex,
};

use async_trait::async_trait;
use hdfs_ha_crd::HdfsCluster;
use indoc::indoc;
use stackable_operator::{
    k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference, kube::ResourceExt,
};

use crate::{
    resource::{ClusterResource, ResourceId},
    store::{Error, ResourceStore},
};

/// Ends inside the `spec` block, so tests can append further spec fields indented by two spaces.
pub const MINIMAL_CLUSTER: &str = indoc! {"
    apiVersion: hdfs.dataworkbench.com/v1
    kind: HdfsCluster
    metadata:
      name: mycluster
      namespace: prod
      uid: 1d9e3b4c-5a6f-4e7d-8c9b-0a1b2c3d4e5f
    spec:
      image: uhopper/hadoop:3.2.1
      zkQuorum: zk-0.zk:2181,zk-1.zk:2181,zk-2.zk:2181
"};

pub fn cluster_from_yaml(yaml: &str) -> HdfsCluster {
    serde_yaml::from_str(yaml).expect("illegal test input")
}

pub fn test_owner() -> OwnerReference {
    OwnerReference {
        api_version: "hdfs.dataworkbench.com/v1".to_string(),
        kind: "HdfsCluster".to_string(),
        name: "mycluster".to_string(),
        uid: "1d9e3b4c-5a6f-4e7d-8c9b-0a1b2c3d4e5f".to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Calls {
    pub get_cluster: usize,
    pub get: usize,
    pub create: usize,
}

/// [`ResourceStore`] keeping everything in memory and counting requests.
#[derive(Default)]
pub struct InMemoryStore {
    clusters: Mutex<BTreeMap<(String, String), HdfsCluster>>,
    resources: Mutex<BTreeMap<ResourceId, ClusterResource>>,
    failing_creates: BTreeSet<String>,
    failing_gets: BTreeSet<String>,
    calls: Mutex<Calls>,
}

impl InMemoryStore {
    pub fn with_cluster(self, hdfs: HdfsCluster) -> Self {
        let key = (hdfs.namespace().unwrap_or_default(), hdfs.name_any());
        self.clusters.lock().unwrap().insert(key, hdfs);
        self
    }

    /// Rejects every create of an object called `name`, whatever its kind.
    pub fn fail_create_of(mut self, name: &str) -> Self {
        self.failing_creates.insert(name.to_string());
        self
    }

    /// Rejects every lookup of an object called `name`, whatever its kind.
    pub fn fail_get_of(mut self, name: &str) -> Self {
        self.failing_gets.insert(name.to_string());
        self
    }

    pub fn insert(&self, resource: ClusterResource) {
        let id = resource.id().expect("test resource has name and namespace");
        self.resources.lock().unwrap().insert(id, resource);
    }

    pub fn stored(&self, id: &ResourceId) -> Option<ClusterResource> {
        self.resources.lock().unwrap().get(id).cloned()
    }

    pub fn stored_count(&self) -> usize {
        self.resources.lock().unwrap().len()
    }

    pub fn calls(&self) -> Calls {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Option<HdfsCluster>, Error> {
        self.calls.lock().unwrap().get_cluster += 1;
        Ok(self
            .clusters
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn get(&self, id: &ResourceId) -> Result<Option<ClusterResource>, Error> {
        self.calls.lock().unwrap().get += 1;
        if self.failing_gets.contains(&id.name) {
            return Err(Error::Rejected {
                message: format!("lookup of {} refused", id.name),
            });
        }
        Ok(self.stored(id))
    }

    async fn create(&self, resource: &ClusterResource) -> Result<ClusterResource, Error> {
        self.calls.lock().unwrap().create += 1;
        let id = resource.id().ok_or_else(|| Error::Rejected {
            message: "resource has no identity".to_string(),
        })?;
        if self.failing_creates.contains(&id.name) {
            return Err(Error::Rejected {
                message: format!("creation of {} refused", id.name),
            });
        }

        let mut resources = self.resources.lock().unwrap();
        if resources.contains_key(&id) {
            return Err(Error::Rejected {
                message: format!("{id} already exists"),
            });
        }
        resources.insert(id, resource.clone());
        Ok(resource.clone())
    }
}
