use std::fmt::{self, Display};

use stackable_operator::k8s_openapi::{
    api::{
        apps::v1::{DaemonSet, StatefulSet},
        core::v1::{ConfigMap, Service},
    },
    apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference},
};

#[derive(Clone, Copy, Debug, strum::Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ResourceKind {
    ConfigMap,
    Service,
    StatefulSet,
    DaemonSet,
}

/// Where a child resource lives in the store.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// A child object of an [`hdfs_ha_crd::HdfsCluster`].
#[derive(Clone, Debug, PartialEq)]
pub enum ClusterResource {
    ConfigMap(ConfigMap),
    Service(Service),
    StatefulSet(StatefulSet),
    DaemonSet(DaemonSet),
}

impl ClusterResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ClusterResource::ConfigMap(_) => ResourceKind::ConfigMap,
            ClusterResource::Service(_) => ResourceKind::Service,
            ClusterResource::StatefulSet(_) => ResourceKind::StatefulSet,
            ClusterResource::DaemonSet(_) => ResourceKind::DaemonSet,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ClusterResource::ConfigMap(cm) => &cm.metadata,
            ClusterResource::Service(svc) => &svc.metadata,
            ClusterResource::StatefulSet(sts) => &sts.metadata,
            ClusterResource::DaemonSet(ds) => &ds.metadata,
        }
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ClusterResource::ConfigMap(cm) => &mut cm.metadata,
            ClusterResource::Service(svc) => &mut svc.metadata,
            ClusterResource::StatefulSet(sts) => &mut sts.metadata,
            ClusterResource::DaemonSet(ds) => &mut ds.metadata,
        }
    }

    /// `None` if the object lacks a name or a namespace.
    pub fn id(&self) -> Option<ResourceId> {
        let metadata = self.metadata();
        Some(ResourceId::new(
            self.kind(),
            metadata.namespace.clone()?,
            metadata.name.clone()?,
        ))
    }

    /// Adds `owner` to the owner references unless a reference to the same object is present.
    pub fn stamp_owner_reference(&mut self, owner: &OwnerReference) {
        let owner_references = self.metadata_mut().owner_references.get_or_insert_with(Vec::new);
        if !owner_references.iter().any(|r| r.uid == owner.uid) {
            owner_references.push(owner.clone());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn owner(uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: "hdfs.dataworkbench.com/v1".to_string(),
            kind: "HdfsCluster".to_string(),
            name: "mycluster".to_string(),
            uid: uid.to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    fn config_map(name: Option<&str>, namespace: Option<&str>) -> ClusterResource {
        ClusterResource::ConfigMap(ConfigMap {
            metadata: ObjectMeta {
                name: name.map(str::to_string),
                namespace: namespace.map(str::to_string),
                ..ObjectMeta::default()
            },
            ..ConfigMap::default()
        })
    }

    #[test]
    fn test_id() {
        assert_eq!(
            config_map(Some("mycluster-common-config"), Some("prod"))
                .id()
                .map(|id| id.to_string()),
            Some("ConfigMap prod/mycluster-common-config".to_string())
        );
        assert_eq!(config_map(Some("orphan"), None).id(), None);
        assert_eq!(config_map(None, Some("prod")).id(), None);
    }

    #[test]
    fn test_stamp_owner_reference_is_idempotent() {
        let mut resource = config_map(Some("mycluster-common-config"), Some("prod"));
        resource.stamp_owner_reference(&owner("uid-1"));
        resource.stamp_owner_reference(&owner("uid-1"));
        resource.stamp_owner_reference(&owner("uid-2"));

        let uids = resource
            .metadata()
            .owner_references
            .iter()
            .flatten()
            .map(|r| r.uid.as_str())
            .collect::<Vec<_>>();
        assert_eq!(uids, vec!["uid-1", "uid-2"]);
    }
}
