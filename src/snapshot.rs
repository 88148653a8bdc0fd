//! Immutable cluster-state snapshots the update engine consumes and produces.

use crate::blocks::ClusterBlocks;
use crate::settings::Settings;
use serde::Serialize;

/// One observed cluster state: name, replication version, the two settings
/// scopes and the block set in force. Snapshots are values; an update never
/// mutates its input and always yields a fresh snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterSnapshot {
    cluster_name: String,
    version: u64,
    persistent: Settings,
    transient: Settings,
    blocks: ClusterBlocks,
}

impl ClusterSnapshot {
    pub fn builder(cluster_name: impl Into<String>) -> ClusterSnapshotBuilder {
        ClusterSnapshotBuilder {
            cluster_name: cluster_name.into(),
            version: 0,
            persistent: Settings::empty(),
            transient: Settings::empty(),
            blocks: ClusterBlocks::empty(),
        }
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Version assigned by the replication layer; the settings engine carries
    /// it through unchanged.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn persistent(&self) -> &Settings {
        &self.persistent
    }

    pub fn transient(&self) -> &Settings {
        &self.transient
    }

    pub fn blocks(&self) -> &ClusterBlocks {
        &self.blocks
    }

    /// The effective value for `key`: transient masks persistent.
    pub fn effective(&self, key: &str) -> Option<&str> {
        self.transient.get(key).or_else(|| self.persistent.get(key))
    }

    pub fn to_builder(&self) -> ClusterSnapshotBuilder {
        ClusterSnapshotBuilder {
            cluster_name: self.cluster_name.clone(),
            version: self.version,
            persistent: self.persistent.clone(),
            transient: self.transient.clone(),
            blocks: self.blocks.clone(),
        }
    }
}

/// Builder for [`ClusterSnapshot`]. Setters consume and return the builder.
#[derive(Debug, Clone)]
pub struct ClusterSnapshotBuilder {
    cluster_name: String,
    version: u64,
    persistent: Settings,
    transient: Settings,
    blocks: ClusterBlocks,
}

impl ClusterSnapshotBuilder {
    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn persistent(mut self, persistent: Settings) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn transient(mut self, transient: Settings) -> Self {
        self.transient = transient;
        self
    }

    pub fn blocks(mut self, blocks: ClusterBlocks) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn build(self) -> ClusterSnapshot {
        ClusterSnapshot {
            cluster_name: self.cluster_name,
            version: self.version,
            persistent: self.persistent,
            transient: self.transient,
            blocks: self.blocks,
        }
    }
}
