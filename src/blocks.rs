//! Operational cluster blocks and their derivation from block-toggle settings.

use crate::settings::{parse_bool, Settings};
use serde::Serialize;
use std::collections::BTreeMap;

/// Toggle setting engaging [`CLUSTER_READ_ONLY_BLOCK`].
pub const SETTING_READ_ONLY: &str = "cluster.blocks.read_only";

/// Toggle setting engaging [`CLUSTER_READ_ONLY_ALLOW_DELETE_BLOCK`].
pub const SETTING_READ_ONLY_ALLOW_DELETE: &str = "cluster.blocks.read_only_allow_delete";

/// The class of operation a block denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockLevel {
    Read,
    Write,
    MetadataRead,
    MetadataWrite,
}

/// A global operational restriction. Identity is the numeric id; the block
/// set keys on it, so re-adding a block with the same id is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterBlock {
    pub id: u32,
    pub description: &'static str,
    pub retryable: bool,
    pub levels: &'static [BlockLevel],
}

impl ClusterBlock {
    pub fn denies(&self, level: BlockLevel) -> bool {
        self.levels.contains(&level)
    }
}

pub const CLUSTER_READ_ONLY_BLOCK: ClusterBlock = ClusterBlock {
    id: 6,
    description: "cluster read-only (api)",
    retryable: false,
    levels: &[BlockLevel::Write, BlockLevel::MetadataWrite],
};

pub const CLUSTER_READ_ONLY_ALLOW_DELETE_BLOCK: ClusterBlock = ClusterBlock {
    id: 13,
    description: "cluster read-only / allow delete (api)",
    retryable: false,
    levels: &[BlockLevel::Write, BlockLevel::MetadataWrite],
};

/// The set of global blocks in force, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterBlocks {
    global: BTreeMap<u32, ClusterBlock>,
}

impl ClusterBlocks {
    pub fn empty() -> Self {
        ClusterBlocks::default()
    }

    pub fn add(&mut self, block: ClusterBlock) {
        self.global.insert(block.id, block);
    }

    pub fn remove(&mut self, id: u32) {
        self.global.remove(&id);
    }

    pub fn contains(&self, id: u32) -> bool {
        self.global.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<&ClusterBlock> {
        self.global.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusterBlock> {
        self.global.values()
    }

    /// True when any block in force denies `level`.
    pub fn denies(&self, level: BlockLevel) -> bool {
        self.global.values().any(|block| block.denies(level))
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }
}

const OWNED_BLOCKS: [(&str, ClusterBlock); 2] = [
    (SETTING_READ_ONLY, CLUSTER_READ_ONLY_BLOCK),
    (
        SETTING_READ_ONLY_ALLOW_DELETE,
        CLUSTER_READ_ONLY_ALLOW_DELETE_BLOCK,
    ),
];

/// Recomputes the owned blocks from the effective view of the two settings
/// maps: a key present in the transient scope masks the persistent one
/// entirely, and an absent or non-`true` value disengages the block. Blocks
/// this mechanism does not own pass through from `prior` untouched.
pub fn derive_blocks(
    prior: &ClusterBlocks,
    persistent: &Settings,
    transient: &Settings,
) -> ClusterBlocks {
    let mut blocks = prior.clone();
    for (setting, block) in OWNED_BLOCKS {
        let engaged = transient
            .get(setting)
            .or_else(|| persistent.get(setting))
            .and_then(parse_bool)
            .unwrap_or(false);
        if engaged {
            blocks.add(block);
        } else {
            blocks.remove(block.id);
        }
    }
    blocks
}
