// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Thread-safe registry of containers created this session.
//!
//! Cleanup only ever touches names recorded here, so pre-existing containers
//! that happen to share the naming prefix are never removed.

use std::sync::Arc;

use dashmap::DashSet;

use crate::types::ContainerName;

/// Registry of live container names.
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    live: DashSet<ContainerName>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self {
            live: DashSet::new(),
        }
    }

    /// Create a registry wrapped in an Arc for sharing across threads.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Record a freshly created container.
    /// Returns false if the name was already live.
    pub fn track(&self, name: ContainerName) -> bool {
        self.live.insert(name)
    }

    /// Forget a container the engine confirmed removed.
    pub fn release(&self, name: &ContainerName) -> bool {
        self.live.remove(name).is_some()
    }

    pub fn release_all(&self, names: &[ContainerName]) {
        for name in names {
            self.live.remove(name);
        }
    }

    pub fn contains(&self, name: &ContainerName) -> bool {
        self.live.contains(name)
    }

    /// Names still live, sorted for deterministic cleanup order.
    pub fn leftovers(&self) -> Vec<ContainerName> {
        let mut names: Vec<_> = self.live.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
