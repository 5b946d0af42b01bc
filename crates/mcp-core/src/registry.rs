//! Name-keyed tool registry

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::tool::{Tool, ToolDescriptor};

struct Entry {
    descriptor: ToolDescriptor,
    tool: Arc<dyn Tool>,
}

/// Maps tool names to tool instances.
///
/// Registering an existing name replaces the earlier tool (last write
/// wins). The lock is never held across a tool call, and a poisoned lock is
/// recovered so a panic elsewhere cannot disable lookups.
#[derive(Default)]
pub struct ToolRegistry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        let descriptor = tool.descriptor();
        let name = descriptor.name.clone();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries
            .insert(name.clone(), Entry { descriptor, tool })
            .is_some()
        {
            warn!(tool = %name, "tool re-registered, replacing previous entry");
        } else {
            debug!(tool = %name, "tool registered");
        }
    }

    /// Remove `name`; no-op if it was never registered.
    pub fn unregister(&self, name: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.remove(name).is_some() {
            debug!(tool = %name, "tool unregistered");
        }
    }

    pub fn lookup(&self, name: &str) -> Option<(ToolDescriptor, Arc<dyn Tool>)> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(name)
            .map(|entry| (entry.descriptor.clone(), entry.tool.clone()))
    }

    /// Descriptors sorted by name.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut descriptors: Vec<ToolDescriptor> =
            entries.values().map(|entry| entry.descriptor.clone()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn names(&self) -> Vec<String> {
        self.list().into_iter().map(|d| d.name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
