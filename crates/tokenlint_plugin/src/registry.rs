//! The set of registered checks, partitioned by kind.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::{LogicalLineCheck, PhysicalLineCheck, PluginError, TreeCheck};

/// Registered checks, partitioned into syntax tree, logical line and
/// physical line checks.
///
/// The registry is read-only once built and is shared by all check drivers.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    tree: Vec<Arc<dyn TreeCheck>>,
    logical: Vec<Arc<dyn LogicalLineCheck>>,
    physical: Vec<Arc<dyn PhysicalLineCheck>>,
    names: HashSet<String>,
}

impl CheckRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a syntax tree check.
    pub fn register_tree(&mut self, check: impl TreeCheck + 'static) -> Result<(), PluginError> {
        self.claim(check.name())?;
        self.tree.push(Arc::new(check));
        Ok(())
    }

    /// Registers a logical line check.
    pub fn register_logical(
        &mut self,
        check: impl LogicalLineCheck + 'static,
    ) -> Result<(), PluginError> {
        self.claim(check.name())?;
        self.logical.push(Arc::new(check));
        Ok(())
    }

    /// Registers a physical line check.
    pub fn register_physical(
        &mut self,
        check: impl PhysicalLineCheck + 'static,
    ) -> Result<(), PluginError> {
        self.claim(check.name())?;
        self.physical.push(Arc::new(check));
        Ok(())
    }

    fn claim(&mut self, name: &str) -> Result<(), PluginError> {
        if name.is_empty() {
            return Err(PluginError::EmptyName);
        }
        if !self.names.insert(name.to_string()) {
            return Err(PluginError::duplicate(name));
        }
        debug!("Registered check '{}'", name);
        Ok(())
    }

    /// Syntax tree checks in registration order.
    pub fn tree_checks(&self) -> &[Arc<dyn TreeCheck>] {
        &self.tree
    }

    /// Logical line checks in registration order.
    pub fn logical_checks(&self) -> &[Arc<dyn LogicalLineCheck>] {
        &self.logical
    }

    /// Physical line checks in registration order.
    pub fn physical_checks(&self) -> &[Arc<dyn PhysicalLineCheck>] {
        &self.physical
    }

    /// Total number of registered checks.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true when no check is registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckRegistry")
            .field("tree", &self.tree.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field(
                "logical",
                &self.logical.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field(
                "physical",
                &self.physical.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
