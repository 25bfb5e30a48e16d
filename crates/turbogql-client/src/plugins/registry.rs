//! Plugin registry for managing plugin ordering and chain execution
//!
//! The PluginRegistry holds the ordered plugin list and drives an
//! [`OperationContext`] through it. Plugins are executed in registration
//! order.

use crate::error::ClientError;
use crate::plugins::context::OperationContext;
use crate::plugins::core::{ClientPlugin, PluginError, PluginResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Ordered set of client plugins
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use turbogql_client::plugins::{CachePlugin, DedupPlugin, PluginRegistry};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut registry = PluginRegistry::new();
/// registry.register_plugin(Arc::new(CachePlugin::new()))?;
/// registry.register_plugin(Arc::new(DedupPlugin::new()))?;
/// assert_eq!(registry.get_plugin_names(), vec!["cache", "dedup"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PluginRegistry {
    /// Registered plugins in execution order
    plugins: Vec<Arc<dyn ClientPlugin>>,

    /// Plugin lookup by name for fast access
    plugin_map: HashMap<String, usize>,
}

impl PluginRegistry {
    /// Create a new empty plugin registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin to the chain
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Configuration`] when a plugin with the same
    /// name is already registered.
    pub fn register_plugin(&mut self, plugin: Arc<dyn ClientPlugin>) -> PluginResult<()> {
        let plugin_name = plugin.name().to_string();

        info!("Registering plugin: {}", plugin_name);

        if self.plugin_map.contains_key(&plugin_name) {
            return Err(PluginError::configuration(format!(
                "Plugin '{}' is already registered",
                plugin_name
            )));
        }

        let index = self.plugins.len();
        self.plugins.push(plugin);
        self.plugin_map.insert(plugin_name.clone(), index);

        debug!(
            "Plugin '{}' registered successfully at index {}",
            plugin_name, index
        );
        Ok(())
    }

    /// Remove a plugin by name
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Configuration`] when no such plugin exists.
    pub fn unregister_plugin(&mut self, plugin_name: &str) -> PluginResult<()> {
        info!("Unregistering plugin: {}", plugin_name);

        let index = self.plugin_map.remove(plugin_name).ok_or_else(|| {
            PluginError::configuration(format!("Plugin '{}' not found", plugin_name))
        })?;

        self.plugins.remove(index);
        for plugin_index in self.plugin_map.values_mut() {
            if *plugin_index > index {
                *plugin_index -= 1;
            }
        }
        Ok(())
    }

    /// Check if a plugin is registered
    pub fn has_plugin(&self, plugin_name: &str) -> bool {
        self.plugin_map.contains_key(plugin_name)
    }

    /// Get a plugin by name
    pub fn get_plugin(&self, plugin_name: &str) -> Option<Arc<dyn ClientPlugin>> {
        self.plugin_map
            .get(plugin_name)
            .and_then(|&index| self.plugins.get(index))
            .cloned()
    }

    /// Get all registered plugin names in execution order
    pub fn get_plugin_names(&self) -> Vec<String> {
        self.plugins
            .iter()
            .map(|plugin| plugin.name().to_string())
            .collect()
    }

    /// Get the number of registered plugins
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Foreground pass: run plugins from the start until one produces an outcome
    ///
    /// Returns the index of the first plugin that has not run.
    ///
    /// # Errors
    ///
    /// The first plugin failure aborts the pass.
    pub async fn run_until_result(
        &self,
        context: &mut OperationContext,
    ) -> Result<usize, ClientError> {
        self.run_chain(0, context, OperationContext::has_outcome)
            .await
    }

    /// Background pass: resume at `start` and run until a plugin terminates
    ///
    /// # Errors
    ///
    /// The first plugin failure aborts the pass.
    pub async fn run_remaining(
        &self,
        start: usize,
        context: &mut OperationContext,
    ) -> Result<usize, ClientError> {
        self.run_chain(start, context, OperationContext::is_terminated)
            .await
    }

    async fn run_chain(
        &self,
        start: usize,
        context: &mut OperationContext,
        stop: fn(&OperationContext) -> bool,
    ) -> Result<usize, ClientError> {
        for (index, plugin) in self.plugins.iter().enumerate().skip(start) {
            let plugin_name = plugin.name();
            debug!(
                "Calling plugin '{}' ({}) for {} {}",
                plugin_name,
                index,
                context.kind(),
                context.key
            );

            plugin.on_operation(context).await.map_err(|e| {
                error!(
                    "Plugin '{}' failed for operation {}: {}",
                    plugin_name, context.key, e
                );
                ClientError::plugin(plugin_name, e)
            })?;

            if stop(context) {
                debug!("Plugin '{}' stopped the chain", plugin_name);
                return Ok(index + 1);
            }
        }

        Ok(self.plugins.len())
    }
}
