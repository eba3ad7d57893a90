use crate::error::{DispatchError, Result};
use crate::NotificationChannel;
use serde_json::Value;
use std::collections::HashMap;
use verdant_common::types::ChannelKind;

/// Factory for creating [`NotificationChannel`] instances from JSON
/// configuration.
///
/// Each plugin is registered in the [`ChannelRegistry`] by its `name()`;
/// the runtime validates and instantiates seed channels through the
/// matching plugin.
pub trait ChannelPlugin: Send + Sync {
    /// Plugin type name (e.g. `"email"`, `"chat"`).
    fn name(&self) -> &str;

    /// The channel family instances of this plugin belong to.
    fn kind(&self) -> ChannelKind;

    /// Validates a JSON config blob against this plugin's expected schema.
    ///
    /// # Errors
    ///
    /// Returns an error naming the missing or invalid field.
    fn validate_config(&self, config: &Value) -> Result<()>;

    /// Creates a configured channel instance from a validated config.
    /// `instance_name` identifies this instance in logs.
    fn create_channel(
        &self,
        instance_name: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>>;

    /// Returns a copy of `config` with secrets redacted (passwords and
    /// API keys replaced with `"***"`). Used for config listings.
    fn redact_config(&self, config: &Value) -> Value {
        config.clone()
    }
}

/// Registry of available [`ChannelPlugin`]s.
///
/// # Examples
///
/// ```
/// use verdant_dispatch::plugin::ChannelRegistry;
///
/// let registry = ChannelRegistry::default();
/// assert!(registry.has_plugin("console"));
/// assert!(registry.has_plugin("email"));
/// assert!(!registry.has_plugin("pager"));
/// ```
pub struct ChannelRegistry {
    plugins: HashMap<String, Box<dyn ChannelPlugin>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        let name = plugin.name().to_string();
        self.plugins.insert(name, plugin);
    }

    pub fn create_channel(
        &self,
        type_name: &str,
        instance_name: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let plugin = self
            .plugins
            .get(type_name)
            .ok_or_else(|| DispatchError::UnknownChannelType(type_name.to_string()))?;
        plugin.validate_config(config)?;
        plugin.create_channel(instance_name, config)
    }

    pub fn get_plugin(&self, type_name: &str) -> Option<&dyn ChannelPlugin> {
        self.plugins.get(type_name).map(|p| p.as_ref())
    }

    pub fn has_plugin(&self, type_name: &str) -> bool {
        self.plugins.contains_key(type_name)
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::channels::console::ConsolePlugin));
        registry.register(Box::new(crate::channels::email::EmailPlugin));
        registry.register(Box::new(crate::channels::sms::SmsPlugin));
        registry.register(Box::new(crate::channels::push::PushPlugin));
        registry.register(Box::new(crate::channels::chat::ChatPlugin));
        registry
    }
}
