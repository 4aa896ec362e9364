//! Watcher configuration

/// Configuration shared by document and collection watchers
#[derive(Debug, Clone)]
pub struct WatcherConfig {
	/// Name used to tag this watcher's log lines
	pub label: Option<String>,

	/// Publish permission denials on the error channel in addition to
	/// recording them on the watcher state
	pub publish_failures: bool,
}

impl Default for WatcherConfig {
	fn default() -> Self {
		Self { label: None, publish_failures: true }
	}
}

impl WatcherConfig {
	/// Create a configuration with a log label
	pub fn with_label(label: &str) -> Self {
		Self { label: Some(label.to_string()), ..Default::default() }
	}

	/// Validate the configuration and return errors if invalid
	pub fn validate(&self) -> Result<(), String> {
		if let Some(label) = &self.label {
			if label.trim().is_empty() {
				return Err("label must not be empty when set".to_string());
			}
		}
		Ok(())
	}

	pub(crate) fn display_label(&self) -> &str {
		self.label.as_deref().unwrap_or("watcher")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config() {
		let config = WatcherConfig::default();
		assert!(config.publish_failures);
		assert!(config.label.is_none());
		assert!(config.validate().is_ok());
		assert_eq!(config.display_label(), "watcher");
	}

	#[test]
	fn test_config_validation() {
		let mut config = WatcherConfig::with_label("open-incidents");
		assert!(config.validate().is_ok());
		assert_eq!(config.display_label(), "open-incidents");

		config.label = Some("  ".to_string());
		assert!(config.validate().is_err());
	}
}
