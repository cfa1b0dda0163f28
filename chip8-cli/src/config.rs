//! Runtime configuration, loaded from YAML.
use chip8::prelude::*;
use serde::Deserialize;

use crate::error::CliError;

/// Instructions per second when the config doesn't say otherwise.
pub const DEFAULT_CLOCK_FREQUENCY: Hz = Hz(500);

/// ```yaml
/// clock_frequency: 700   # instructions per second, 0 is unthrottled
/// max_steps: 10000       # stop after this many cycles
/// held_keys: [5]         # keys reported as held down
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub clock_frequency: Hz,
    pub max_steps: Option<usize>,
    pub held_keys: Vec<KeyCode>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            clock_frequency: DEFAULT_CLOCK_FREQUENCY,
            max_steps: None,
            held_keys: Vec::new(),
        }
    }
}

impl CliConfig {
    pub fn from_file(filepath: &str) -> Result<Self, CliError> {
        let file = std::fs::File::open(filepath)?;
        let config: CliConfig = serde_yaml::from_reader(file)?;
        log::debug!("loaded config: {:#?}", config);
        Ok(config)
    }

    pub fn vm_conf(&self) -> Chip8Conf {
        Chip8Conf {
            clock_frequency: Some(self.clock_frequency),
        }
    }

    pub fn key_state(&self) -> KeyState {
        let mut keys = KeyState::default();
        for key in &self.held_keys {
            keys[key.index()] = true;
        }
        keys
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: CliConfig = serde_yaml::from_str(
            "clock_frequency: 700\nmax_steps: 20\nheld_keys: [5, 15]\n",
        )
        .unwrap();

        assert_eq!(config.clock_frequency, Hz(700));
        assert_eq!(config.max_steps, Some(20));
        assert_eq!(config.held_keys, vec![KeyCode::Key5, KeyCode::KeyF]);

        let keys = config.key_state();
        assert!(keys[5] && keys[15]);
        assert_eq!(keys.iter().filter(|k| **k).count(), 2);
    }

    #[test]
    fn test_defaults() {
        let config: CliConfig = serde_yaml::from_str("max_steps: 1\n").unwrap();
        assert_eq!(config.clock_frequency, DEFAULT_CLOCK_FREQUENCY);
        assert!(config.held_keys.is_empty());
    }

    #[test]
    fn test_invalid_key() {
        let result: Result<CliConfig, _> = serde_yaml::from_str("held_keys: [16]\n");
        assert!(result.is_err());
    }
}
