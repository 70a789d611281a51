use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::chord::Chord;
use crate::engine::HotkeyMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Initial state of the hotkey execution gate
    #[serde(default = "default_execute_hotkeys")]
    pub execute_hotkeys: bool,
    /// `tracing` filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub hotkeys: Vec<HotkeyBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HotkeyBinding {
    /// Chord such as `LCTRL+F1` or `LALT+XBUTTON1`
    pub keys: String,
    /// Sound played when the chord is formed
    pub sound: String,
}

fn default_execute_hotkeys() -> bool {
    true
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            execute_hotkeys: default_execute_hotkeys(),
            log_filter: default_log_filter(),
            hotkeys: vec![HotkeyBinding {
                keys: "LCTRL+F1".to_string(),
                sound: "sounds/airhorn.wav".to_string(),
            }],
        }
    }
}

impl AppConfig {
    /// Load config from file, or create default if not exists
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if !path.as_ref().exists() {
            let default_config = Self::default();
            default_config.save_to_file(&path)?;
            return Ok(default_config);
        }
        Self::load_from_file(path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;

        if config.log_filter.trim().is_empty() {
            config.log_filter = default_log_filter();
        }

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let mut result = format!(
            "execute_hotkeys = {}        # Trigger sounds when a bound chord is pressed\n\
             log_filter = {:?}           # Log filter, overridden by RUST_LOG\n\n\
             # Hotkey definitions: `keys` joins key names with '+'\n",
            self.execute_hotkeys, self.log_filter
        );

        for binding in &self.hotkeys {
            result.push_str("[[hotkeys]]\n");
            result.push_str(&format!(
                "keys = {:?}            # Keys held together\n",
                binding.keys
            ));
            result.push_str(&format!(
                "sound = {:?}           # Sound to play\n",
                binding.sound
            ));
            result.push('\n');
        }

        fs::write(path, result)?;
        Ok(())
    }

    /// Builds the chord → sound table, rejecting unknown key names, empty
    /// chords and chords bound twice.
    pub fn hotkey_map(&self) -> anyhow::Result<HotkeyMap<String>> {
        let mut map = HotkeyMap::new();
        for binding in &self.hotkeys {
            let chord: Chord = binding
                .keys
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid hotkey `{}`: {}", binding.keys, e))?;

            if map.insert(chord, binding.sound.clone()).is_some() {
                anyhow::bail!("hotkey `{}` is bound more than once", chord);
            }
        }
        Ok(map)
    }
}
