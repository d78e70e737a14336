//! Effect tuning with TOML preset support.
//!
//! All tweakable settings (emission, dissolve rate, pool size, camera) are
//! consolidated here and passed explicitly to the components that use them.
//! Options serialize to/from TOML so presets can be stored next to the
//! scene assets, and expose a JSON Schema for an external settings panel.

mod camera;
mod dissolve;
mod emission;
mod particles;

use std::path::Path;

pub use camera::CameraOptions;
pub use dissolve::DissolveOptions;
pub use emission::EmissionOptions;
pub use particles::ParticleOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::DissolveError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[emission]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Start parameters of emitted particles.
    pub emission: EmissionOptions,
    /// Dissolve threshold animation.
    pub dissolve: DissolveOptions,
    /// Pool sizing.
    #[schemars(skip)]
    pub particles: ParticleOptions,
    /// Camera projection parameters.
    pub camera: CameraOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, DissolveError> {
        let content = std::fs::read_to_string(path).map_err(DissolveError::Io)?;
        toml::from_str(&content)
            .map_err(|e| DissolveError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), DissolveError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DissolveError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DissolveError::Io)?;
        }
        std::fs::write(path, content).map_err(DissolveError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[emission]
speed = 8.0
direction = [0.0, 1.0, 0.0]
";
        let opts: Options = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.emission.speed, 8.0);
        assert_eq!(opts.emission.direction, [0.0, 1.0, 0.0]);
        // Everything else should be default
        assert_eq!(opts.emission.life, 5.0);
        assert_eq!(opts.dissolve.rate, 0.1);
        assert_eq!(opts.particles.max_particles, 1_000_000);
    }

    #[test]
    fn malformed_toml_is_an_options_error() {
        let dir = std::env::temp_dir().join("dissolve-fx-options-test");
        let path = dir.join("broken.toml");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "[emission]\nspeed = \"fast\"\n").unwrap();

        let err = Options::load(&path).unwrap_err();
        assert!(matches!(err, DissolveError::OptionsParse(_)));
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join("dissolve-fx-options-save");
        let path = dir.join("presets").join("slow.toml");
        let mut opts = Options::default();
        opts.dissolve.rate = 0.02;
        opts.save(&path).unwrap();
        assert_eq!(Options::load(&path).unwrap(), opts);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("emission"));
        assert!(props.contains_key("dissolve"));
        assert!(props.contains_key("camera"));
        // Pool size is not a live setting
        assert!(!props.contains_key("particles"));

        let emission = &props["emission"]["properties"];
        assert!(emission.get("speed").is_some());
        assert!(emission.get("life_randomness").is_some());
        assert!(emission.get("reservoir_size").is_none());
    }
}
