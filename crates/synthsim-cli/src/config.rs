//! Session configuration – reads/writes `~/.synthsim/config.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use synthsim_hal::{DriverTuning, Preferences};
use synthsim_middleware::BridgeConfig;
use synthsim_runtime::{InputScheme, SimContext};
use synthsim_types::SequentialJoint;

/// Persisted headless-run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Simulation ticks per second.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Number of ticks to run before exiting.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Start with the reduced subsystem-gravity force ceilings.
    #[serde(default)]
    pub subsystem_gravity: bool,

    #[serde(default)]
    pub tuning: DriverTuning,

    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default = "default_schemes")]
    pub schemes: Vec<InputScheme>,

    /// Sequential joint preferences keyed by robot name.
    #[serde(default)]
    pub sequential: BTreeMap<String, Vec<SequentialJoint>>,
}

fn default_tick_hz() -> u32 {
    50
}
fn default_ticks() -> u64 {
    500
}
fn default_schemes() -> Vec<InputScheme> {
    vec![InputScheme::gamepad("gamepad", 0)]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            ticks: default_ticks(),
            subsystem_gravity: false,
            tuning: DriverTuning::default(),
            bridge: BridgeConfig::default(),
            schemes: default_schemes(),
            sequential: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Seconds per tick.  A zero tick rate falls back to the default.
    pub fn dt(&self) -> f32 {
        let hz = if self.tick_hz == 0 { default_tick_hz() } else { self.tick_hz };
        1.0 / hz as f32
    }

    /// Build the session context: preferences, tuning and input schemes.
    pub fn to_context(&self) -> SimContext {
        let mut preferences = Preferences::new(self.subsystem_gravity);
        for (robot, joints) in &self.sequential {
            preferences.set_sequential(robot.clone(), joints.clone());
        }
        let mut ctx = SimContext::new(preferences, self.tuning.clone());
        for scheme in &self.schemes {
            ctx.add_scheme(scheme.clone());
        }
        ctx
    }
}

/// Return the path to `~/.synthsim/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".synthsim").join("config.toml")
}

/// Load the config with `SYNTHSIM_*` overrides applied.  A missing file
/// yields the defaults.
pub fn load() -> Result<Config, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `SYNTHSIM_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SYNTHSIM_BRIDGE_URL` | `bridge.url` (also enables the bridge) |
/// | `SYNTHSIM_TICK_HZ` | `tick_hz` |
/// | `SYNTHSIM_TICKS` | `ticks` |
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |name| std::env::var(name).ok());
}

fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("SYNTHSIM_BRIDGE_URL") {
        cfg.bridge.url = url;
        cfg.bridge.enabled = true;
    }
    if let Some(v) = lookup("SYNTHSIM_TICK_HZ")
        && let Ok(hz) = v.trim().parse::<u32>()
        && hz > 0
    {
        cfg.tick_hz = hz;
    }
    if let Some(v) = lookup("SYNTHSIM_TICKS")
        && let Ok(ticks) = v.trim().parse::<u64>()
    {
        cfg.ticks = ticks;
    }
}

/// Save the config to disk, creating `~/.synthsim/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use synthsim_types::ControlMode;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.tick_hz, 50);
        assert_eq!(loaded.schemes[0].name, "gamepad");
    }

    #[test]
    fn roundtrip_tuning_and_sequential() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.tuning.hinge_mode = ControlMode::Position;
        cfg.tuning.max_force = 1200.0;
        cfg.bridge.enabled = true;
        cfg.sequential.insert(
            "robot".to_string(),
            vec![SequentialJoint {
                child: 1,
                parent: 0,
                inverted: true,
            }],
        );
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "ticks = 10\n\n[bridge]\nurl = \"ws://sim:3300/wpilibws\"\n")
            .expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.ticks, 10);
        assert_eq!(loaded.tick_hz, 50);
        assert_eq!(loaded.bridge.url, "ws://sim:3300/wpilibws");
        assert!(!loaded.bridge.enabled);
        assert_eq!(loaded.bridge.reconnect_interval_ms, 1000);
        assert_eq!(loaded.tuning, DriverTuning::default());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tick_hz = \"fast\"").expect("write");
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn config_path_points_to_synthsim_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".synthsim"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn bridge_url_override_enables_bridge() {
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, env(&[("SYNTHSIM_BRIDGE_URL", "ws://robot:3300/wpilibws")]));
        assert_eq!(cfg.bridge.url, "ws://robot:3300/wpilibws");
        assert!(cfg.bridge.enabled);
    }

    #[test]
    fn tick_overrides_ignore_invalid_values() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            env(&[("SYNTHSIM_TICK_HZ", "0"), ("SYNTHSIM_TICKS", "many")]),
        );
        assert_eq!(cfg.tick_hz, 50);
        assert_eq!(cfg.ticks, 500);

        apply_overrides(
            &mut cfg,
            env(&[("SYNTHSIM_TICK_HZ", "100"), ("SYNTHSIM_TICKS", " 42 ")]),
        );
        assert_eq!(cfg.tick_hz, 100);
        assert_eq!(cfg.ticks, 42);
        assert!((cfg.dt() - 0.01).abs() < f32::EPSILON);
    }

    #[test]
    fn context_carries_schemes_and_preferences() {
        let mut cfg = Config::default();
        cfg.subsystem_gravity = true;
        cfg.sequential.insert(
            "robot".to_string(),
            vec![SequentialJoint {
                child: 1,
                parent: 0,
                inverted: false,
            }],
        );
        let ctx = cfg.to_context();
        assert!(ctx.preferences.subsystem_gravity());
        assert_eq!(ctx.preferences.sequential("robot").len(), 1);
        assert!(ctx.scheme("gamepad").is_some());
        assert_eq!(ctx.tuning, cfg.tuning);
    }
}
