use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub appwrite: AppwriteSettings,
    pub collection: CollectionSettings,
    pub session: SessionSettings,
    #[serde(default)]
    pub swipe: SwipeSettings,
    #[serde(default)]
    pub submission: SubmissionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub user_profiles: String,
    pub swipes: String,
    pub matches: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub user_id: String,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
    pub feed_limit: Option<u16>,
}

fn default_viewport_width() -> f64 { 400.0 }
fn default_viewport_height() -> f64 { 800.0 }

/// Gesture thresholds and animation timings
#[derive(Debug, Clone, Deserialize)]
pub struct SwipeSettings {
    /// Horizontal travel, as a share of the viewport width, that commits a swipe
    #[serde(default = "default_distance_ratio")]
    pub distance_ratio: f64,
    /// Release speed in px/s that commits a swipe regardless of travel
    #[serde(default = "default_velocity_threshold")]
    pub velocity_threshold: f64,
    /// Upward travel, as a share of the viewport height, for a vertical flick.
    /// Falls back to the horizontal distance threshold when unset.
    #[serde(default)]
    pub vertical_ratio: Option<f64>,
    #[serde(default = "default_horizontal_tolerance_ratio")]
    pub horizontal_tolerance_ratio: f64,
    #[serde(default = "default_velocity_window_ms")]
    pub velocity_window_ms: u64,
    #[serde(default = "default_fly_off_ms")]
    pub fly_off_ms: u64,
    #[serde(default = "default_spring_back_ms")]
    pub spring_back_ms: u64,
}

impl Default for SwipeSettings {
    fn default() -> Self {
        Self {
            distance_ratio: default_distance_ratio(),
            velocity_threshold: default_velocity_threshold(),
            vertical_ratio: None,
            horizontal_tolerance_ratio: default_horizontal_tolerance_ratio(),
            velocity_window_ms: default_velocity_window_ms(),
            fly_off_ms: default_fly_off_ms(),
            spring_back_ms: default_spring_back_ms(),
        }
    }
}

impl SwipeSettings {
    pub fn velocity_window(&self) -> Duration {
        Duration::from_millis(self.velocity_window_ms)
    }

    pub fn fly_off_duration(&self) -> Duration {
        Duration::from_millis(self.fly_off_ms)
    }

    pub fn spring_back_duration(&self) -> Duration {
        Duration::from_millis(self.spring_back_ms)
    }
}

fn default_distance_ratio() -> f64 { 0.25 }
fn default_velocity_threshold() -> f64 { 800.0 }
fn default_horizontal_tolerance_ratio() -> f64 { 0.2 }
fn default_velocity_window_ms() -> u64 { 100 }
fn default_fly_off_ms() -> u64 { 300 }
fn default_spring_back_ms() -> u64 { 200 }

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl SubmissionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 { 10 }
fn default_event_capacity() -> usize { 64 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingSettings {
    /// Apply explicit level / format overrides, e.g. from `LOG_LEVEL` and `LOG_FORMAT`
    pub fn overridden(self, level: Option<String>, format: Option<String>) -> Self {
        Self {
            level: level.unwrap_or(self.level),
            format: format.unwrap_or(self.format),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with LUME_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g., LUME__SESSION__USER_ID -> session.user_id
            .add_source(
                Environment::with_prefix("LUME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("LUME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply the unprefixed Appwrite variables the mobile build also uses
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("APPWRITE_ENDPOINT", "appwrite.endpoint"),
        ("APPWRITE_API_KEY", "appwrite.api_key"),
        ("APPWRITE_PROJECT_ID", "appwrite.project_id"),
        ("APPWRITE_DATABASE_ID", "appwrite.database_id"),
    ];

    let mut builder = Config::builder().add_source(settings);

    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
