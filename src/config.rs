use crate::control::Season;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest telemetry period an actuator node may be configured with.
pub const MIN_PUBLISH_INTERVAL: Duration = Duration::from_millis(1000);
/// Longest telemetry period an actuator node may be configured with.
pub const MAX_PUBLISH_INTERVAL: Duration = Duration::from_millis(5000);

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
///
/// Must be called before the async runtime or any other thread is started.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

/// Load `KEY=value` lines from `env_path`. Variables already set win.
pub fn load_dotenv_from(env_path: &Path) {
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: binaries call this first in a synchronous main, before
            // the tokio runtime or any other thread exists
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Split on the first '=' only
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key, value));
        }
    }

    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub master: MasterConfig,
    pub actuator: ActuatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// JSON file holding the card preference table
    pub preferences_path: PathBuf,
    /// Fixed season for this run; derived from the calendar when `None`
    pub season: Option<Season>,
    pub evaluation_interval: Duration,
    pub debounce: Duration,
    /// How long the console holds the simulated mode button down
    pub button_hold: Duration,
    pub loop_interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    pub publish_interval: Duration,
    pub loop_interval: Duration,
}

pub fn default_preferences_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("climate-coordinator")
        .join("users_card_id.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig {
                broker_host: "127.0.0.1".to_string(),
                broker_port: 1883,
                client_id: "climate-coordinator".to_string(),
                username: None,
                password: None,
            },
            master: MasterConfig {
                preferences_path: default_preferences_path(),
                season: None,
                evaluation_interval: Duration::from_millis(1000),
                debounce: Duration::from_millis(200),
                button_hold: Duration::from_millis(250),
                loop_interval: Duration::from_millis(100),
            },
            actuator: ActuatorConfig {
                publish_interval: MIN_PUBLISH_INTERVAL,
                loop_interval: Duration::from_millis(100),
            },
        }
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

impl Config {
    /// Build the configuration from the process environment.
    ///
    /// `default_client_id` is used unless `MQTT_CLIENT_ID` is set, so each
    /// node binary gets a distinct identity on the broker.
    pub fn from_env(default_client_id: &str) -> Self {
        let mut config = Self::default();
        config.mqtt.client_id = default_client_id.to_string();

        if let Ok(host) = std::env::var("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Ok(port) = std::env::var("MQTT_BROKER_PORT")
            && let Ok(p) = port.parse()
        {
            config.mqtt.broker_port = p;
        }
        if let Ok(client_id) = std::env::var("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Ok(username) = std::env::var("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Ok(password) = std::env::var("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }

        if let Ok(path) = std::env::var("PREFERENCES_PATH") {
            config.master.preferences_path = PathBuf::from(path);
        }
        if let Ok(season) = std::env::var("CLIMATE_SEASON") {
            match season.parse::<Season>() {
                Ok(s) => config.master.season = Some(s),
                Err(_) => log::warn!("Ignoring unknown CLIMATE_SEASON value: {}", season),
            }
        }
        if let Some(d) = env_millis("EVALUATION_INTERVAL_MS") {
            config.master.evaluation_interval = d;
        }
        if let Some(d) = env_millis("DEBOUNCE_MS") {
            config.master.debounce = d;
        }
        if let Some(d) = env_millis("BUTTON_HOLD_MS") {
            config.master.button_hold = d;
        }
        if let Some(d) = env_millis("PUBLISH_INTERVAL_MS") {
            config.actuator.publish_interval = clamp_publish_interval(d);
        }
        if let Some(d) = env_millis("LOOP_INTERVAL_MS") {
            config.master.loop_interval = d;
            config.actuator.loop_interval = d;
        }

        config
    }

    /// Season for this run: the configured override or the current month.
    pub fn season(&self) -> Season {
        self.master.season.unwrap_or_else(Season::current)
    }
}

pub fn clamp_publish_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_PUBLISH_INTERVAL, MAX_PUBLISH_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_dotenv_from_sets_missing_variables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "CLIMATE_DOTENV_TEST_HOST=10.1.2.3\n").unwrap();

        load_dotenv_from(&path);
        assert_eq!(
            std::env::var("CLIMATE_DOTENV_TEST_HOST").as_deref(),
            Ok("10.1.2.3")
        );
    }

    #[test]
    fn test_load_dotenv_from_missing_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        load_dotenv_from(&dir.path().join("absent.env"));
    }

    #[test]
    fn test_parse_dotenv_strips_quotes_and_comments() {
        let content = "# broker\nMQTT_BROKER_HOST=10.0.0.2\n\nMQTT_PASSWORD=\"with spaces\"\nBROKEN_LINE\nX='a=b'\n";
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![
                ("MQTT_BROKER_HOST", "10.0.0.2"),
                ("MQTT_PASSWORD", "with spaces"),
                ("X", "a=b"),
            ]
        );
    }

    #[test]
    fn test_publish_interval_is_clamped() {
        assert_eq!(
            clamp_publish_interval(Duration::from_millis(10)),
            MIN_PUBLISH_INTERVAL
        );
        assert_eq!(
            clamp_publish_interval(Duration::from_secs(60)),
            MAX_PUBLISH_INTERVAL
        );
        assert_eq!(
            clamp_publish_interval(Duration::from_millis(2500)),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.master.debounce, Duration::from_millis(200));
        assert_eq!(config.actuator.loop_interval, Duration::from_millis(100));
        assert!(
            config
                .master
                .preferences_path
                .ends_with("climate-coordinator/users_card_id.json")
        );
    }
}
