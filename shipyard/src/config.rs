//! Configuration for the simulation engine.
//!
//! [`ShipyardConfig`] combines everything needed to start a
//! [`Shipyard`](crate::app::Shipyard): simulation timings and probabilities,
//! the peer endpoint and logging. It can be built in code or loaded from an
//! INI file:
//!
//! ```ini
//! [scheduler]
//! idle_interval_secs = 10
//!
//! [repair]
//! tick_secs = 5
//!
//! [launch]
//! duration_secs = 15
//!
//! [transit]
//! travel_secs = 60
//! retry_wait_secs = 10
//! max_delivery_attempts = 5
//! degradation_probability = 0.1
//!
//! [flavor]
//! probability = 0.05
//!
//! [peer]
//! base_url = http://localhost:8081
//! timeout_secs = 5
//!
//! [logging]
//! filter = shipyard=info
//! file = /var/log/shipyard.log
//! ```
//!
//! Missing keys keep their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::logging::LoggingConfig;

/// Default pause between scheduler checks.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(10);

/// Default time to restore one point of condition.
pub const DEFAULT_REPAIR_TICK: Duration = Duration::from_secs(5);

/// Default length of a takeoff (and of the return after an aborted one).
pub const DEFAULT_LAUNCH_DURATION: Duration = Duration::from_secs(15);

/// Default length of one travel leg.
pub const DEFAULT_TRAVEL_DURATION: Duration = Duration::from_secs(60);

/// Granularity of launch and travel waits. Aborts become visible at this resolution.
pub const DEFAULT_STEP: Duration = Duration::from_secs(1);

/// Default wait before each delivery attempt.
pub const DEFAULT_DELIVERY_RETRY_WAIT: Duration = Duration::from_secs(10);

/// Default number of delivery attempts before falling back inbound.
pub const DEFAULT_MAX_DELIVERY_ATTEMPTS: u32 = 5;

/// Default chance of losing one point of condition per travel step.
pub const DEFAULT_DEGRADATION_PROBABILITY: f64 = 0.1;

/// Default chance of a flavor log per repair tick.
pub const DEFAULT_REPAIR_FLAVOR_PROBABILITY: f64 = 0.001;

/// Default chance of a flavor log per launch step.
pub const DEFAULT_LAUNCH_FLAVOR_PROBABILITY: f64 = 0.025;

/// Default chance of a flavor log per travel step.
pub const DEFAULT_TRANSIT_FLAVOR_PROBABILITY: f64 = 0.025;

/// Default peer system base URL.
pub const DEFAULT_PEER_BASE_URL: &str = "http://localhost:8081";

/// Default peer connect/read timeout.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or parsed.
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// A value is out of range or malformed.
    #[error("Invalid value for {key}: {value} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Per-phase chance of writing a flavor log on each tick or step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlavorRates {
    pub repair: f64,
    pub launch: f64,
    pub transit: f64,
}

impl FlavorRates {
    /// The same rate for every phase.
    pub fn uniform(probability: f64) -> Self {
        Self {
            repair: probability,
            launch: probability,
            transit: probability,
        }
    }
}

impl Default for FlavorRates {
    fn default() -> Self {
        Self {
            repair: DEFAULT_REPAIR_FLAVOR_PROBABILITY,
            launch: DEFAULT_LAUNCH_FLAVOR_PROBABILITY,
            transit: DEFAULT_TRANSIT_FLAVOR_PROBABILITY,
        }
    }
}

/// Timings and probabilities driving the schedulers and transit workers.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Pause between scheduler loop checks.
    pub idle_interval: Duration,

    /// Time to restore one point of condition in the drydock.
    pub repair_tick: Duration,

    /// Total takeoff time.
    pub launch_duration: Duration,

    /// Granularity of the takeoff countdown.
    pub launch_step: Duration,

    /// Length of one travel leg.
    pub travel_duration: Duration,

    /// Granularity of travel legs (degradation and abort checks).
    pub travel_step: Duration,

    /// Wait before each delivery attempt.
    pub delivery_retry_wait: Duration,

    /// Delivery attempts before the ship turns back.
    pub max_delivery_attempts: u32,

    /// Chance of losing one point of condition per travel step.
    pub degradation_probability: f64,

    /// Chance of writing a flavor log per tick/step, by phase.
    pub flavor: FlavorRates,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            idle_interval: DEFAULT_IDLE_INTERVAL,
            repair_tick: DEFAULT_REPAIR_TICK,
            launch_duration: DEFAULT_LAUNCH_DURATION,
            launch_step: DEFAULT_STEP,
            travel_duration: DEFAULT_TRAVEL_DURATION,
            travel_step: DEFAULT_STEP,
            delivery_retry_wait: DEFAULT_DELIVERY_RETRY_WAIT,
            max_delivery_attempts: DEFAULT_MAX_DELIVERY_ATTEMPTS,
            degradation_probability: DEFAULT_DEGRADATION_PROBABILITY,
            flavor: FlavorRates::default(),
        }
    }
}

impl SimulationConfig {
    /// Set the scheduler idle interval.
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Set the repair tick.
    pub fn with_repair_tick(mut self, tick: Duration) -> Self {
        self.repair_tick = tick;
        self
    }

    /// Set the launch duration.
    pub fn with_launch_duration(mut self, duration: Duration) -> Self {
        self.launch_duration = duration;
        self
    }

    /// Set the travel leg duration.
    pub fn with_travel_duration(mut self, duration: Duration) -> Self {
        self.travel_duration = duration;
        self
    }

    /// Set the wait before each delivery attempt.
    pub fn with_delivery_retry_wait(mut self, wait: Duration) -> Self {
        self.delivery_retry_wait = wait;
        self
    }

    /// Set the number of delivery attempts.
    pub fn with_max_delivery_attempts(mut self, attempts: u32) -> Self {
        self.max_delivery_attempts = attempts;
        self
    }

    /// Set the per-step degradation probability.
    pub fn with_degradation_probability(mut self, probability: f64) -> Self {
        self.degradation_probability = probability;
        self
    }

    /// Set one flavor probability for every phase.
    pub fn with_flavor_probability(mut self, probability: f64) -> Self {
        self.flavor = FlavorRates::uniform(probability);
        self
    }

    /// Set the flavor probabilities phase by phase.
    pub fn with_flavor_rates(mut self, rates: FlavorRates) -> Self {
        self.flavor = rates;
        self
    }

    /// Multiplies every duration by `factor`, e.g. `0.1` runs ten times faster.
    ///
    /// Step sizes scale too, so the number of steps per phase is unchanged.
    pub fn scaled(mut self, factor: f64) -> Self {
        let scale = |d: Duration| d.mul_f64(factor.max(0.0));
        self.idle_interval = scale(self.idle_interval);
        self.repair_tick = scale(self.repair_tick);
        self.launch_duration = scale(self.launch_duration);
        self.launch_step = scale(self.launch_step);
        self.travel_duration = scale(self.travel_duration);
        self.travel_step = scale(self.travel_step);
        self.delivery_retry_wait = scale(self.delivery_retry_wait);
        self
    }

    /// Number of steps making up a takeoff.
    pub fn launch_steps(&self) -> u32 {
        steps_in(self.launch_duration, self.launch_step)
    }

    /// Number of steps making up a travel leg.
    pub fn travel_steps(&self) -> u32 {
        steps_in(self.travel_duration, self.travel_step)
    }

    /// Checks probabilities and step sizes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("transit.degradation_probability", self.degradation_probability)?;
        check_probability("flavor.repair", self.flavor.repair)?;
        check_probability("flavor.launch", self.flavor.launch)?;
        check_probability("flavor.transit", self.flavor.transit)?;

        if self.max_delivery_attempts == 0 {
            return Err(ConfigError::invalid(
                "transit.max_delivery_attempts",
                0,
                "at least one attempt is required",
            ));
        }
        if self.launch_step.is_zero() || self.travel_step.is_zero() {
            return Err(ConfigError::invalid(
                "step",
                "0",
                "launch and travel steps must be non-zero",
            ));
        }
        Ok(())
    }
}

fn steps_in(total: Duration, step: Duration) -> u32 {
    if step.is_zero() {
        return 0;
    }
    (total.as_nanos() / step.as_nanos()) as u32
}

fn check_probability(key: &str, p: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, p, "must be between 0.0 and 1.0"))
    }
}

/// Peer system endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerConfig {
    /// Base URL; ships are posted to `<base_url>/ships`.
    pub base_url: String,

    /// Connect and read timeout.
    pub timeout: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PEER_BASE_URL.to_string(),
            timeout: DEFAULT_PEER_TIMEOUT,
        }
    }
}

impl PeerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Full delivery URL.
    pub fn ships_url(&self) -> String {
        format!("{}/ships", self.base_url.trim_end_matches('/'))
    }
}

/// Top-level configuration combining all component configs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipyardConfig {
    pub simulation: SimulationConfig,
    pub peer: PeerConfig,
    pub logging: LoggingConfig,
}

impl ShipyardConfig {
    /// Loads a configuration file, keeping defaults for anything not set.
    pub fn from_ini_file(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parses configuration from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<inline>"),
            source: ini::Error::Parse(e),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let sim = &mut config.simulation;

        if let Some(v) = get(ini, "scheduler", "idle_interval_secs") {
            sim.idle_interval = parse_secs("scheduler.idle_interval_secs", v)?;
        }
        if let Some(v) = get(ini, "repair", "tick_secs") {
            sim.repair_tick = parse_secs("repair.tick_secs", v)?;
        }
        if let Some(v) = get(ini, "launch", "duration_secs") {
            sim.launch_duration = parse_secs("launch.duration_secs", v)?;
        }
        if let Some(v) = get(ini, "launch", "step_secs") {
            sim.launch_step = parse_secs("launch.step_secs", v)?;
        }
        if let Some(v) = get(ini, "transit", "travel_secs") {
            sim.travel_duration = parse_secs("transit.travel_secs", v)?;
        }
        if let Some(v) = get(ini, "transit", "step_secs") {
            sim.travel_step = parse_secs("transit.step_secs", v)?;
        }
        if let Some(v) = get(ini, "transit", "retry_wait_secs") {
            sim.delivery_retry_wait = parse_secs("transit.retry_wait_secs", v)?;
        }
        if let Some(v) = get(ini, "transit", "max_delivery_attempts") {
            sim.max_delivery_attempts = v.parse().map_err(|_| {
                ConfigError::invalid("transit.max_delivery_attempts", v, "expected an integer")
            })?;
        }
        if let Some(v) = get(ini, "transit", "degradation_probability") {
            sim.degradation_probability = parse_f64("transit.degradation_probability", v)?;
        }
        if let Some(v) = get(ini, "flavor", "probability") {
            sim.flavor = FlavorRates::uniform(parse_f64("flavor.probability", v)?);
        }
        if let Some(v) = get(ini, "flavor", "repair") {
            sim.flavor.repair = parse_f64("flavor.repair", v)?;
        }
        if let Some(v) = get(ini, "flavor", "launch") {
            sim.flavor.launch = parse_f64("flavor.launch", v)?;
        }
        if let Some(v) = get(ini, "flavor", "transit") {
            sim.flavor.transit = parse_f64("flavor.transit", v)?;
        }

        if let Some(v) = get(ini, "peer", "base_url") {
            if v.is_empty() {
                return Err(ConfigError::invalid("peer.base_url", v, "must not be empty"));
            }
            config.peer.base_url = v.to_string();
        }
        if let Some(v) = get(ini, "peer", "timeout_secs") {
            config.peer.timeout = parse_secs("peer.timeout_secs", v)?;
        }

        if let Some(v) = get(ini, "logging", "filter") {
            config.logging.filter = v.to_string();
        }
        if let Some(v) = get(ini, "logging", "file") {
            config.logging.file = (!v.is_empty()).then(|| PathBuf::from(v));
        }

        config.simulation.validate()?;
        Ok(config)
    }

    /// Renders the configuration as INI text.
    pub fn to_ini_string(&self) -> String {
        let sim = &self.simulation;
        let mut ini = Ini::new();
        ini.with_section(Some("scheduler"))
            .set("idle_interval_secs", secs(sim.idle_interval));
        ini.with_section(Some("repair"))
            .set("tick_secs", secs(sim.repair_tick));
        ini.with_section(Some("launch"))
            .set("duration_secs", secs(sim.launch_duration))
            .set("step_secs", secs(sim.launch_step));
        ini.with_section(Some("transit"))
            .set("travel_secs", secs(sim.travel_duration))
            .set("step_secs", secs(sim.travel_step))
            .set("retry_wait_secs", secs(sim.delivery_retry_wait))
            .set("max_delivery_attempts", sim.max_delivery_attempts.to_string())
            .set(
                "degradation_probability",
                sim.degradation_probability.to_string(),
            );
        ini.with_section(Some("flavor"))
            .set("repair", sim.flavor.repair.to_string())
            .set("launch", sim.flavor.launch.to_string())
            .set("transit", sim.flavor.transit.to_string());
        ini.with_section(Some("peer"))
            .set("base_url", self.peer.base_url.clone())
            .set("timeout_secs", secs(self.peer.timeout));
        ini.with_section(Some("logging"))
            .set("filter", self.logging.filter.clone())
            .set(
                "file",
                self.logging
                    .file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            );

        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = ini.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Default location of the configuration file (`<config dir>/shipyard/config.ini`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shipyard").join(CONFIG_FILE_NAME))
}

fn get<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.section(Some(section))
        .and_then(|props| props.get(key))
        .map(str::trim)
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse::<f64>()
        .map_err(|_| ConfigError::invalid(key, value, "expected a number"))
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs = parse_f64(key, value)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::invalid(key, value, "expected non-negative seconds"));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn secs(d: Duration) -> String {
    d.as_secs_f64().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_timings() {
        let config = SimulationConfig::default();
        assert_eq!(config.idle_interval, Duration::from_secs(10));
        assert_eq!(config.repair_tick, Duration::from_secs(5));
        assert_eq!(config.launch_steps(), 15);
        assert_eq!(config.travel_steps(), 60);
        assert_eq!(config.delivery_retry_wait, Duration::from_secs(10));
        assert_eq!(config.max_delivery_attempts, 5);
        assert_eq!(config.degradation_probability, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scaled_keeps_step_counts() {
        let config = SimulationConfig::default().scaled(0.1);
        assert_eq!(config.idle_interval, Duration::from_secs(1));
        assert_eq!(config.launch_step, Duration::from_millis(100));
        assert_eq!(config.launch_steps(), 15);
        assert_eq!(config.travel_steps(), 60);
    }

    #[test]
    fn test_validate_rejects_bad_probability() {
        let config = SimulationConfig::default().with_flavor_probability(1.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_flavor_rates_differ_by_phase() {
        let rates = SimulationConfig::default().flavor;
        assert_eq!(rates.repair, 0.001);
        assert_eq!(rates.launch, 0.025);
        assert!(rates.repair < rates.launch);
    }

    #[test]
    fn test_from_ini_str_flavor_keys() {
        let config = ShipyardConfig::from_ini_str(
            "[flavor]\nprobability = 0.5\nrepair = 0.0\n",
        )
        .unwrap();
        assert_eq!(
            config.simulation.flavor,
            FlavorRates {
                repair: 0.0,
                launch: 0.5,
                transit: 0.5,
            }
        );

        let err = ShipyardConfig::from_ini_str("[flavor]\ntransit = 2\n").unwrap_err();
        assert!(err.to_string().contains("flavor.transit"));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = SimulationConfig::default().with_max_delivery_attempts(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ships_url_trims_slash() {
        assert_eq!(
            PeerConfig::new("http://peer:9000/").ships_url(),
            "http://peer:9000/ships"
        );
    }

    #[test]
    fn test_from_ini_str_overrides() {
        let config = ShipyardConfig::from_ini_str(
            "[repair]\ntick_secs = 0.5\n\n[transit]\nmax_delivery_attempts = 3\n\n[peer]\nbase_url = http://peer\n",
        )
        .unwrap();

        assert_eq!(config.simulation.repair_tick, Duration::from_millis(500));
        assert_eq!(config.simulation.max_delivery_attempts, 3);
        assert_eq!(config.peer.base_url, "http://peer");
        // Untouched keys keep their defaults.
        assert_eq!(config.simulation.idle_interval, DEFAULT_IDLE_INTERVAL);
    }

    #[test]
    fn test_from_ini_str_rejects_garbage_value() {
        let err = ShipyardConfig::from_ini_str("[launch]\nduration_secs = soon\n").unwrap_err();
        assert!(err.to_string().contains("launch.duration_secs"));
    }

    #[test]
    fn test_ini_round_trip_through_file() {
        let original = ShipyardConfig {
            simulation: SimulationConfig::default()
                .with_travel_duration(Duration::from_secs(30))
                .with_flavor_probability(0.25),
            peer: PeerConfig::new("http://peer.example"),
            logging: LoggingConfig::default(),
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(original.to_ini_string().as_bytes()).unwrap();

        let loaded = ShipyardConfig::from_ini_file(file.path()).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = ShipyardConfig::from_ini_file(Path::new("/nonexistent/shipyard.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
