use std::time::Duration;

use puppetry_frame::FrameConfig;
use puppetry_transport::ConnectConfig;

use crate::command::DEFAULT_PUMP;
use crate::error::ConfigError;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default server port.
pub const DEFAULT_PORT: u16 = 15555;
/// Lowest accepted port.
pub const MIN_PORT: u16 = 1024;
/// Default pose send interval.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(100);
/// Fastest allowed pose send interval.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(50);
/// Slowest allowed pose send interval.
pub const MAX_UPDATE_INTERVAL: Duration = Duration::from_secs(5);
/// Default interval between network pump ticks.
pub const DEFAULT_PUMP_INTERVAL: Duration = Duration::from_millis(10);

/// Settings for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port (1024-65535).
    pub port: u16,
    /// Pose send interval; read through [`update_interval`](Self::update_interval),
    /// which clamps it.
    pub update_interval: Duration,
    /// Pump every outbound envelope is addressed to.
    pub pump: String,
    /// Interval between network pump ticks.
    pub pump_interval: Duration,
    /// Socket options.
    pub connect: ConnectConfig,
    /// Frame decoder limits.
    pub frame: FrameConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            pump: DEFAULT_PUMP.to_string(),
            pump_interval: DEFAULT_PUMP_INTERVAL,
            connect: ConnectConfig::default(),
            frame: FrameConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Check the externally supplied values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.pump.is_empty() {
            return Err(ConfigError::EmptyPump);
        }
        if self.port < MIN_PORT {
            return Err(ConfigError::Port(self.port));
        }
        for (field, value) in [
            ("connect timeout", self.connect.connect_timeout),
            ("poll interval", self.connect.poll_interval),
            ("pump interval", self.pump_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration { field });
            }
        }
        Ok(())
    }

    /// The pose send interval, clamped to the supported range.
    pub fn update_interval(&self) -> Duration {
        clamp_update_interval(self.update_interval)
    }
}

/// Clamp a send interval to [50 ms, 5 s].
pub fn clamp_update_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_UPDATE_INTERVAL, MAX_UPDATE_INTERVAL)
}

/// Convert user-facing seconds into a clamped send interval.
pub fn update_interval_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::UpdateInterval(secs));
    }
    // Clamp before converting so huge values cannot overflow Duration.
    let secs = secs.clamp(
        MIN_UPDATE_INTERVAL.as_secs_f64(),
        MAX_UPDATE_INTERVAL.as_secs_f64(),
    );
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 15555);
        assert_eq!(config.update_interval(), Duration::from_millis(100));
        assert_eq!(config.pump, "puppetry");
    }

    #[test]
    fn rejects_low_port() {
        let config = SessionConfig {
            port: 80,
            ..SessionConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Port(80)));
    }

    #[test]
    fn rejects_empty_host() {
        let config = SessionConfig {
            host: "  ".to_string(),
            ..SessionConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyHost));
    }

    #[test]
    fn rejects_empty_pump() {
        let config = SessionConfig {
            pump: String::new(),
            ..SessionConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyPump));
    }

    #[test]
    fn rejects_zero_pump_interval() {
        let config = SessionConfig {
            pump_interval: Duration::ZERO,
            ..SessionConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration {
                field: "pump interval"
            })
        );
    }

    #[test]
    fn update_interval_is_clamped() {
        let fast = SessionConfig {
            update_interval: Duration::from_millis(1),
            ..SessionConfig::default()
        };
        assert_eq!(fast.update_interval(), MIN_UPDATE_INTERVAL);

        let slow = SessionConfig {
            update_interval: Duration::from_secs(60),
            ..SessionConfig::default()
        };
        assert_eq!(slow.update_interval(), MAX_UPDATE_INTERVAL);
    }

    #[test]
    fn update_interval_from_seconds() {
        assert_eq!(
            update_interval_from_secs(0.25).unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(update_interval_from_secs(0.0).unwrap(), MIN_UPDATE_INTERVAL);
        assert_eq!(update_interval_from_secs(1e12).unwrap(), MAX_UPDATE_INTERVAL);
        assert!(update_interval_from_secs(f64::NAN).is_err());
        assert!(update_interval_from_secs(-1.0).is_err());
    }
}
