use eyre::Result;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
    Layer, Registry,
};

/// Basic tracing configuration
#[derive(Default, Debug, Clone, Copy, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    /// Pretty print
    Pretty,
    /// JSON
    Json,
    /// Compact
    Compact,
    /// Default style
    #[serde(other)]
    #[default]
    Default,
}

/// Logging level. A "higher level" means more will be logged.
#[derive(Default, Debug, Clone, Copy, serde::Deserialize, PartialOrd, Ord, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    /// Off
    Off = 0,
    /// Error
    Error = 1,
    /// Warn
    Warn = 2,
    /// Debug
    Debug = 4,
    /// Trace
    Trace = 5,
    /// Info
    #[serde(other)]
    #[default]
    Info = 3,
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> LevelFilter {
        match level {
            Level::Off => LevelFilter::OFF,
            Level::Error => LevelFilter::ERROR,
            Level::Warn => LevelFilter::WARN,
            Level::Debug => LevelFilter::DEBUG,
            Level::Trace => LevelFilter::TRACE,
            Level::Info => LevelFilter::INFO,
        }
    }
}

/// Configuration for the tracing subscriber of the relayer
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct TracingConfig {
    /// The logging style. json | pretty | compact | default
    #[serde(default)]
    pub fmt: Style,
    /// The logging level. Defaults to info
    #[serde(default)]
    pub level: Level,
}

impl TracingConfig {
    fn targets(&self) -> Targets {
        let mut targets = Targets::new().with_default(self.level);
        if self.level < Level::Trace {
            // only show these debug and trace logs at trace level
            targets = targets.with_target("hyper", Level::Info);
            targets = targets.with_target("reqwest", Level::Info);
            targets = targets.with_target("ethers_providers", Level::Info);
        }
        targets
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self.fmt {
            Style::Pretty => fmt::layer().pretty().boxed(),
            Style::Json => fmt::layer().json().with_current_span(true).boxed(),
            Style::Compact => fmt::layer().compact().boxed(),
            Style::Default => fmt::layer().boxed(),
        }
    }

    /// Attempt to instantiate and register a tracing subscriber setup from
    /// settings.
    pub fn start_tracing(&self) -> Result<()> {
        Registry::default()
            .with(self.fmt_layer())
            .with(self.targets())
            .with(tracing_error::ErrorLayer::default())
            .try_init()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_values_fall_back_to_defaults() {
        let config: TracingConfig =
            serde_json::from_str(r#"{"fmt": "fancy", "level": "verbose"}"#).unwrap();
        assert_eq!(config.fmt, Style::Default);
        assert_eq!(config.level, Level::Info);
    }

    #[test]
    fn parses_known_values() {
        let config: TracingConfig =
            serde_json::from_str(r#"{"fmt": "json", "level": "debug"}"#).unwrap();
        assert_eq!(config.fmt, Style::Json);
        assert_eq!(LevelFilter::from(config.level), LevelFilter::DEBUG);
        assert!(Level::Debug > Level::Info);
    }

    #[test]
    fn noisy_dependencies_are_capped_below_trace() {
        let config = TracingConfig {
            fmt: Style::Default,
            level: Level::Debug,
        };
        let targets = config.targets();
        assert!(!targets.would_enable("hyper::client", &tracing::Level::DEBUG));
        assert!(targets.would_enable("mrl_lander::queue", &tracing::Level::DEBUG));
    }
}
