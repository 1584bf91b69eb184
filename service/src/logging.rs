use crate::config::{Config, RustEnv};
use log::LevelFilter;
use simplelog::{self, ColorChoice, ConfigBuilder, TerminalMode};

/// Dependencies whose logs drown out connection lifecycle output. They are
/// suppressed unless the level is Trace.
const FILTERED_MODULES: &[&str] = &["tower", "tower_http", "tracing", "hyper", "axum", "mio"];

pub struct Logger {}

impl Logger {
    /// Initializes the global terminal logger from `config`.
    ///
    /// Production output is plain (no ANSI colors) so log collectors don't
    /// have to strip escape codes; other environments colorize when attached
    /// to a terminal.
    pub fn init_logger(config: &Config) {
        let level = Self::convert_level_filter(config.log_level_filter);
        let log_config = Self::build_log_config(Self::should_filter_dependencies(
            config.log_level_filter,
        ));

        simplelog::TermLogger::init(
            level,
            log_config,
            TerminalMode::Mixed,
            Self::color_choice(&config.runtime_env()),
        )
        .expect("Failed to start simplelog");
    }

    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn color_choice(runtime_env: &RustEnv) -> ColorChoice {
        match runtime_env {
            RustEnv::Production => ColorChoice::Never,
            RustEnv::Development | RustEnv::Staging => ColorChoice::Auto,
        }
    }

    /// RFC3339 timestamps, module path on every line (the registry logs are
    /// only useful next to the handler that triggered them), and optional
    /// dependency filtering.
    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder
            .set_time_format_rfc3339()
            .set_target_level(simplelog::LevelFilter::Error);

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
