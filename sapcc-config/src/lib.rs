//! Shared configuration loader for the sapcc toolchain.
//!
//! `defaults/sapcc.default.toml` is embedded into the binary so the documented defaults and
//! the runtime behavior cannot drift apart. Applications layer user files and command-line
//! overrides on top of it via [`Loader`] before deserializing into [`SapccConfig`].
//!
//! The parser library never sees this crate; it takes [`CompileOptions`] and [`MatchOptions`],
//! which [`SapccConfig`] hands out.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use sapcc_parser::sapcc::matching::MatchOptions;
use sapcc_parser::sapcc::parsing::CompileOptions;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/sapcc.default.toml");

/// Top-level configuration consumed by sapcc applications.
#[derive(Debug, Clone, Deserialize)]
pub struct SapccConfig {
    pub compiler: CompilerConfig,
    pub matcher: MatcherConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    pub max_errors: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatcherConfig {
    pub max_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub format: TableFormat,
    pub table_name: String,
}

/// How an encoded table is written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableFormat {
    /// C enums and a `uint16_t` array
    C,
    Json,
    /// Raw numbers, one rule record per line
    Words,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl SapccConfig {
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            max_errors: self.compiler.max_errors,
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            max_depth: self.matcher.max_depth,
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file, skipped when absent.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override, e.g. from a command-line flag.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<SapccConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<SapccConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.compiler.max_errors, 10);
        assert_eq!(config.output.format, TableFormat::C);
        assert_eq!(config.output.table_name, "parser_table");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.compile_options(), CompileOptions::default());
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("output.format", "json")
            .expect("override to apply")
            .set_override("matcher.max_depth", 64i64)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.output.format, TableFormat::Json);
        assert_eq!(config.match_options().max_depth, 64);
    }

    #[test]
    fn layers_user_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("sapcc.toml");
        fs::write(&path, "[compiler]\nmax_errors = 3\n").expect("write config");

        let config = Loader::new().with_file(&path).build().expect("config to build");
        assert_eq!(config.compiler.max_errors, 3);
        // untouched sections keep their defaults
        assert_eq!(config.output.table_name, "parser_table");
    }

    #[test]
    fn optional_file_may_be_missing() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/sapcc.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.compiler.max_errors, 10);
    }

    #[test]
    fn required_file_must_exist() {
        assert!(Loader::new().with_file("/nonexistent/sapcc.toml").build().is_err());
    }
}
