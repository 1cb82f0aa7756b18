//! Output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::error::Result;
use serde::Serialize;

/// Helper for formatting and printing output.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Render a serializable value in the configured format.
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Toml => toml::to_string_pretty(value)?,
        })
    }

    /// Print a serializable value in the configured format.
    pub fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", self.render(value)?);
        Ok(())
    }

    /// Print a warning unless quiet.
    pub fn warn(&self, message: &str) {
        if !self.quiet {
            eprintln!("Warning: {}", message);
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> BTreeMap<&'static str, usize> {
        BTreeMap::from([("total", 2)])
    }

    #[test]
    fn test_render_formats() {
        let json = Output::new(OutputFormat::Json, false).render(&sample()).unwrap();
        assert!(json.contains("\"total\": 2"));

        let yaml = Output::new(OutputFormat::Yaml, false).render(&sample()).unwrap();
        assert_eq!(yaml.trim(), "total: 2");

        let toml = Output::new(OutputFormat::Toml, true).render(&sample()).unwrap();
        assert_eq!(toml.trim(), "total = 2");
    }
}
