use clap::ValueEnum;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt};

pub const DEFAULT_FILTER_ENV_VAR: &str = "CATCHBOX_LOG";

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
#[clap(rename_all = "kebab_case")]
pub enum DiagnosticFormat {
    Pretty,
    #[default]
    Full,
    Compact,
    Json,
}

pub struct LoggingConfig<'a> {
    pub filter_env_var: &'a str,
    pub default_filter: &'a str,
    pub diag_format: DiagnosticFormat,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            filter_env_var: DEFAULT_FILTER_ENV_VAR,
            default_filter: "catchbox=info,catchbox_api_client=info",
            diag_format: DiagnosticFormat::Full,
        }
    }
}

impl LoggingConfig<'_> {
    /// Install the global subscriber. Diagnostics go to stderr so
    /// that stdout stays usable for command output.
    pub fn init(&self) -> anyhow::Result<()> {
        let layer = fmt::layer().with_writer(std::io::stderr);
        let layer = match self.diag_format {
            DiagnosticFormat::Pretty => layer.pretty().boxed(),
            DiagnosticFormat::Full => layer.boxed(),
            DiagnosticFormat::Compact => layer.compact().boxed(),
            DiagnosticFormat::Json => layer.json().boxed(),
        };

        let env_filter = EnvFilter::try_new(
            std::env::var(self.filter_env_var)
                .as_deref()
                .unwrap_or(self.default_filter),
        )?;
        tracing_subscriber::registry()
            .with(layer.with_filter(env_filter))
            .try_init()?;
        Ok(())
    }
}
