use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

#[derive(Parser)]
#[command(name = "ecb-rate-mailer")]
#[command(about = "Mail today's ECB exchange rates as a spreadsheet")]
pub struct Cli {
    /// Path to the run settings (config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, env = "LOG_FORMAT", default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Listen for POST / triggers (default)
    Serve {
        /// Port to bind, overrides $PORT
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run the job once and exit
    Run,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["ecb-rate-mailer"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn parses_run_with_config() {
        let cli =
            Cli::try_parse_from(["ecb-rate-mailer", "run", "--config", "/etc/rates.json"]).unwrap();
        assert_eq!(cli.command, Some(Command::Run));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/rates.json")));
    }

    #[test]
    fn parses_serve_port_and_json_logs() {
        let cli = Cli::try_parse_from([
            "ecb-rate-mailer",
            "--log-format",
            "json",
            "serve",
            "--port",
            "9090",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Command::Serve { port: Some(9090) }));
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
