use std::sync::Arc;

use clap::Parser;
use ecb_rate_mailer::cli::{Cli, Command};
use ecb_rate_mailer::config::AppConfig;
use ecb_rate_mailer::logging::{self, TracingSink};
use ecb_rate_mailer::pipeline::{Invocation, Pipeline};
use ecb_rate_mailer::server::{self, AppState};
use ecb_rate_mailer::services::ecb::EcbClient;
use ecb_rate_mailer::services::mailer::SmtpMailer;
use ecb_rate_mailer::services::secrets::GcpSecretManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.clone());
    logging::init_tracing(cli.log_format)?;

    let pipeline = Pipeline {
        rates: Arc::new(EcbClient::new(config.ecb_base_url.clone())?),
        secrets: Arc::new(GcpSecretManager),
        mailer: Arc::new(SmtpMailer),
        log: Arc::new(TracingSink),
    };

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            server::serve(AppState { pipeline, config }).await
        }
        Command::Run => {
            let invocation = Invocation {
                config_path: config.config_path.clone(),
                service_account_path: config.service_account_path.clone(),
                scratch_root: config.scratch_root.clone(),
                today: chrono::Local::now().date_naive(),
            };
            if pipeline.run(&invocation).await.is_success() {
                Ok(())
            } else {
                std::process::exit(1);
            }
        }
    }
}
