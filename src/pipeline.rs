use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use crate::config::Settings;
use crate::export::xlsx::build_report;
use crate::logging::LogSink;
use crate::services::ecb::{RateFetcher, RateSource};
use crate::services::mailer::{Mailer, ReportEmail, SmtpServer, report_subject, send_report};
use crate::services::secrets::{Credentials, SecretStore, SecretVersion};
use crate::utils::dates::format_iso;

const SCRATCH_PREFIX: &str = "exchange-rates-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    Failed,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Sent
    }
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub config_path: PathBuf,
    pub service_account_path: PathBuf,
    pub scratch_root: Option<PathBuf>,
    pub today: NaiveDate,
}

#[derive(Clone)]
pub struct Pipeline {
    pub rates: Arc<dyn RateSource>,
    pub secrets: Arc<dyn SecretStore>,
    pub mailer: Arc<dyn Mailer>,
    pub log: Arc<dyn LogSink>,
}

impl Pipeline {
    pub async fn run(&self, invocation: &Invocation) -> Outcome {
        let log = self.log.as_ref();

        let settings = match Settings::load(&invocation.config_path) {
            Ok(settings) => settings,
            Err(e) => {
                log.error(&e.to_string());
                return Outcome::Failed;
            }
        };

        let credentials = match Credentials::load(
            settings.use_locally,
            &invocation.service_account_path,
            log,
        )
        .await
        {
            Ok(credentials) => credentials,
            Err(e) => {
                log.error(&e.to_string());
                return Outcome::Failed;
            }
        };
        if settings.use_locally && credentials.is_none() {
            return Outcome::Failed;
        }

        let secret = SecretVersion::email_password(&settings.gcp_project_id);
        let password = match self.secrets.access(credentials.as_ref(), &secret).await {
            Ok(password) => password,
            Err(e) => {
                log.error(&e.to_string());
                return Outcome::Failed;
            }
        };

        let (rates, effective_date) = RateFetcher::new(self.rates.as_ref(), log)
            .fetch(&settings.currencies, invocation.today)
            .await;
        tracing::debug!(
            resolved = rates.len(),
            requested = settings.currencies.len(),
            date = %effective_date,
            "rates fetched"
        );

        let scratch_root = settings.scratch_root(invocation.scratch_root.as_deref());
        let scratch = match create_scratch_dir(&scratch_root) {
            Ok(dir) => dir,
            Err(e) => {
                log.error(&format!(
                    "Failed to create scratch directory in {}: {}",
                    scratch_root.display(),
                    e
                ));
                return Outcome::Failed;
            }
        };

        let sent = match build_report(&rates, scratch.path()) {
            Ok(report_path) => {
                let server = SmtpServer {
                    host: settings.sender_email_smtp_address.clone(),
                    port: settings.sender_email_smtp_port,
                    username: settings.sender_email_address.clone(),
                    password,
                };
                let subject = report_subject(&format_iso(effective_date));
                let email = ReportEmail {
                    recipient: &settings.target_email_address,
                    sender: &settings.sender_email_address,
                    subject: &subject,
                    body: "",
                    attachment_path: &report_path,
                };
                send_report(self.mailer.as_ref(), log, &server, &email)
                    .await
                    .is_ok()
            }
            Err(e) => {
                log.error(&e.to_string());
                false
            }
        };

        cleanup(scratch, log);

        if sent { Outcome::Sent } else { Outcome::Failed }
    }
}

/// A fresh directory per invocation, so concurrent runs never share files.
fn create_scratch_dir(root: &Path) -> std::io::Result<TempDir> {
    std::fs::create_dir_all(root)?;
    tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(root)
}

fn cleanup(scratch: TempDir, log: &dyn LogSink) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        log.error(&format!(
            "Failed to remove scratch directory {}: {}",
            path.display(),
            e
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::RecordingSink;

    #[test]
    fn scratch_dirs_are_unique_and_removed() {
        let root = tempfile::tempdir().unwrap();
        let log = RecordingSink::new();

        let first = create_scratch_dir(root.path()).unwrap();
        let second = create_scratch_dir(root.path()).unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(root.path()));

        std::fs::write(first.path().join("exchange_rates.xlsx"), b"PK").unwrap();
        let first_path = first.path().to_path_buf();
        cleanup(first, &log);
        cleanup(second, &log);

        assert!(!first_path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
        assert!(log.errors().is_empty());
    }

    #[test]
    fn scratch_root_is_created_on_demand() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("temp");

        let dir = create_scratch_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(dir.path().starts_with(&nested));
    }

    #[test]
    fn outcome_success() {
        assert!(Outcome::Sent.is_success());
        assert!(!Outcome::Failed.is_success());
    }
}
