use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use google_secretmanager1::SecretManager;
use google_secretmanager1::common::GetToken;
use yup_oauth2::authenticator::ApplicationDefaultCredentialsTypes;
use yup_oauth2::{
    ApplicationDefaultCredentialsAuthenticator, ApplicationDefaultCredentialsFlowOpts,
    ServiceAccountAuthenticator, ServiceAccountKey,
};

use crate::errors::AppError;
use crate::logging::LogSink;

pub const EMAIL_PASSWORD_SECRET: &str = "email_password";

/// Service-account identity used outside the hosted environment.
#[derive(Clone)]
pub struct Credentials {
    key: ServiceAccountKey,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_email", &self.key.client_email)
            .finish()
    }
}

impl Credentials {
    /// Hosted runs use the environment's own identity and get `None`.
    pub async fn load(
        use_locally: bool,
        path: &Path,
        log: &dyn LogSink,
    ) -> Result<Option<Self>, AppError> {
        if !use_locally {
            return Ok(None);
        }

        if !path.is_file() {
            log.error("Service account file is missing.");
            return Ok(None);
        }

        let key = yup_oauth2::read_service_account_key(path)
            .await
            .map_err(|e| {
                AppError::Credentials(format!(
                    "Failed to read credentials from '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Some(Credentials { key }))
    }

    #[cfg(test)]
    pub(crate) fn client_email(&self) -> &str {
        &self.key.client_email
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVersion {
    pub project: String,
    pub secret: String,
    pub version: String,
}

impl SecretVersion {
    pub fn latest(project: impl Into<String>, secret: impl Into<String>) -> Self {
        SecretVersion {
            project: project.into(),
            secret: secret.into(),
            version: "latest".to_string(),
        }
    }

    pub fn email_password(project: impl Into<String>) -> Self {
        Self::latest(project, EMAIL_PASSWORD_SECRET)
    }

    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/secrets/{}/versions/{}",
            self.project, self.secret, self.version
        )
    }
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn access(
        &self,
        credentials: Option<&Credentials>,
        secret: &SecretVersion,
    ) -> Result<String, AppError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GcpSecretManager;

#[async_trait]
impl SecretStore for GcpSecretManager {
    async fn access(
        &self,
        credentials: Option<&Credentials>,
        secret: &SecretVersion,
    ) -> Result<String, AppError> {
        match credentials {
            Some(credentials) => {
                let auth = ServiceAccountAuthenticator::builder(credentials.key.clone())
                    .build()
                    .await
                    .map_err(|e| {
                        AppError::Credentials(format!("Failed to build authenticator: {}", e))
                    })?;
                access_secret(auth, secret).await
            }
            None => {
                let opts = ApplicationDefaultCredentialsFlowOpts::default();
                let auth = match ApplicationDefaultCredentialsAuthenticator::builder(opts).await {
                    ApplicationDefaultCredentialsTypes::InstanceMetadata(auth) => auth.build().await,
                    ApplicationDefaultCredentialsTypes::ServiceAccount(auth) => auth.build().await,
                }
                .map_err(|e| {
                    AppError::Credentials(format!(
                        "Failed to resolve environment credentials: {}",
                        e
                    ))
                })?;
                access_secret(auth, secret).await
            }
        }
    }
}

async fn access_secret<A>(auth: A, secret: &SecretVersion) -> Result<String, AppError>
where
    A: GetToken + 'static,
{
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|e| AppError::SecretStore(format!("Failed to load native roots: {}", e)))?
        .https_or_http()
        .enable_http1()
        .build();

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(connector);

    let hub = SecretManager::new(client, auth);
    let name = secret.resource_name();

    let (_, response) = hub
        .projects()
        .secrets_versions_access(&name)
        .doit()
        .await
        .map_err(|e| AppError::SecretStore(format!("Failed to access {}: {}", name, e)))?;

    let data = response
        .payload
        .and_then(|p| p.data)
        .ok_or_else(|| AppError::SecretStore(format!("Secret {} has no payload", name)))?;

    String::from_utf8(data)
        .map_err(|_| AppError::SecretStore(format!("Secret {} is not valid UTF-8", name)))
}
