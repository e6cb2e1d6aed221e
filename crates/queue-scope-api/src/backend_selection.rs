//! Chooses the queue backend once at startup.

use crate::config::BackendConfig;
use crate::errors::ServiceError;
use queue_scope_runtime::{
    AwsSqsProvider, BackendContext, BackendError, BackendMode, DemoBackend, QueueBackend,
};
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(test)]
#[path = "backend_selection_tests.rs"]
mod tests;

/// The backend the service runs against and how it is described to users.
pub struct SelectedBackend {
    pub backend: Arc<dyn QueueBackend>,
    pub context: BackendContext,
}

impl SelectedBackend {
    pub fn demo() -> Self {
        Self {
            backend: Arc::new(DemoBackend::new()),
            context: BackendContext::demo(),
        }
    }
}

/// Select the live SQS backend or the demo backend.
///
/// `force_demo` skips AWS entirely. Otherwise the live backend is built and
/// probed with a one-queue listing; if that fails the service falls back to
/// the demo backend, unless `force_live` is set.
///
/// # Errors
///
/// Returns [`ServiceError::BackendUnavailable`] when live mode is forced and
/// the backend cannot be built or reached.
pub async fn select_backend(config: &BackendConfig) -> Result<SelectedBackend, ServiceError> {
    select_backend_with(config, &|key| std::env::var(key).ok()).await
}

/// [`select_backend`] with environment variables read through `lookup`.
pub async fn select_backend_with(
    config: &BackendConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<SelectedBackend, ServiceError> {
    if config.force_demo {
        info!("Demo mode forced by configuration");
        return Ok(SelectedBackend::demo());
    }

    match connect_live(config, lookup).await {
        Ok(selected) => Ok(selected),
        Err(error) if config.force_live => Err(ServiceError::BackendUnavailable {
            message: error.to_string(),
        }),
        Err(error) => {
            warn!(error = %error, "AWS backend unavailable, falling back to demo mode");
            Ok(SelectedBackend::demo())
        }
    }
}

async fn connect_live(
    config: &BackendConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<SelectedBackend, BackendError> {
    let provider = AwsSqsProvider::resolve(config.aws.to_sqs_config(), lookup)?;
    provider.list_queues(1).await?;

    let account_id = match provider.caller_account_id().await {
        Ok(account) => Some(account),
        Err(error) => {
            warn!(error = %error, "Could not determine AWS account");
            None
        }
    };

    let context = BackendContext {
        mode: BackendMode::Live,
        region: Some(provider.region().to_string()),
        profile: provider.profile().map(str::to_string),
        account_id,
    };

    info!(
        region = %provider.region(),
        profile = ?provider.profile(),
        account_id = ?context.account_id,
        "Connected to AWS SQS"
    );

    Ok(SelectedBackend {
        backend: Arc::new(provider),
        context,
    })
}
