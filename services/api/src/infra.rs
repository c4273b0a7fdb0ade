use lamaran::config::{AppConfig, GoogleConfig};
use lamaran::error::AppError;
use lamaran::google::{self, ServiceAccountCredentials};
use lamaran::submission::{CommitTarget, SubmissionCommitter, SubmissionIntake, SubmissionService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Authenticates against Google and wires intake and committer together.
pub(crate) async fn build_submission_service(
    config: &AppConfig,
    google_config: &GoogleConfig,
) -> Result<SubmissionService, AppError> {
    let credentials = ServiceAccountCredentials::from_config(google_config);
    let clients = google::connect(&credentials).await?;
    info!(
        principal = %credentials.client_email,
        folder = %google_config.drive_folder_id,
        range = %google_config.sheets_range,
        "google clients ready"
    );

    let intake = SubmissionIntake::new(&config.intake);
    intake.ensure_scratch_dir().await?;

    let committer = SubmissionCommitter::from_clients(
        clients,
        CommitTarget::from_config(google_config),
        &config.commit,
    );

    Ok(SubmissionService::new(intake, committer))
}
