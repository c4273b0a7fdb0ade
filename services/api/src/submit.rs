use crate::infra::build_submission_service;
use clap::Args;
use lamaran::config::{AppConfig, GoogleConfig};
use lamaran::error::AppError;
use lamaran::submission::domain::{FIELD_EMAIL, FIELD_FULL_NAME, FIELD_PHONE, FIELD_POSITION};
use lamaran::submission::SubmissionIntake;
use lamaran::telemetry;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// Applicant full name
    #[arg(long)]
    pub(crate) nama: String,
    /// Phone / WhatsApp number, recorded as typed
    #[arg(long = "no-hp")]
    pub(crate) no_hp: String,
    /// Applicant e-mail address
    #[arg(long)]
    pub(crate) email: String,
    /// Position applied for
    #[arg(long)]
    pub(crate) posisi: String,
    /// CV file to upload; the original is copied, never deleted
    #[arg(long)]
    pub(crate) cv: PathBuf,
    /// Content type sent to Drive (guessed from the file extension when omitted)
    #[arg(long)]
    pub(crate) mime_type: Option<String>,
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let SubmitArgs {
        nama,
        no_hp,
        email,
        posisi,
        cv,
        mime_type,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let fields = SubmissionIntake::fields_from_pairs([
        (FIELD_FULL_NAME.to_string(), nama),
        (FIELD_PHONE.to_string(), no_hp),
        (FIELD_EMAIL.to_string(), email),
        (FIELD_POSITION.to_string(), posisi),
    ])?;
    let mime_type = mime_type.or_else(|| {
        mime_guess::from_path(&cv)
            .first_raw()
            .map(str::to_string)
    });

    let google_config = GoogleConfig::load()?;
    let service = build_submission_service(&config, &google_config).await?;

    let file = service.intake().stage_local_copy(&cv, mime_type).await?;
    let receipt = service.committer().commit(&fields, file).await?;

    println!("Submission recorded for {}", fields.full_name);
    println!("- Drive file: {} ({})", receipt.file_id, receipt.link);
    println!("- Timestamp: {}", receipt.record.timestamp);
    if let Some(range) = receipt.updated_range {
        println!("- Sheet range: {range}");
    }

    Ok(())
}
