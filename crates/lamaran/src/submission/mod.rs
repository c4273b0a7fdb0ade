//! Job application intake: multipart ingestion of the form, then an upload-then-record
//! commit against Drive and Sheets.

pub mod committer;
pub mod domain;
pub mod intake;
pub mod router;

#[cfg(test)]
mod tests;

pub use committer::{CommitError, CommitReceipt, CommitTarget, SubmissionCommitter};
pub use domain::{
    remote_file_name, FieldValue, RemoteRecord, SubmissionFields, UploadedFile,
};
pub use intake::{IntakeError, Submission, SubmissionIntake};
pub use router::{
    submission_router, MessageBody, SubmissionError, SubmissionService, SUBMIT_PATH,
    SUCCESS_MESSAGE,
};
