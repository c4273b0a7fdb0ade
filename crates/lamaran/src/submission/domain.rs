use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Multipart field names posted by the application form.
pub const FIELD_FULL_NAME: &str = "nama";
pub const FIELD_PHONE: &str = "no_hp";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_POSITION: &str = "posisi";
pub const FIELD_CV: &str = "cv";

pub const REQUIRED_TEXT_FIELDS: [&str; 4] =
    [FIELD_FULL_NAME, FIELD_PHONE, FIELD_EMAIL, FIELD_POSITION];

/// Used when neither the filename nor the declared MIME type yields an extension.
pub const FALLBACK_EXTENSION: &str = ".bin";

const MAX_EXTENSION_LEN: usize = 10;

/// A form slot as delivered by the decoder: one value, or every value when the
/// client repeated the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<T> {
    Single(T),
    Many(Vec<T>),
}

impl<T> FieldValue<T> {
    /// Record another occurrence of the same key, preserving arrival order.
    pub fn push(self, value: T) -> Self {
        match self {
            FieldValue::Single(first) => FieldValue::Many(vec![first, value]),
            FieldValue::Many(mut values) => {
                values.push(value);
                FieldValue::Many(values)
            }
        }
    }

    /// The first occurrence is authoritative; later ones are dropped.
    pub fn first_or_self(self) -> Option<T> {
        match self {
            FieldValue::Single(value) => Some(value),
            FieldValue::Many(values) => values.into_iter().next(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValue::Single(_) => 1,
            FieldValue::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validated applicant record. Every field is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionFields {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub position: String,
}

/// CV bytes staged on local disk, owned by whoever holds this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub local_path: PathBuf,
    pub original_name: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
}

impl UploadedFile {
    /// Extension including the leading dot, e.g. `.pdf`.
    pub fn extension(&self) -> String {
        derive_extension(self.original_name.as_deref(), self.mime_type.as_deref())
    }

    pub fn mime_or_default(&self) -> &str {
        self.mime_type
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or("application/octet-stream")
    }
}

/// Extension from the client filename, then the declared MIME type, then `.bin`.
/// Only short alphanumeric extensions are accepted since the filename is untrusted.
pub fn derive_extension(original_name: Option<&str>, mime_type: Option<&str>) -> String {
    let from_name = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| is_safe_extension(ext));
    if let Some(ext) = from_name {
        return format!(".{ext}");
    }

    let from_mime = mime_type
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|candidates| candidates.first().copied())
        .filter(|ext| is_safe_extension(ext));
    match from_mime {
        Some(ext) => format!(".{ext}"),
        None => FALLBACK_EXTENSION.to_string(),
    }
}

fn is_safe_extension(ext: &str) -> bool {
    !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

/// `"{full_name} - {position} - CV{extension}"`.
pub fn remote_file_name(fields: &SubmissionFields, file: &UploadedFile) -> String {
    format!(
        "{} - {} - CV{}",
        fields.full_name,
        fields.position,
        file.extension()
    )
}

/// One spreadsheet row describing a committed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRecord {
    pub timestamp: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub position: String,
    pub link: String,
}

impl RemoteRecord {
    pub fn new(fields: &SubmissionFields, link: String, at: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp: format_civil_timestamp(&at),
            full_name: fields.full_name.clone(),
            phone: fields.phone.clone(),
            email: fields.email.clone(),
            position: fields.position.clone(),
            link,
        }
    }

    /// Column order A..F: timestamp, name, phone, email, position, link.
    pub fn into_row(self) -> Vec<String> {
        vec![
            self.timestamp,
            self.full_name,
            self.phone,
            self.email,
            self.position,
            self.link,
        ]
    }
}

/// Indonesian civil format, e.g. `5/3/2025, 14.07.09`.
pub fn format_civil_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format("%-d/%-m/%Y, %H.%M.%S").to_string()
}
