//! Multipart form collection for the submission endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;

/// Largest accepted file part.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// An uploaded file part.
#[derive(Debug)]
pub struct FilePart {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Text fields and file parts of a multipart body, keyed by field name.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FilePart>,
}

impl SubmissionForm {
    /// Drain a multipart body. Parts with a file name are files; the rest
    /// are text. A repeated field name keeps the last value.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if let Some(file_name) = field.file_name().map(str::to_owned) {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable file {name}: {e}")))?;
                if bytes.len() > MAX_FILE_BYTES {
                    return Err(AppError::BadRequest(format!(
                        "{name} exceeds {MAX_FILE_BYTES} bytes"
                    )));
                }
                form.files.insert(
                    name,
                    FilePart {
                        file_name,
                        bytes: bytes.to_vec(),
                    },
                );
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable field {name}: {e}")))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// A required, non-blank text field.
    pub fn text(&self, name: &str) -> Result<String, AppError> {
        self.optional_text(name)
            .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))
    }

    /// A text field, `None` when missing or blank.
    #[must_use]
    pub fn optional_text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    /// Parse a required text field.
    pub fn parse<T>(&self, name: &str) -> Result<T, AppError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.text(name)?
            .parse()
            .map_err(|e| AppError::BadRequest(format!("invalid {name}: {e}")))
    }

    /// Take a required file part.
    pub fn take_file(&mut self, name: &str) -> Result<FilePart, AppError> {
        self.files
            .remove(name)
            .ok_or_else(|| AppError::BadRequest(format!("{name} file is required")))
    }
}
