//! Upload folders, allowed content types and object key layout.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::MarketplaceError;

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const PDF: &str = "application/pdf";
const DOC: &str = "application/msword";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const JPEG: &str = "image/jpeg";
const PNG: &str = "image/png";
const WEBP: &str = "image/webp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFolder {
    Resumes,
    Profiles,
    Portfolios,
    Certifications,
    Licenses,
}

impl UploadFolder {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadFolder::Resumes => "resumes",
            UploadFolder::Profiles => "profiles",
            UploadFolder::Portfolios => "portfolios",
            UploadFolder::Certifications => "certifications",
            UploadFolder::Licenses => "licenses",
        }
    }

    pub fn allowed_types(self) -> &'static [&'static str] {
        match self {
            UploadFolder::Resumes => &[PDF, DOC, DOCX],
            UploadFolder::Profiles | UploadFolder::Portfolios => &[JPEG, PNG, WEBP],
            UploadFolder::Certifications | UploadFolder::Licenses => &[PDF, JPEG, PNG],
        }
    }

    pub fn accepts(self, content_type: &str) -> bool {
        self.allowed_types().contains(&content_type)
    }
}

impl fmt::Display for UploadFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadFolder {
    type Err = MarketplaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resumes" => Ok(UploadFolder::Resumes),
            "profiles" => Ok(UploadFolder::Profiles),
            "portfolios" => Ok(UploadFolder::Portfolios),
            "certifications" => Ok(UploadFolder::Certifications),
            "licenses" => Ok(UploadFolder::Licenses),
            _ => Err(MarketplaceError::ValidationError("Invalid folder".to_string())),
        }
    }
}

/// Body of `POST /api/upload`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub folder: String,
    /// Declared size in bytes, when the client knows it.
    pub size: Option<u64>,
}

impl UploadRequest {
    pub fn validate(&self) -> Result<UploadFolder, MarketplaceError> {
        if self.filename.trim().is_empty() || self.content_type.is_empty() || self.folder.is_empty() {
            return Err(MarketplaceError::ValidationError(
                "Missing required fields: filename, contentType, folder".to_string(),
            ));
        }

        let folder: UploadFolder = self.folder.parse()?;
        if !folder.accepts(&self.content_type) {
            return Err(MarketplaceError::ValidationError(format!(
                "Invalid file type. Allowed types: {}",
                folder.allowed_types().join(", ")
            )));
        }

        if self.size.is_some_and(|size| size > MAX_UPLOAD_BYTES) {
            return Err(MarketplaceError::ValidationError(
                "File is too large. Maximum size is 10MB".to_string(),
            ));
        }

        Ok(folder)
    }
}

/// Replace everything outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// `{folder}/{user_id}/{unix_millis}-{sanitized filename}`
pub fn generate_file_key(folder: UploadFolder, user_id: &str, filename: &str, unix_millis: i64) -> String {
    format!("{}/{}/{}-{}", folder, user_id, unix_millis, sanitize_filename(filename))
}
