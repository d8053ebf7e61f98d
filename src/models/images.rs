use std::{fmt, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
pub const MAX_FILES: usize = 2;

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct PostImage {
    pub id: Uuid,
    #[serde(rename = "postId")]
    pub post_id: Uuid,
    pub filename: String,
    #[serde(rename = "thumbnailFilename")]
    pub thumbnail_filename: String,
    #[serde(rename = "publicPath")]
    pub public_path: String,
    #[serde(rename = "thumbnailPath")]
    pub thumbnail_path: String,
    pub caption: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A file field read from a multipart request, not yet checked.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// An accepted upload staged in the private upload directory.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub filename: String,
    pub thumbnail_filename: String,
    pub public_path: String,
    pub thumbnail_path: String,
}

/// Files attached to a create or edit request.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub files: Vec<IncomingFile>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_size: usize,
    pub allow_gif: bool,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES,
            max_file_size: MAX_FILE_SIZE,
            allow_gif: false,
        }
    }
}

impl UploadLimits {
    pub fn accepts_type(&self, content_type: &str) -> bool {
        match content_type.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/png" => true,
            "image/gif" => self.allow_gif,
            _ => false,
        }
    }

    /// Body limit for form routes; a request one file over the count
    /// limit must still reach the handler so the post can be saved.
    pub fn request_body_limit(&self) -> usize {
        self.max_file_size * (self.max_files + 2)
    }

    pub fn check_batch(&self, files: &[IncomingFile]) -> Result<(), UploadError> {
        if files.len() > self.max_files {
            return Err(UploadError::TooManyFiles {
                max: self.max_files,
            });
        }
        for file in files {
            if file.bytes.len() > self.max_file_size {
                return Err(UploadError::FileTooLarge {
                    max_bytes: self.max_file_size,
                });
            }
            if !self.accepts_type(&file.content_type) {
                return Err(UploadError::InvalidFileType {
                    allow_gif: self.allow_gif,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    TooManyFiles { max: usize },
    FileTooLarge { max_bytes: usize },
    InvalidFileType { allow_gif: bool },
    InvalidFormData,
    Storage,
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyFiles { max } => write!(f, "Too many files. Maximum {max} images allowed."),
            Self::FileTooLarge { max_bytes } => write!(
                f,
                "File too large. Maximum size is {}MB.",
                max_bytes.div_ceil(1024 * 1024)
            ),
            Self::InvalidFileType { allow_gif: false } => {
                write!(f, "Invalid file type. Only JPEG and PNG images are allowed.")
            }
            Self::InvalidFileType { allow_gif: true } => {
                write!(f, "Invalid file type. Only JPEG, PNG and GIF images are allowed.")
            }
            Self::InvalidFormData => write!(f, "Upload form data was invalid."),
            Self::Storage => write!(f, "Could not store uploaded file, please retry later."),
        }
    }
}
