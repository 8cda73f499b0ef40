use std::fmt;
use std::path::{Component, Path};

use crate::common::errors::SelectionError;

//===============
// File names
//===============
#[derive(Debug, PartialEq, Eq)]
pub enum FileNameError {
    ContainsParentDir,
    ContainsSeparator,
    AbsolutePath,
    NullByte,
    Empty,
}

impl fmt::Display for FileNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileNameError::ContainsParentDir => write!(f, "name contains parent directory (..)"),
            FileNameError::ContainsSeparator => write!(f, "name contains a path separator"),
            FileNameError::AbsolutePath => write!(f, "name is an absolute path"),
            FileNameError::NullByte => write!(f, "name contains null byte"),
            FileNameError::Empty => write!(f, "name is empty"),
        }
    }
}

impl std::error::Error for FileNameError {}

// The service joins the name onto the session directory, so only a single
// normal path component is accepted.
pub fn validate_filename(name: &str) -> Result<(), FileNameError> {
    if name.is_empty() {
        return Err(FileNameError::Empty);
    }

    // \0 would terminate the name early in C-style APIs on the server
    if name.contains('\0') {
        return Err(FileNameError::NullByte);
    }

    let path = Path::new(name);
    if path.is_absolute() {
        return Err(FileNameError::AbsolutePath);
    }

    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(_)) => {}
        Some(Component::ParentDir) => return Err(FileNameError::ContainsParentDir),
        Some(Component::RootDir) | Some(Component::Prefix(_)) => {
            return Err(FileNameError::AbsolutePath)
        }
        Some(Component::CurDir) | None => return Err(FileNameError::Empty),
    }

    if components.next().is_some() || name.contains('/') || name.contains('\\') {
        return Err(FileNameError::ContainsSeparator);
    }

    Ok(())
}

//===============
// Structure labels
//===============

/// Subject and session labels: ASCII letters and digits only.
pub fn validate_label(field: &'static str, value: &str) -> Result<(), SelectionError> {
    if value.is_empty() {
        return Err(invalid(field, value, "must not be empty"));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid(field, value, "only letters and digits are allowed"));
    }
    Ok(())
}

/// Data types are lowercase words such as `eeg`, `meg` or `mri`.
pub fn validate_data_type(value: &str) -> Result<(), SelectionError> {
    if value.is_empty() {
        return Err(invalid("data type", value, "must not be empty"));
    }
    if !value.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(invalid(
            "data type",
            value,
            "only lowercase letters are allowed",
        ));
    }
    Ok(())
}

/// Project numbers look like `3010000.01`.
pub fn validate_project_number(value: &str) -> Result<(), SelectionError> {
    if value.is_empty() {
        return Err(invalid("project number", value, "must not be empty"));
    }
    if !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid(
            "project number",
            value,
            "only digits and dots are allowed",
        ));
    }
    Ok(())
}

fn invalid(field: &'static str, value: &str, reason: &'static str) -> SelectionError {
    SelectionError::InvalidLabel {
        field,
        value: value.to_string(),
        reason,
    }
}
