//! Building the file selection that feeds an upload session.

use super::errors::SelectionError;
use super::types::FileDescriptor;
use crate::utils::security;

/// 1 GiB, the largest file the service accepts.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 1024 * 1024 * 1024;

/// Ordered set of files with unique names and a running byte total.
#[derive(Debug, Clone)]
pub struct FilesSelection {
    files: Vec<FileDescriptor>,
    total_size_bytes: u64,
    max_file_size_bytes: u64,
}

impl Default for FilesSelection {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE_BYTES)
    }
}

impl FilesSelection {
    pub fn new(max_file_size_bytes: u64) -> Self {
        Self {
            files: Vec::new(),
            total_size_bytes: 0,
            max_file_size_bytes,
        }
    }

    /// Build a selection in one go, stopping at the first refused file.
    pub fn from_files(
        files: impl IntoIterator<Item = FileDescriptor>,
        max_file_size_bytes: u64,
    ) -> Result<Self, SelectionError> {
        let mut selection = Self::new(max_file_size_bytes);
        for file in files {
            selection.add(file)?;
        }
        Ok(selection)
    }

    /// Append a file. Duplicates are refused, never merged.
    pub fn add(&mut self, file: FileDescriptor) -> Result<(), SelectionError> {
        security::validate_filename(&file.name).map_err(|e| SelectionError::InvalidFileName {
            name: file.name.clone(),
            reason: e.to_string(),
        })?;

        if self.contains_name(&file.name) {
            return Err(SelectionError::DuplicateName(file.name));
        }

        if file.size > self.max_file_size_bytes {
            return Err(SelectionError::TooLarge {
                name: file.name,
                size: file.size,
                limit: self.max_file_size_bytes,
            });
        }

        tracing::debug!("Selected {} ({} bytes)", file.name, file.size);
        self.total_size_bytes += file.size;
        self.files.push(file);
        Ok(())
    }

    /// Drop the file with the given uid. Returns the removed descriptor.
    pub fn remove(&mut self, uid: &str) -> Option<FileDescriptor> {
        let index = self.files.iter().position(|f| f.uid == uid)?;
        let removed = self.files.remove(index);
        self.total_size_bytes -= removed.size;
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.total_size_bytes = 0;
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    pub fn names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.total_size_bytes
    }
}
