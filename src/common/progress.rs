//! Transfer progress model and the aggregator that owns its counters.

use serde::Serialize;

/// Progress of the transfer phase as shown to the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    pub percentage: u8,
    pub num_remaining_files: usize,
}

impl TransferProgress {
    pub fn starting(file_count: usize) -> Self {
        Self {
            percentage: 0,
            num_remaining_files: file_count,
        }
    }

    pub fn complete() -> Self {
        Self {
            percentage: 100,
            num_remaining_files: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percentage == 100 && self.num_remaining_files == 0
    }

    /// Keep the larger percentage and the smaller remaining count, so a
    /// stale report can never move progress backwards.
    pub fn merge(self, newer: TransferProgress) -> TransferProgress {
        TransferProgress {
            percentage: self.percentage.max(newer.percentage),
            num_remaining_files: self.num_remaining_files.min(newer.num_remaining_files),
        }
    }
}

/// Clamp a raw percentage into `0..=100`. Clamping twice changes nothing.
pub fn clamp_percentage(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Single-owner accumulator of per-file completions.
///
/// Only the task that drains transfer completions holds this, so the
/// counters are never updated from two places at once.
#[derive(Debug)]
pub struct ProgressAggregator {
    total_size_bytes: u64,
    file_count: usize,
    bytes_transferred: u64,
    num_remaining_files: usize,
    percentage: u8,
}

impl ProgressAggregator {
    pub fn new(total_size_bytes: u64, file_count: usize) -> Self {
        Self {
            total_size_bytes,
            file_count,
            bytes_transferred: 0,
            num_remaining_files: file_count,
            percentage: 0,
        }
    }

    /// Account for one finished file and return the updated snapshot.
    pub fn file_completed(&mut self, size: u64) -> TransferProgress {
        self.bytes_transferred = self.bytes_transferred.saturating_add(size);

        let raw = if self.total_size_bytes == 0 {
            100
        } else {
            (u128::from(self.bytes_transferred) * 100 / u128::from(self.total_size_bytes)) as i64
        };
        self.percentage = self.percentage.max(clamp_percentage(raw));

        self.num_remaining_files = self
            .num_remaining_files
            .saturating_sub(1)
            .min(self.file_count);

        self.snapshot()
    }

    pub fn snapshot(&self) -> TransferProgress {
        TransferProgress {
            percentage: self.percentage,
            num_remaining_files: self.num_remaining_files,
        }
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }
}
