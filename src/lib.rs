pub mod db;
pub mod domain;
pub mod models;
pub mod processing;
pub mod repository;

/// Cleaned documents shorter than this many characters are discarded.
pub const MIN_CHARS: usize = 500;

/// Number of documents written per upsert transaction.
pub const BATCH_SIZE: usize = 200;

/// Longest title kept without truncation.
pub const MAX_TITLE_CHARS: usize = 300;

/// Characters kept from an over-long title before the `...` marker.
pub const TITLE_TRUNCATED_CHARS: usize = MAX_TITLE_CHARS - 3;
