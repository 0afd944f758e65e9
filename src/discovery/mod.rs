//! File discovery

pub mod scanner;

pub use scanner::{check_access, is_candidate, normalize_path, scan, ScanOptions};
