//! Mixxx library importer

pub mod importer;
pub mod locate;
pub mod location;
pub mod mixxx;

pub use importer::{ImportJob, ImportSummary, ImportedTrack};
pub use locate::{locate_database, resolve_database_arg, DATABASE_FILENAME};
pub use location::{is_wsl, translate_windows_path, LocationResolver};
pub use mixxx::{LibraryRecord, MixxxLibrary};
