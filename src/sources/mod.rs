mod file_source;
mod trait_def;

pub use file_source::{FileLibrarySource, ENRICHMENT_FILE_NAME};
pub use trait_def::{LibrarySource, NoopRunObserver, RunObserver};
