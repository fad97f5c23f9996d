//! Image uploads and label scanning.

pub mod label_scan;
pub mod store;

pub use label_scan::{LabelConfidence, LabelGuess, LabelScanner, LabelSuggestion, ScanError};
pub use store::LocalObjectStore;
