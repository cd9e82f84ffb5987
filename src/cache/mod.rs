//! Persistent license storage.

pub mod file;

pub use file::LicenseStore;
