//! Policy artifact staging and atomic publication

pub mod installer;

pub use installer::{InstallError, PolicyInstaller, BUNDLE_EXT};
