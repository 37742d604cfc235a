//! Validation of loaded api files.
//!
//! - [`cross_file`]: rules between the root and each import (nested imports,
//!   syntax and service consistency, cross-file duplicates)
//! - [`references`]: every type reference resolves

pub mod cross_file;
pub mod references;

pub use cross_file::CrossFileValidator;
pub use references::{check_references, ReferenceChecker};
