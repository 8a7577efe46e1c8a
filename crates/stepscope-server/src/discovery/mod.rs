//! Workspace file enumeration.
//!
//! Locates step definition sources and feature files for the language
//! server.

mod workspace;

pub use workspace::{
    StepFiles, find_feature_files, find_step_files, is_feature_file, is_step_file,
};
