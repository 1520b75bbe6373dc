//! Archive extraction.
//!
//! The primary strategy shells out to an external tool through the
//! [`ExtractTool`] capability; the fallback unpacks in-process with the
//! `tar` crate.

pub mod engine;
pub mod permissions;
pub mod tool;

pub use engine::ExtractionEngine;
pub use engine::ExtractionMethod;
pub use engine::ExtractionResult;
pub use engine::target_dir_for;
pub use engine::unpack_in_process;
pub use tool::ExtractTool;
pub use tool::SystemTar;
pub use tool::ToolStatus;
