//! CLI command handlers. Each command is in its own file.

mod formats;
mod get;
mod info;
mod path;

pub use formats::run_formats;
pub use get::run_get;
#[cfg(test)]
pub(crate) use get::progress_line;
pub use info::run_info;
pub use path::run_path;
