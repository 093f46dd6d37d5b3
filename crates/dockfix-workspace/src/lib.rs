//! Finding the build files to work on.
//!
//! [`FileMatcher`] decides which names count as build files and
//! [`walk_files`] collects them from files and directories given on the
//! command line, honouring `.gitignore` the way ripgrep does.

mod matcher;
mod walk;

pub use matcher::FileMatcher;
pub use matcher::PatternError;
pub use walk::walk_files;
pub use walk::WalkOptions;
