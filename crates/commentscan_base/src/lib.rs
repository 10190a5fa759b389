/* 📖 # Why have commentscan_base as a core library?
commentscan_base provides the error type, tracing setup and the platform abstraction
layer shared by the engine and the CLI. Keeping them here prevents circular
dependencies between crates.
*/

pub mod error;
mod error_tests;
pub mod pal;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{CommentscanError, CommentscanResult, ErrorKind, ResultExt};
pub use pal::{FilePath, MockPal, Pal, PalHandle, RealPal};
