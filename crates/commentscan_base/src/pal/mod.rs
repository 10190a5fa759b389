/* 📖 # What is the Platform Abstraction Layer?

The PAL is a trait-based abstraction over the filesystem and the HTTP server.
Package resolution and comment extraction only touch the outside world through it,
so MockPal can stand in with an in-memory tree of Go sources and simulated requests.
*/

mod file_path;
pub mod http;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{Pal, PalHandle};
