use std::io::Read;
use std::sync::Arc;

use crate::CommentscanResult;
use crate::error::{CommentscanError, ErrorKind};

use super::file_path::FilePath;
use super::http::{HttpServerConfig, HttpServerHandle, HttpService};

/* 📖 # Why is Pal a trait instead of a struct?

Package resolution walks GOROOT and GOPATH, reads file headers and parses sources.
Behind a trait, unit tests describe a whole Go tree in memory with MockPal and assert
exactly which files were touched, while production uses RealPal.
*/

/// Platform Abstraction Layer (PAL) trait providing filesystem and HTTP operations.
///
/// Two implementations are provided:
/// - `RealPal`: Uses the real filesystem and tiny_http
/// - `MockPal`: In-memory implementation for testing
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Check whether a directory exists at the given path.
    fn is_directory(&self, path: &FilePath) -> CommentscanResult<bool>;

    /// List the regular files directly inside `path` whose names match any of `globs`.
    ///
    /// The listing is not recursive and is sorted by file name. Returned paths are
    /// `path` joined with the file name.
    fn list_directory(&self, path: &FilePath, globs: &[String])
    -> CommentscanResult<Vec<FilePath>>;

    /// Open a file for reading.
    fn read_file(&self, path: &FilePath) -> CommentscanResult<Box<dyn Read + 'static>>;

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &FilePath) -> CommentscanResult<String> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).map_err(|e| {
            Box::new(CommentscanError::new(ErrorKind::FileError {
                path: path.as_path().to_path_buf(),
                source: e,
            }))
        })?;
        String::from_utf8(contents).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            let line_start = valid.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
            Box::new(CommentscanError::new(ErrorKind::Syntax {
                path: path.as_path().to_path_buf(),
                line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
                column: valid.len() - line_start + 1,
                message: "illegal UTF-8 encoding".to_string(),
            }))
        })
    }

    /// Directory that relative package paths are resolved against.
    fn working_directory(&self) -> CommentscanResult<FilePath>;

    /// Start an HTTP server with the given service.
    ///
    /// The server accepts connections immediately. Dropping the returned handle (or
    /// calling `shutdown()`) stops it from accepting new connections.
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> CommentscanResult<HttpServerHandle>;
}

/// Handle to a PAL implementation, enabling shared ownership.
///
/// Internally wraps `Arc<dyn Pal>` for cheap cloning and thread-safe sharing.
///
/// ```no_run
/// use commentscan_base::{PalHandle, RealPal};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let pal_clone = pal.clone();
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
