use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use globset::{GlobBuilder, GlobSetBuilder};
use parking_lot::Mutex;

use crate::CommentscanResult;
use crate::error::{CommentscanError, ErrorKind};

use super::FilePath;
use super::http::{HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService};
use super::traits::Pal;

/* 📖 # Why does MockPal record every access?

Several guarantees of a scan are about what does NOT happen: a rejected request never
touches the filesystem, and a binary-only file stops the scan before later files are
read. MockPal keeps a log of every call so tests can assert on those directly.
*/

/// In-memory PAL implementation for testing.
///
/// Directories are implied by the files stored below them, or added explicitly.
///
/// ```
/// use commentscan_base::{FilePath, MockPal, Pal};
///
/// let mock = MockPal::new();
/// mock.add_file("/go/src/fmt/doc.go", "package fmt\n");
/// assert!(mock.is_directory(&FilePath::from("/go/src/fmt")).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct MockPal {
    files: Arc<Mutex<BTreeMap<FilePath, Vec<u8>>>>,
    directories: Arc<Mutex<BTreeSet<FilePath>>>,
    working_dir: FilePath,
    accesses: Arc<Mutex<Vec<PalAccess>>>,
    http_servers: Arc<Mutex<HashMap<u16, Box<dyn HttpService>>>>,
    next_port: Arc<AtomicU16>,
}

/// A recorded filesystem call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PalAccess {
    IsDirectory(FilePath),
    ListDirectory(FilePath),
    ReadFile(FilePath),
}

impl MockPal {
    /// Create an empty MockPal with `/work` as working directory.
    pub fn new() -> Self {
        Self::with_working_directory("/work")
    }

    pub fn with_working_directory(working_dir: impl Into<FilePath>) -> Self {
        Self {
            files: Arc::new(Mutex::new(BTreeMap::new())),
            directories: Arc::new(Mutex::new(BTreeSet::new())),
            working_dir: working_dir.into(),
            accesses: Arc::new(Mutex::new(Vec::new())),
            http_servers: Arc::new(Mutex::new(HashMap::new())),
            next_port: Arc::new(AtomicU16::new(10000)),
        }
    }

    /// Add a file. Relative paths are placed under the working directory.
    pub fn add_file(&self, path: impl Into<FilePath>, content: impl Into<Vec<u8>>) {
        let path = self.resolve(&path.into());
        self.files.lock().insert(path, content.into());
    }

    /// Add an (possibly empty) directory.
    pub fn add_directory(&self, path: impl Into<FilePath>) {
        let path = self.resolve(&path.into());
        self.directories.lock().insert(path);
    }

    /// Every filesystem call made so far, in order.
    pub fn accesses(&self) -> Vec<PalAccess> {
        self.accesses.lock().clone()
    }

    /// Paths passed to `read_file`, in order.
    pub fn read_files(&self) -> Vec<FilePath> {
        self.accesses
            .lock()
            .iter()
            .filter_map(|access| match access {
                PalAccess::ReadFile(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Simulate an HTTP request to a server started on this PAL.
    pub fn simulate_request(
        &self,
        port: u16,
        request: HttpRequest,
    ) -> CommentscanResult<HttpResponse> {
        let servers = self.http_servers.lock();
        let service = servers.get(&port).ok_or_else(|| {
            Box::new(CommentscanError::message(format!(
                "No HTTP server registered on port {}",
                port
            )))
        })?;
        service.handle_request(request)
    }

    fn resolve(&self, path: &FilePath) -> FilePath {
        self.working_dir.join(path.as_path()).clean()
    }

    fn record(&self, access: PalAccess) {
        self.accesses.lock().push(access);
    }
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl Pal for MockPal {
    fn is_directory(&self, path: &FilePath) -> CommentscanResult<bool> {
        let resolved = self.resolve(path);
        self.record(PalAccess::IsDirectory(resolved.clone()));
        if self.directories.lock().contains(&resolved) {
            return Ok(true);
        }
        let files = self.files.lock();
        Ok(files
            .keys()
            .any(|file| file != &resolved && file.as_path().starts_with(resolved.as_path())))
    }

    fn list_directory(
        &self,
        path: &FilePath,
        globs: &[String],
    ) -> CommentscanResult<Vec<FilePath>> {
        let resolved = self.resolve(path);
        self.record(PalAccess::ListDirectory(resolved.clone()));
        if !self.is_directory(path)? {
            return Err(Box::new(CommentscanError::new(ErrorKind::FileError {
                path: resolved.into_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
            })));
        }

        let mut builder = GlobSetBuilder::new();
        for glob in globs {
            let compiled = GlobBuilder::new(glob).build().map_err(|e| {
                Box::new(CommentscanError::message(format!(
                    "Invalid glob pattern '{}': {}",
                    glob, e
                )))
            })?;
            builder.add(compiled);
        }
        let glob_set = builder.build().map_err(|e| {
            Box::new(CommentscanError::message(format!(
                "Failed to build glob set: {}",
                e
            )))
        })?;

        let files = self.files.lock();
        let mut names: Vec<String> = files
            .keys()
            .filter(|file| file.parent().as_ref() == Some(&resolved))
            .filter_map(|file| file.file_name().map(str::to_string))
            .filter(|name| glob_set.is_match(name))
            .collect();
        names.sort();
        Ok(names.into_iter().map(|name| path.join(name)).collect())
    }

    fn read_file(&self, path: &FilePath) -> CommentscanResult<Box<dyn Read + 'static>> {
        let resolved = self.resolve(path);
        self.record(PalAccess::ReadFile(resolved.clone()));
        let files = self.files.lock();
        let content = files.get(&resolved).cloned().ok_or_else(|| {
            Box::new(CommentscanError::new(ErrorKind::FileError {
                path: resolved.as_path().to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", resolved),
                ),
            }))
        })?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn working_directory(&self) -> CommentscanResult<FilePath> {
        Ok(self.working_dir.clone())
    }

    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> CommentscanResult<HttpServerHandle> {
        let port = match config.port {
            Some(port) => port,
            None => self.next_port.fetch_add(1, Ordering::SeqCst),
        };
        self.http_servers.lock().insert(port, service);
        Ok(HttpServerHandle::new(port))
    }
}
