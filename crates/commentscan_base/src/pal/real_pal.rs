use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::CommentscanResult;
use crate::error::{CommentscanError, ErrorKind};

use super::FilePath;
use super::http::{
    HttpBody, HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle,
    HttpService, HttpStatusCode,
};
use super::traits::Pal;

/* 📖 # Why std::fs and threads instead of async?

A scan is a strictly sequential walk: resolve, then read and parse one file after
another. Blocking std::fs calls express that directly. The HTTP server gives every
request its own thread, so one slow scan never holds up another.
*/

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// PAL implementation backed by the real filesystem and tiny_http.
///
/// Relative paths are resolved against the configured working directory.
#[derive(Debug)]
pub struct RealPal {
    working_dir: PathBuf,
}

impl RealPal {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        self.working_dir.join(path.as_path())
    }

    #[instrument(skip(self))]
    fn build_glob_set(&self, globs: &[String]) -> CommentscanResult<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for glob in globs {
            let compiled = GlobBuilder::new(glob).literal_separator(true).build().map_err(|e| {
                debug!(pattern = %glob, error = %e, "failed to compile glob pattern");
                Box::new(CommentscanError::message(format!(
                    "Invalid glob pattern '{}': {}",
                    glob, e
                )))
            })?;
            builder.add(compiled);
        }
        builder.build().map_err(|e| {
            Box::new(CommentscanError::message(format!(
                "Failed to build glob set: {}",
                e
            )))
        })
    }
}

fn file_error(path: PathBuf, source: std::io::Error) -> Box<CommentscanError> {
    Box::new(CommentscanError::new(ErrorKind::FileError { path, source }))
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn is_directory(&self, path: &FilePath) -> CommentscanResult<bool> {
        let resolved = self.resolve_path(path);
        let is_dir = resolved.is_dir();
        debug!(is_dir, resolved = %resolved.display(), "checked directory");
        Ok(is_dir)
    }

    #[instrument(skip(self), fields(path = %path, globs = ?globs))]
    fn list_directory(
        &self,
        path: &FilePath,
        globs: &[String],
    ) -> CommentscanResult<Vec<FilePath>> {
        let resolved = self.resolve_path(path);
        if !resolved.is_dir() {
            debug!("directory not found");
            return Err(file_error(
                resolved,
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
            ));
        }
        let glob_set = self.build_glob_set(globs)?;

        let mut files = Vec::new();
        for entry in WalkDir::new(&resolved)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                debug!(error = %e, "error listing directory");
                let entry_path = e
                    .path()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| resolved.clone());
                file_error(entry_path, std::io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name();
            if glob_set.is_match(file_name) {
                files.push(path.join(file_name));
            }
        }
        debug!(file_count = files.len(), "listed directory");
        Ok(files)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> CommentscanResult<Box<dyn Read + 'static>> {
        let resolved = self.resolve_path(path);
        let file = fs::File::open(&resolved).map_err(|e| {
            debug!(error = %e, "failed to open file");
            file_error(resolved.clone(), e)
        })?;
        Ok(Box::new(file))
    }

    fn working_directory(&self) -> CommentscanResult<FilePath> {
        Ok(FilePath::from(self.working_dir.clone()))
    }

    #[instrument(skip(self, service), fields(address = %config.address()))]
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> CommentscanResult<HttpServerHandle> {
        let server = tiny_http::Server::http(config.address()).map_err(|e| {
            Box::new(CommentscanError::message(format!(
                "Failed to start HTTP server on {}: {}",
                config.address(),
                e
            )))
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|address| address.port())
            .unwrap_or_default();
        info!(port, "HTTP server listening");

        let handle = HttpServerHandle::new(port);
        let shutdown = handle.shutdown_flag();
        let service: Arc<dyn HttpService> = Arc::from(service);
        let server_name: Arc<str> = Arc::from(config.server_name.as_str());

        let worker = thread::Builder::new()
            .name("http-accept".to_string())
            .spawn(move || {
                while !shutdown.load(Ordering::SeqCst) {
                    let request = match server.recv_timeout(ACCEPT_POLL_INTERVAL) {
                        Ok(Some(request)) => request,
                        Ok(None) => continue,
                        Err(e) => {
                            crate::critical!(error = %e, "HTTP server stopped accepting requests");
                            break;
                        }
                    };
                    let service = Arc::clone(&service);
                    let server_name = Arc::clone(&server_name);
                    let spawned = thread::Builder::new()
                        .name("http-request".to_string())
                        .spawn(move || serve_request(service.as_ref(), request, &server_name));
                    if let Err(e) = spawned {
                        error!(error = %e, "failed to spawn request thread");
                    }
                }
                debug!("HTTP accept loop finished");
            })
            .map_err(|e| {
                Box::new(CommentscanError::message(format!(
                    "Failed to spawn HTTP server thread: {}",
                    e
                )))
            })?;

        Ok(handle.with_worker(worker))
    }
}

fn serve_request(service: &dyn HttpService, mut request: tiny_http::Request, server_name: &str) {
    let response = match to_http_request(&mut request) {
        Ok(http_request) => service.handle_request(http_request).unwrap_or_else(|e| {
            error!(error = ?e, "HTTP service failed");
            HttpResponse::error(
                HttpStatusCode::InternalServerError,
                HttpStatusCode::InternalServerError.reason_phrase(),
            )
        }),
        Err(response) => response,
    };
    if let Err(e) = request.respond(to_tiny_response(response, server_name)) {
        warn!(error = %e, "failed to send HTTP response");
    }
}

fn to_http_request(request: &mut tiny_http::Request) -> Result<HttpRequest, HttpResponse> {
    let method_name = request.method().to_string();
    let method = HttpMethod::parse(&method_name).ok_or_else(|| {
        HttpResponse::error(
            HttpStatusCode::UnprocessableEntity,
            "Unsupported HTTP method",
        )
    })?;
    let mut http_request = HttpRequest::new(method, request.url());
    for header in request.headers() {
        http_request = http_request.with_header(header.field.to_string(), header.value.to_string());
    }
    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body).map_err(|e| {
        warn!(error = %e, "failed to read request body");
        HttpResponse::error(HttpStatusCode::BadRequest, "Failed to read request body")
    })?;
    Ok(http_request.with_body(HttpBody::from_bytes(body)))
}

fn to_tiny_response(
    response: HttpResponse,
    server_name: &str,
) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let status = tiny_http::StatusCode(response.status().as_u16());
    let mut headers = Vec::new();
    let server_header = std::iter::once(("Server", server_name));
    let response_headers = response
        .headers()
        .all()
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()));
    for (key, value) in server_header.chain(response_headers) {
        match tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes()) {
            Ok(header) => headers.push(header),
            Err(()) => warn!(header = key, "dropping invalid response header"),
        }
    }
    let body = response.into_body().into_bytes();
    let length = body.len();
    tiny_http::Response::new(status, headers, Cursor::new(body), Some(length), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpStream;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, RealPal) {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let pal = RealPal::new(temp_dir.path().to_path_buf());
        (temp_dir, pal)
    }

    #[test]
    fn test_is_directory() {
        let (temp_dir, pal) = setup_test_dir();
        fs::create_dir(temp_dir.path().join("pkg")).unwrap();
        fs::write(temp_dir.path().join("file.go"), "package x").unwrap();

        assert!(pal.is_directory(&FilePath::from("pkg")).unwrap());
        assert!(!pal.is_directory(&FilePath::from("file.go")).unwrap());
        assert!(!pal.is_directory(&FilePath::from("missing")).unwrap());
    }

    #[test]
    fn test_list_directory_is_sorted_flat_and_filtered() {
        let (temp_dir, pal) = setup_test_dir();
        fs::write(temp_dir.path().join("b.go"), "").unwrap();
        fs::write(temp_dir.path().join("a.go"), "").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(temp_dir.path().join("sub.go")).unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested/c.go"), "").unwrap();

        let files = pal
            .list_directory(&FilePath::from("."), &["*.go".to_string()])
            .unwrap();
        let names: Vec<_> = files.iter().filter_map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["a.go", "b.go"]);
    }

    #[test]
    fn test_list_directory_absolute_path() {
        let (temp_dir, pal) = setup_test_dir();
        fs::write(temp_dir.path().join("a.go"), "").unwrap();
        let dir = FilePath::from(temp_dir.path());

        let files = pal.list_directory(&dir, &["*.go".to_string()]).unwrap();
        assert_eq!(files, vec![dir.join("a.go")]);
    }

    #[test]
    fn test_list_directory_not_found() {
        let (_temp_dir, pal) = setup_test_dir();
        let result = pal.list_directory(&FilePath::from("missing"), &["*.go".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_glob_pattern() {
        let (_temp_dir, pal) = setup_test_dir();
        let result = pal.list_directory(&FilePath::from("."), &["[invalid".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_file() {
        let (temp_dir, pal) = setup_test_dir();
        fs::write(temp_dir.path().join("doc.go"), "// hello\npackage doc\n").unwrap();

        let content = pal.read_file_to_string(&FilePath::from("doc.go")).unwrap();
        assert_eq!(content, "// hello\npackage doc\n");
    }

    #[test]
    fn test_read_file_not_found() {
        let (_temp_dir, pal) = setup_test_dir();
        let error = pal.read_file(&FilePath::from("missing.go")).err().unwrap();
        assert!(matches!(error.kind(), ErrorKind::FileError { .. }));
    }

    #[test]
    fn test_working_directory() {
        let (temp_dir, pal) = setup_test_dir();
        assert_eq!(
            pal.working_directory().unwrap(),
            FilePath::from(temp_dir.path())
        );
    }

    #[derive(Debug)]
    struct EchoService;

    impl HttpService for EchoService {
        fn handle_request(&self, request: HttpRequest) -> CommentscanResult<HttpResponse> {
            Ok(HttpResponse::ok()
                .with_content_type("text/plain")
                .with_body(format!("{} {}", request.method(), request.path())))
        }
    }

    #[test]
    fn test_http_server_round_trip() {
        let (_temp_dir, pal) = setup_test_dir();
        let handle = pal
            .start_http_server(Box::new(EchoService), HttpServerConfig::default())
            .unwrap();
        assert_ne!(handle.port(), 0);

        let mut stream = TcpStream::connect(handle.address("127.0.0.1")).unwrap();
        stream
            .write_all(b"GET /?package=fmt HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("Server: commentscan"));
        assert!(response.ends_with("GET /?package=fmt"));

        handle.shutdown();
        handle.wait();
    }
}
