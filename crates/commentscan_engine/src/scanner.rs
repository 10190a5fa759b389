/* 📖 # How does a package scan proceed?

A scan validates the request, resolves the package once and then extracts each
resolved file in order, appending matches per token. Two outcomes end the scan
early: a command package (`package main`) is reported with no matches and no file
is opened, and the first binary-only marker turns the whole result into
`BinaryOnly` without reading the remaining files.

Nothing is cached between scans; every call re-resolves and re-parses, and each
call owns its parser and accumulator so concurrent scans never share state.
*/

use std::sync::Arc;

use tracing::{debug, info, instrument};

use commentscan_base::{CommentscanResult, FilePath, PalHandle};

use crate::comment_parser::CommentParser;
use crate::extractor::{FileScan, extract_file};
use crate::model::{ScanResult, TokenMatches};
use crate::request::ScanRequest;
use crate::resolver::PackageResolver;

/// Scan the comments of one package for the request's tokens.
#[instrument(skip(pal, resolver, working_dir), fields(package = %request.package_name))]
pub fn scan_package(
    pal: &PalHandle,
    resolver: &dyn PackageResolver,
    working_dir: &FilePath,
    request: &ScanRequest,
) -> CommentscanResult<ScanResult> {
    request.validate()?;

    let package = resolver.resolve(&request.package_name, working_dir)?;
    if package.is_command {
        debug!(name = %package.name, "package is a command, nothing to scan");
        return Ok(ScanResult::with_matches(package.name, TokenMatches::new()));
    }

    let mut parser = CommentParser::new()?;
    let mut accumulated = TokenMatches::new();
    for file in &package.go_files {
        match extract_file(pal, &mut parser, file, &request.tokens)? {
            FileScan::BinaryOnly => {
                info!(name = %package.name, file = %file, "binary-only package");
                return Ok(ScanResult::binary_only(package.name));
            }
            FileScan::Matches(matches) => {
                for (token, mut found) in matches {
                    accumulated.entry(token).or_default().append(&mut found);
                }
            }
        }
    }

    debug!(
        name = %package.name,
        files = package.go_files.len(),
        matched_tokens = accumulated.len(),
        "scan finished"
    );
    Ok(ScanResult::with_matches(package.name, accumulated))
}

/// Scans packages with a fixed PAL and resolver.
#[derive(Debug, Clone)]
pub struct CommentScanner {
    pal: PalHandle,
    resolver: Arc<dyn PackageResolver>,
}

impl CommentScanner {
    pub fn new(pal: PalHandle, resolver: Arc<dyn PackageResolver>) -> Self {
        Self { pal, resolver }
    }

    /// Scan relative to the PAL's working directory.
    pub fn scan(&self, request: &ScanRequest) -> CommentscanResult<ScanResult> {
        let working_dir = self.pal.working_directory()?;
        scan_package(&self.pal, self.resolver.as_ref(), &working_dir, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentscan_base::MockPal;
    use commentscan_base::error::{CommentscanError, ErrorKind, SearchOrigin, SearchedLocation};
    use crate::resolver::ResolvedPackage;
    use parking_lot::Mutex;

    /// Serves a fixed package and counts lookups.
    #[derive(Debug)]
    struct FixedResolver {
        package: ResolvedPackage,
        calls: Mutex<Vec<String>>,
    }

    impl FixedResolver {
        fn new(name: &str, files: &[&str]) -> Self {
            Self {
                package: ResolvedPackage {
                    name: name.to_string(),
                    import_path: name.to_string(),
                    dir: FilePath::from("/src/pkg"),
                    go_files: files.iter().map(|f| FilePath::from(*f)).collect(),
                    cgo_files: Vec::new(),
                    ignored_files: Vec::new(),
                    is_command: name == "main",
                },
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl PackageResolver for FixedResolver {
        fn resolve(
            &self,
            identifier: &str,
            _working_dir: &FilePath,
        ) -> CommentscanResult<ResolvedPackage> {
            self.calls.lock().push(identifier.to_string());
            Ok(self.package.clone())
        }
    }

    #[derive(Debug)]
    struct MissingResolver;

    impl PackageResolver for MissingResolver {
        fn resolve(
            &self,
            identifier: &str,
            _working_dir: &FilePath,
        ) -> CommentscanResult<ResolvedPackage> {
            Err(Box::new(CommentscanError::new(ErrorKind::PackageNotFound {
                import_path: identifier.to_string(),
                searched: vec![SearchedLocation {
                    directory: "/go/src/nowhere".into(),
                    origin: SearchOrigin::GoRoot,
                }],
            })))
        }
    }

    fn request(tokens: &[&str]) -> ScanRequest {
        ScanRequest::new("pkg", tokens.iter().map(|t| t.to_string()).collect())
    }

    fn scan(
        mock: &MockPal,
        resolver: &dyn PackageResolver,
        request: &ScanRequest,
    ) -> CommentscanResult<ScanResult> {
        scan_package(
            &PalHandle::new(mock.clone()),
            resolver,
            &FilePath::from("/work"),
            request,
        )
    }

    #[test]
    fn test_matches_follow_file_order() {
        let mock = MockPal::new();
        mock.add_file("/src/pkg/a.go", "// TODO a1\npackage pkg\n\n// TODO a2\nvar x int\n");
        mock.add_file("/src/pkg/b.go", "package pkg\n\n// TODO b1 and FIXME\nvar y int\n");
        let resolver = FixedResolver::new("pkg", &["/src/pkg/a.go", "/src/pkg/b.go"]);

        let result = scan(&mock, &resolver, &request(&["TODO", "FIXME", "NOPE"])).unwrap();
        assert_eq!(result.package_name, "pkg");
        assert!(!result.binary_only);
        let todo: Vec<(String, usize)> = result
            .matches_for("TODO")
            .iter()
            .map(|m| (m.file_name.clone(), m.line_number))
            .collect();
        assert_eq!(
            todo,
            vec![
                ("/src/pkg/a.go".to_string(), 1),
                ("/src/pkg/a.go".to_string(), 4),
                ("/src/pkg/b.go".to_string(), 3),
            ]
        );
        assert_eq!(result.matches_for("FIXME").len(), 1);
        let matches = result.matches.as_ref().unwrap();
        assert!(!matches.contains_key("NOPE"));
    }

    #[test]
    fn test_file_with_byte_order_mark() {
        let mock = MockPal::new();
        mock.add_file("/src/pkg/a.go", "\u{feff}// TODO: bom file\npackage pkg\n");
        let resolver = FixedResolver::new("pkg", &["/src/pkg/a.go"]);

        let result = scan(&mock, &resolver, &request(&["TODO"])).unwrap();
        let todo = result.matches_for("TODO");
        assert_eq!(todo.len(), 1);
        assert_eq!(todo[0].line_number, 1);
        assert_eq!(todo[0].line_content, "TODO: bom file\n");
    }

    #[test]
    fn test_no_matches_gives_empty_map() {
        let mock = MockPal::new();
        mock.add_file("/src/pkg/a.go", "// Package pkg.\npackage pkg\n");
        let resolver = FixedResolver::new("pkg", &["/src/pkg/a.go"]);

        let result = scan(&mock, &resolver, &request(&["EXAMPLE"])).unwrap();
        assert!(!result.binary_only);
        assert_eq!(result.matches, Some(TokenMatches::new()));
    }

    #[test]
    fn test_binary_only_stops_the_scan() {
        let mock = MockPal::new();
        mock.add_file("/src/pkg/a.go", "// TODO first\npackage pkg\n");
        mock.add_file("/src/pkg/b.go", "//go:binary-only-package\n\npackage pkg\n");
        mock.add_file("/src/pkg/c.go", "// TODO never read\npackage pkg\n");
        let resolver = FixedResolver::new(
            "pkg",
            &["/src/pkg/a.go", "/src/pkg/b.go", "/src/pkg/c.go"],
        );

        let result = scan(&mock, &resolver, &request(&["TODO"])).unwrap();
        assert_eq!(result, ScanResult::binary_only("pkg"));
        assert_eq!(
            mock.read_files(),
            vec![FilePath::from("/src/pkg/a.go"), FilePath::from("/src/pkg/b.go")]
        );
    }

    #[test]
    fn test_command_package_reads_no_files() {
        let mock = MockPal::new();
        mock.add_file("/src/cmd/main.go", "// TODO\npackage main\n");
        let resolver = FixedResolver::new("main", &["/src/cmd/main.go"]);

        let result = scan(&mock, &resolver, &request(&["TODO"])).unwrap();
        assert_eq!(
            result,
            ScanResult::with_matches("main", TokenMatches::new())
        );
        assert!(mock.accesses().is_empty());
    }

    #[test]
    fn test_validation_happens_before_resolution() {
        let mock = MockPal::new();
        let resolver = FixedResolver::new("pkg", &[]);

        let error = scan(&mock, &resolver, &request(&[])).unwrap_err();
        assert!(error.is_client_error());
        let error = scan(&mock, &resolver, &ScanRequest::new("", vec!["TODO".to_string()]))
            .unwrap_err();
        assert!(error.is_client_error());

        assert!(resolver.calls.lock().is_empty());
        assert!(mock.accesses().is_empty());
    }

    #[test]
    fn test_resolution_errors_propagate() {
        let mock = MockPal::new();
        let error = scan(&mock, &MissingResolver, &request(&["TODO"])).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::PackageNotFound { .. }));
        assert!(!error.is_client_error());
    }

    #[test]
    fn test_syntax_error_aborts_the_scan() {
        let mock = MockPal::new();
        mock.add_file("/src/pkg/a.go", "package pkg\n\nfunc broken( {\n");
        let resolver = FixedResolver::new("pkg", &["/src/pkg/a.go"]);

        let error = scan(&mock, &resolver, &request(&["TODO"])).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::Syntax { .. }));
    }

    #[test]
    fn test_duplicate_tokens_repeat_matches() {
        let mock = MockPal::new();
        mock.add_file("/src/pkg/a.go", "// TODO\npackage pkg\n");
        let resolver = FixedResolver::new("pkg", &["/src/pkg/a.go"]);

        let result = scan(&mock, &resolver, &request(&["TODO", "TODO"])).unwrap();
        assert_eq!(result.matches_for("TODO").len(), 2);
    }

    #[test]
    fn test_comment_scanner_uses_pal_working_directory() {
        let mock = MockPal::with_working_directory("/home/gopher");
        mock.add_file("/src/pkg/a.go", "// TODO\npackage pkg\n");
        let resolver = Arc::new(FixedResolver::new("pkg", &["/src/pkg/a.go"]));
        let scanner = CommentScanner::new(PalHandle::new(mock), resolver.clone());

        let result = scanner.scan(&request(&["TODO"])).unwrap();
        assert_eq!(result.matches_for("TODO").len(), 1);
        assert_eq!(*resolver.calls.lock(), vec!["pkg".to_string()]);
    }
}
