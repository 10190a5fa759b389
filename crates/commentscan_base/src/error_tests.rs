/* 📖 # Why use a separate file for these error tests?

Some of these tests look at span traces, which carry source locations.
Keeping them out of error.rs means edits there do not shift the recorded positions.
*/

#[cfg(test)]
mod tests {
    use crate::error::{ErrorKind, NoGoFilesReason, SearchOrigin, SearchedLocation};
    use crate::{CommentscanError, CommentscanResult, ResultExt};
    use expect_test::expect;
    use std::error::Error;
    use std::io;
    use std::path::PathBuf;
    use tracing::span;
    use tracing_error::ErrorLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    /// Set up tracing with ErrorLayer for tests.
    /// Uses `try_init()` to handle multiple tests running concurrently.
    fn setup_tracing_subscriber() {
        let _ = tracing_subscriber::registry()
            .with(ErrorLayer::default())
            .try_init();
    }

    fn not_found_error() -> CommentscanError {
        CommentscanError::new(ErrorKind::PackageNotFound {
            import_path: "example.com/missing".to_string(),
            searched: vec![
                SearchedLocation {
                    directory: PathBuf::from("/usr/local/go/src/example.com/missing"),
                    origin: SearchOrigin::GoRoot,
                },
                SearchedLocation {
                    directory: PathBuf::from("/home/gopher/go/src/example.com/missing"),
                    origin: SearchOrigin::GoPath,
                },
            ],
        })
    }

    #[test]
    fn test_error_from_file_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let path = PathBuf::from("test.go");
        let error = CommentscanError::new(ErrorKind::FileError {
            path: path.clone(),
            source: io_err,
        });

        match error.kind() {
            ErrorKind::FileError { path: p, .. } => assert_eq!(p, &path),
            _ => panic!("Expected FileError variant"),
        }
    }

    #[test]
    fn test_error_context_attachment() {
        let error = CommentscanError::message("original error")
            .context("first context")
            .with_context(|| "second context".to_string());

        assert_eq!(
            error.to_string(),
            "first context: second context: original error"
        );
    }

    #[test]
    fn test_error_display_with_multiple_contexts() {
        let error = CommentscanError::message("root error")
            .context("first")
            .context("second");
        assert_eq!(error.to_string(), "first: second: root error");
    }

    #[test]
    fn test_package_not_found_lists_search_locations() {
        expect![[r#"
            cannot find package "example.com/missing" in any of:
            	/usr/local/go/src/example.com/missing (from $GOROOT)
            	/home/gopher/go/src/example.com/missing (from $GOPATH)"#]]
        .assert_eq(&not_found_error().to_string());
    }

    #[test]
    fn test_package_not_found_local_directory() {
        let error = CommentscanError::new(ErrorKind::PackageNotFound {
            import_path: "./missing".to_string(),
            searched: vec![SearchedLocation {
                directory: PathBuf::from("/work/missing"),
                origin: SearchOrigin::WorkingDirectory,
            }],
        });
        assert_eq!(
            error.to_string(),
            "cannot find package \"./missing\" in:\n\t/work/missing"
        );
    }

    #[test]
    fn test_no_go_files_messages() {
        let message = |reason| {
            CommentscanError::new(ErrorKind::NoGoFiles {
                directory: PathBuf::from("/src/pkg"),
                reason,
            })
            .to_string()
        };
        assert_eq!(
            message(NoGoFilesReason::Empty),
            "no buildable Go source files in /src/pkg"
        );
        assert_eq!(
            message(NoGoFilesReason::OnlyTests),
            "no non-test Go files in /src/pkg"
        );
        assert_eq!(
            message(NoGoFilesReason::ExcludedByConstraints),
            "build constraints exclude all Go files in /src/pkg"
        );
    }

    #[test]
    fn test_syntax_error_display() {
        let error = CommentscanError::new(ErrorKind::Syntax {
            path: PathBuf::from("/src/pkg/broken.go"),
            line: 3,
            column: 7,
            message: "syntax error".to_string(),
        });
        assert_eq!(error.to_string(), "/src/pkg/broken.go:3:7: syntax error");
    }

    #[test]
    fn test_only_validation_is_a_client_error() {
        assert!(CommentscanError::validation("bad input").is_client_error());
        assert!(!CommentscanError::message("boom").is_client_error());
        assert!(!not_found_error().is_client_error());
    }

    #[test]
    fn test_error_source_file_error() {
        let error = CommentscanError::new(ErrorKind::FileError {
            path: PathBuf::from("test.go"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        });
        assert_eq!(
            error.source().map(|e| e.to_string()),
            Some("access denied".to_string())
        );
        assert!(CommentscanError::message("no source").source().is_none());
    }

    #[test]
    fn test_result_ext_chaining() {
        let result: CommentscanResult<i32> = Err(Box::new(CommentscanError::message("root")));
        let err = result
            .context("step 1")
            .with_context(|| "step 2".to_string())
            .unwrap_err();
        assert_eq!(err.to_string(), "step 1: step 2: root");
    }

    #[test]
    fn test_result_ext_success_untouched() {
        let result: CommentscanResult<i32> = Ok(42);
        assert_eq!(result.context("unused").unwrap(), 42);
    }

    #[test]
    fn test_err_macro() {
        let error: Box<CommentscanError> = crate::err!("code {}", 7);
        assert_eq!(error.to_string(), "code 7");
    }

    #[test]
    fn test_debug_tree_without_span() {
        let error = CommentscanError::message("lookup failed")
            .context("Resolving example.com/lib")
            .context("Scanning example.com/lib");

        expect![[r#"
            lookup failed
            ├─ Resolving example.com/lib
            └─ Scanning example.com/lib
        "#]]
        .assert_eq(&format!("{:?}", error));
    }

    #[test]
    fn test_debug_includes_span_trace() {
        setup_tracing_subscriber();

        let operation_span = span!(tracing::Level::INFO, "resolve_package", attempt = 3);
        let _guard = operation_span.enter();

        let error = CommentscanError::message("lookup failed");
        let debug = format!("{:?}", error);

        assert!(debug.starts_with("lookup failed\n"));
        assert!(debug.contains("Trace:"));
        assert!(debug.contains("resolve_package"));
        assert!(debug.contains("attempt=3"));
    }
}
