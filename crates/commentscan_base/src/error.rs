use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Better control over error handling
- No dependencies to compile and integrate
- More transparency into error handling logic
- The HTTP layer needs to tell client errors from internal errors by matching on the kind
 */

/// Where a package lookup looked for a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrigin {
    GoRoot,
    GoPath,
    WorkingDirectory,
}

/// A directory that was tried while resolving a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchedLocation {
    pub directory: PathBuf,
    pub origin: SearchOrigin,
}

impl fmt::Display for SearchedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            SearchOrigin::GoRoot => write!(f, "{} (from $GOROOT)", self.directory.display()),
            SearchOrigin::GoPath => write!(f, "{} (from $GOPATH)", self.directory.display()),
            SearchOrigin::WorkingDirectory => write!(f, "{}", self.directory.display()),
        }
    }
}

/// Why a package directory produced no source files to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoGoFilesReason {
    /// The directory holds no `.go` files at all
    Empty,
    /// Only `_test.go` files were found
    OnlyTests,
    /// Build constraints excluded every candidate
    ExcludedByConstraints,
}

/// Error variants that can occur in commentscan operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The caller supplied an invalid request
    Validation { message: String },

    /// No directory for the package exists on any search path
    PackageNotFound {
        import_path: String,
        searched: Vec<SearchedLocation>,
    },

    /// The package directory exists but has nothing to scan
    NoGoFiles {
        directory: PathBuf,
        reason: NoGoFilesReason,
    },

    /// Two files in one directory declare different packages
    MultiplePackages {
        directory: PathBuf,
        first_package: String,
        first_file: String,
        second_package: String,
        second_file: String,
    },

    /// A `//go:build` or `// +build` line could not be evaluated
    InvalidBuildConstraint { path: PathBuf, message: String },

    /// A source file failed to parse
    Syntax {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Validation { message } => write!(f, "{}", message),
            ErrorKind::PackageNotFound {
                import_path,
                searched,
            } => {
                let only_local = searched
                    .iter()
                    .all(|location| location.origin == SearchOrigin::WorkingDirectory);
                if only_local {
                    write!(f, "cannot find package \"{}\" in:", import_path)?;
                } else {
                    write!(f, "cannot find package \"{}\" in any of:", import_path)?;
                }
                for location in searched {
                    write!(f, "\n\t{}", location)?;
                }
                Ok(())
            }
            ErrorKind::NoGoFiles { directory, reason } => match reason {
                NoGoFilesReason::Empty => {
                    write!(f, "no buildable Go source files in {}", directory.display())
                }
                NoGoFilesReason::OnlyTests => {
                    write!(f, "no non-test Go files in {}", directory.display())
                }
                NoGoFilesReason::ExcludedByConstraints => write!(
                    f,
                    "build constraints exclude all Go files in {}",
                    directory.display()
                ),
            },
            ErrorKind::MultiplePackages {
                directory,
                first_package,
                first_file,
                second_package,
                second_file,
            } => write!(
                f,
                "found packages {} ({}) and {} ({}) in {}",
                first_package,
                first_file,
                second_package,
                second_file,
                directory.display()
            ),
            ErrorKind::InvalidBuildConstraint { path, message } => {
                write!(f, "{}: {}", path.display(), message)
            }
            ErrorKind::Syntax {
                path,
                line,
                column,
                message,
            } => write!(f, "{}:{}:{}: {}", path.display(), line, column, message),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why separate ErrorKind and CommentscanError?
ErrorKind carries the structural variants (paths, line numbers, searched locations).
CommentscanError wraps it with context strings and the span trace active when the
error was created. Callers match on the kind and attach context while
propagating.
*/

/// Error type wrapping ErrorKind with context and span trace.
pub struct CommentscanError {
    kind: ErrorKind,
    context: Vec<String>,
    span_trace: SpanTrace,
}

impl CommentscanError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a catch-all error from a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates a validation error. Its message is always safe to show to clients.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation {
            message: message.into(),
        })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// True when the caller is at fault and the message may be shown as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation { .. })
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, context) in self.context.iter().enumerate() {
            let branch = if index + 1 == self.context.len() {
                "└─"
            } else {
                "├─"
            };
            writeln!(f, "{} {}", branch, context)?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for CommentscanError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for CommentscanError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for CommentscanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for context in &self.context {
            write!(f, "{}: ", context)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for CommentscanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        self.fmt_tree(f)?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/* 📖 # Why use Box<CommentscanError> in the result type?

Boxing the error keeps the result small, which matters since the span trace and
context vector make the error itself fairly large.
*/

/// Standard result type for commentscan operations.
pub type CommentscanResult<T> = std::result::Result<T, Box<CommentscanError>>;

/// Extension trait for attaching context to Results during propagation.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> CommentscanResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> CommentscanResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for CommentscanResult<T> {
    fn context(self, context: impl Into<String>) -> CommentscanResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> CommentscanResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Builds a boxed message error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        ::std::boxed::Box::new($crate::error::CommentscanError::message(format!($($arg)*)))
    };
}
