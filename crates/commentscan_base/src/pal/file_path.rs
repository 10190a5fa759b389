use std::path::{Component, Path, PathBuf};

/* 📖 # Why does FilePath wrap a PathBuf?

Packages live wherever GOROOT and GOPATH point, usually far outside the working
directory, so paths handed to the PAL are absolute or relative to the working
directory. The wrapper keeps the PAL signatures explicit and gives one place for
the lexical cleanup applied to user-supplied package paths.
*/

/// Path of a file or directory as seen by the PAL.
///
/// Relative paths are resolved against the PAL's working directory.
///
/// # Examples
///
/// ```
/// use commentscan_base::FilePath;
///
/// let dir = FilePath::from("/usr/local/go/src");
/// assert_eq!(dir.join("fmt").to_string(), "/usr/local/go/src/fmt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(PathBuf);

impl FilePath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    pub fn is_absolute(&self) -> bool {
        self.0.is_absolute()
    }

    /// Appends `segment`. An absolute segment replaces the path, as with `Path::join`.
    pub fn join(&self, segment: impl AsRef<Path>) -> FilePath {
        FilePath(self.0.join(segment))
    }

    /// Final component as UTF-8, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|name| name.to_str())
    }

    pub fn parent(&self) -> Option<FilePath> {
        self.0.parent().map(|parent| FilePath(parent.to_path_buf()))
    }

    /// Lexically removes `.` components and folds `..` into the preceding component.
    ///
    /// No filesystem access happens, so symlinks are not consulted.
    pub fn clean(&self) -> FilePath {
        let mut cleaned = PathBuf::new();
        for component in self.0.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    let can_pop = matches!(
                        cleaned.components().next_back(),
                        Some(Component::Normal(_))
                    );
                    if can_pop {
                        cleaned.pop();
                    } else if !cleaned.has_root() {
                        cleaned.push("..");
                    }
                }
                other => cleaned.push(other.as_os_str()),
            }
        }
        if cleaned.as_os_str().is_empty() {
            cleaned.push(".");
        }
        FilePath(cleaned)
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(PathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(PathBuf::from(s))
    }
}

impl From<PathBuf> for FilePath {
    fn from(p: PathBuf) -> Self {
        Self(p)
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self(p.to_path_buf())
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for FilePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}
