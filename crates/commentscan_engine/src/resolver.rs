/* 📖 # How is a package identifier turned into files?

Identifiers come in two shapes. Local ones (`.`, `./cmd/tool`, `../lib`, or an
absolute directory) name a directory relative to the working directory. Everything
else is an import path, looked up as `$GOROOT/src/<path>` and then
`<entry>/src/<path>` for each GOPATH entry; the first existing directory wins.

Inside the directory only the files the Go toolchain would compile for the current
BuildContext are kept: no tests, no files excluded by name suffix or build
constraints, and no cgo files. Every failure names the directories that were tried
so a misconfigured GOROOT or GOPATH is easy to spot.
*/

use std::fmt::Debug;
use std::path::Path;

use relative_path::RelativePathBuf;
use tracing::{debug, instrument, trace};

use commentscan_base::error::{
    CommentscanError, ErrorKind, NoGoFilesReason, SearchOrigin, SearchedLocation,
};
use commentscan_base::{CommentscanResult, FilePath, PalHandle};

use crate::build_context::BuildContext;
use crate::header::parse_file_header;

/// A package located on disk, with the files that make it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    /// Name from the package clause
    pub name: String,
    /// The identifier the package was resolved from
    pub import_path: String,
    pub dir: FilePath,
    /// Non-test, non-cgo files selected for the build context, sorted by name
    pub go_files: Vec<FilePath>,
    pub cgo_files: Vec<FilePath>,
    pub ignored_files: Vec<FilePath>,
    /// `package main`
    pub is_command: bool,
}

/// Resolves package identifiers.
pub trait PackageResolver: Debug + Send + Sync {
    fn resolve(
        &self,
        identifier: &str,
        working_dir: &FilePath,
    ) -> CommentscanResult<ResolvedPackage>;
}

/// A slash separated Go import path such as `github.com/user/repo/pkg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath(RelativePathBuf);

impl ImportPath {
    pub fn parse(identifier: &str) -> CommentscanResult<Self> {
        let invalid = |reason: &str| {
            Box::new(CommentscanError::validation(format!(
                "invalid import path \"{}\": {}",
                identifier, reason
            )))
        };
        if identifier.is_empty() {
            return Err(invalid("empty path"));
        }
        if identifier.contains('\\') {
            return Err(invalid("backslash in path"));
        }
        if identifier.starts_with('/') {
            return Err(invalid("leading slash"));
        }
        if identifier.ends_with('/') {
            return Err(invalid("trailing slash"));
        }
        for element in identifier.split('/') {
            match element {
                "" => return Err(invalid("empty path element")),
                "." | ".." => return Err(invalid("relative path element")),
                _ => {}
            }
        }
        Ok(Self(RelativePathBuf::from(identifier)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Directory of this import path below `<root>/src`.
    pub fn source_dir(&self, root: &Path) -> FilePath {
        FilePath::from(self.0.to_path(root.join("src")))
    }
}

/// Whether `identifier` names a directory rather than an import path.
pub fn is_local_identifier(identifier: &str) -> bool {
    identifier == "."
        || identifier == ".."
        || identifier.starts_with("./")
        || identifier.starts_with("../")
        || Path::new(identifier).is_absolute()
}

/// Resolves packages the way GOPATH mode `go build` does.
#[derive(Debug, Clone)]
pub struct GoPathResolver {
    pal: PalHandle,
    context: BuildContext,
}

impl GoPathResolver {
    pub fn new(pal: PalHandle, context: BuildContext) -> Self {
        Self { pal, context }
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    fn locate(&self, identifier: &str, working_dir: &FilePath) -> CommentscanResult<FilePath> {
        let candidates = if is_local_identifier(identifier) {
            vec![(
                working_dir.join(identifier).clean(),
                SearchOrigin::WorkingDirectory,
            )]
        } else {
            let import_path = ImportPath::parse(identifier)?;
            let mut candidates = vec![(
                import_path.source_dir(&self.context.goroot),
                SearchOrigin::GoRoot,
            )];
            for entry in &self.context.gopath {
                candidates.push((import_path.source_dir(entry), SearchOrigin::GoPath));
            }
            candidates
        };

        let mut searched = Vec::with_capacity(candidates.len());
        for (directory, origin) in candidates {
            searched.push(SearchedLocation {
                directory: directory.as_path().to_path_buf(),
                origin,
            });
            if self.pal.is_directory(&directory)? {
                return Ok(directory);
            }
        }
        Err(Box::new(CommentscanError::new(ErrorKind::PackageNotFound {
            import_path: identifier.to_string(),
            searched,
        })))
    }

    fn load_package(&self, identifier: &str, dir: FilePath) -> CommentscanResult<ResolvedPackage> {
        let files = self.pal.list_directory(&dir, &["*.go".to_string()])?;

        let mut package: Option<(String, FilePath)> = None;
        let mut go_files = Vec::new();
        let mut cgo_files = Vec::new();
        let mut ignored_files = Vec::new();
        let mut saw_tests = false;
        let mut saw_excluded = false;

        for file in files {
            let name = file.file_name().unwrap_or_default().to_string();
            if name.starts_with('_') || name.starts_with('.') {
                trace!(file = %file, "ignoring hidden file");
                ignored_files.push(file);
                continue;
            }
            if name.ends_with("_test.go") {
                saw_tests = true;
                continue;
            }
            if !self.context.matches_file_name(&name) {
                trace!(file = %file, "excluded by file name");
                saw_excluded = true;
                ignored_files.push(file);
                continue;
            }

            let source = self.pal.read_file_to_string(&file)?;
            let header = parse_file_header(&file, &source)?;
            if !header.should_build(&self.context, &file)? {
                trace!(file = %file, "excluded by build constraints");
                saw_excluded = true;
                ignored_files.push(file);
                continue;
            }
            if header.package_name == "documentation" {
                ignored_files.push(file);
                continue;
            }

            if let Some((first_package, first_file)) = &package {
                if *first_package != header.package_name {
                    return Err(Box::new(CommentscanError::new(
                        ErrorKind::MultiplePackages {
                            directory: dir.as_path().to_path_buf(),
                            first_package: first_package.clone(),
                            first_file: first_file.file_name().unwrap_or_default().to_string(),
                            second_package: header.package_name,
                            second_file: name,
                        },
                    )));
                }
            }
            if package.is_none() {
                package = Some((header.package_name.clone(), file.clone()));
            }

            if header.is_cgo() {
                if self.context.cgo_enabled {
                    cgo_files.push(file);
                } else {
                    trace!(file = %file, "cgo disabled");
                    saw_excluded = true;
                    ignored_files.push(file);
                }
                continue;
            }
            go_files.push(file);
        }

        let Some((name, _)) = package.filter(|_| !go_files.is_empty() || !cgo_files.is_empty())
        else {
            let reason = if saw_excluded {
                NoGoFilesReason::ExcludedByConstraints
            } else if saw_tests {
                NoGoFilesReason::OnlyTests
            } else {
                NoGoFilesReason::Empty
            };
            return Err(Box::new(CommentscanError::new(ErrorKind::NoGoFiles {
                directory: dir.into_path_buf(),
                reason,
            })));
        };

        Ok(ResolvedPackage {
            is_command: name == "main",
            name,
            import_path: identifier.to_string(),
            dir,
            go_files,
            cgo_files,
            ignored_files,
        })
    }
}

impl PackageResolver for GoPathResolver {
    #[instrument(skip(self, working_dir))]
    fn resolve(
        &self,
        identifier: &str,
        working_dir: &FilePath,
    ) -> CommentscanResult<ResolvedPackage> {
        let dir = self.locate(identifier, working_dir)?;
        debug!(directory = %dir, "found package directory");
        let package = self.load_package(identifier, dir)?;
        debug!(
            name = %package.name,
            files = package.go_files.len(),
            command = package.is_command,
            "resolved package"
        );
        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentscan_base::MockPal;
    use commentscan_base::pal::mock::PalAccess;
    use expect_test::expect;
    use std::collections::HashMap;

    fn context() -> BuildContext {
        let vars: HashMap<&str, &str> = [
            ("GOROOT", "/go"),
            ("GOPATH", "/gopath1:/gopath2"),
            ("GOOS", "linux"),
            ("GOARCH", "amd64"),
        ]
        .into();
        BuildContext::from_env_with(|key| vars.get(key).map(|v| v.to_string()))
    }

    fn resolver(mock: &MockPal) -> GoPathResolver {
        GoPathResolver::new(PalHandle::new(mock.clone()), context())
    }

    fn names(files: &[FilePath]) -> Vec<&str> {
        files.iter().filter_map(|f| f.file_name()).collect()
    }

    #[test]
    fn test_selects_buildable_files() {
        let mock = MockPal::new();
        mock.add_file("/go/src/fmt/doc.go", "// Package fmt.\npackage fmt\n");
        mock.add_file("/go/src/fmt/print.go", "package fmt\n\nimport \"os\"\n");
        mock.add_file("/go/src/fmt/print_windows.go", "package fmt\n");
        mock.add_file("/go/src/fmt/print_test.go", "package fmt_test\n");
        mock.add_file("/go/src/fmt/_scratch.go", "not go at all");
        mock.add_file("/go/src/fmt/gen.go", "//go:build ignore\n\npackage main\n");
        mock.add_file("/go/src/fmt/native.go", "package fmt\n\nimport \"C\"\n");
        mock.add_file("/go/src/fmt/notes.go", "package documentation\n");
        mock.add_file("/go/src/fmt/README.md", "# fmt");

        let package = resolver(&mock)
            .resolve("fmt", &FilePath::from("/work"))
            .unwrap();
        assert_eq!(package.name, "fmt");
        assert_eq!(package.import_path, "fmt");
        assert_eq!(package.dir, FilePath::from("/go/src/fmt"));
        assert!(!package.is_command);
        assert_eq!(names(&package.go_files), vec!["doc.go", "print.go"]);
        assert_eq!(names(&package.cgo_files), vec!["native.go"]);
        assert_eq!(
            names(&package.ignored_files),
            vec!["_scratch.go", "gen.go", "notes.go", "print_windows.go"]
        );
    }

    #[test]
    fn test_cgo_files_ignored_without_cgo() {
        let mock = MockPal::new();
        mock.add_file("/go/src/db/db.go", "package db\n");
        mock.add_file("/go/src/db/native.go", "package db\n\nimport \"C\"\n");
        let mut resolver = resolver(&mock);
        resolver.context.cgo_enabled = false;

        let package = resolver.resolve("db", &FilePath::from("/work")).unwrap();
        assert_eq!(names(&package.go_files), vec!["db.go"]);
        assert!(package.cgo_files.is_empty());
        assert_eq!(names(&package.ignored_files), vec!["native.go"]);
    }

    #[test]
    fn test_goroot_before_gopath() {
        let mock = MockPal::new();
        mock.add_file("/go/src/errors/errors.go", "package errors\n");
        mock.add_file("/gopath1/src/errors/errors.go", "package shadow\n");

        let package = resolver(&mock)
            .resolve("errors", &FilePath::from("/work"))
            .unwrap();
        assert_eq!(package.name, "errors");
    }

    #[test]
    fn test_gopath_entries_in_order() {
        let mock = MockPal::new();
        mock.add_file("/gopath2/src/github.com/acme/lib/lib.go", "package lib\n");

        let package = resolver(&mock)
            .resolve("github.com/acme/lib", &FilePath::from("/work"))
            .unwrap();
        assert_eq!(
            package.dir,
            FilePath::from("/gopath2/src/github.com/acme/lib")
        );
        assert_eq!(
            mock.accesses()[..3],
            [
                PalAccess::IsDirectory(FilePath::from("/go/src/github.com/acme/lib")),
                PalAccess::IsDirectory(FilePath::from("/gopath1/src/github.com/acme/lib")),
                PalAccess::IsDirectory(FilePath::from("/gopath2/src/github.com/acme/lib")),
            ]
        );
    }

    #[test]
    fn test_package_not_found_lists_locations() {
        let mock = MockPal::new();
        let error = resolver(&mock)
            .resolve("voodoo1231", &FilePath::from("/work"))
            .unwrap_err();
        expect![[r#"
            cannot find package "voodoo1231" in any of:
            	/go/src/voodoo1231 (from $GOROOT)
            	/gopath1/src/voodoo1231 (from $GOPATH)
            	/gopath2/src/voodoo1231 (from $GOPATH)"#]]
        .assert_eq(&error.to_string());
        assert!(!error.is_client_error());
    }

    #[test]
    fn test_local_identifiers() {
        let mock = MockPal::with_working_directory("/home/gopher/project");
        mock.add_file("/home/gopher/project/cmd/tool/main.go", "package main\n");
        mock.add_file("/home/gopher/lib/lib.go", "package lib\n");
        let resolver = resolver(&mock);
        let working_dir = FilePath::from("/home/gopher/project");

        let tool = resolver.resolve("./cmd/tool", &working_dir).unwrap();
        assert!(tool.is_command);
        assert_eq!(tool.dir, FilePath::from("/home/gopher/project/cmd/tool"));

        let lib = resolver.resolve("../lib", &working_dir).unwrap();
        assert_eq!(lib.name, "lib");

        let absolute = resolver.resolve("/home/gopher/lib", &working_dir).unwrap();
        assert_eq!(absolute.dir, FilePath::from("/home/gopher/lib"));

        let error = resolver.resolve("./missing", &working_dir).unwrap_err();
        expect![[r#"
            cannot find package "./missing" in:
            	/home/gopher/project/missing"#]]
        .assert_eq(&error.to_string());
    }

    #[test]
    fn test_invalid_import_paths_are_rejected_before_lookup() {
        let mock = MockPal::new();
        let resolver = resolver(&mock);
        for identifier in ["a//b", "a/./b", "a/../b", "a\\b", "fmt/", ""] {
            let error = resolver
                .resolve(identifier, &FilePath::from("/work"))
                .unwrap_err();
            assert!(error.is_client_error(), "{} should be rejected", identifier);
        }
        assert!(mock.accesses().is_empty());
        assert_eq!(
            ImportPath::parse("a//b").unwrap_err().to_string(),
            "invalid import path \"a//b\": empty path element"
        );
    }

    #[test]
    fn test_import_path_source_dir() {
        let import_path = ImportPath::parse("golang.org/x/text").unwrap();
        assert_eq!(import_path.as_str(), "golang.org/x/text");
        assert_eq!(
            import_path.source_dir(Path::new("/gopath")),
            FilePath::from("/gopath/src/golang.org/x/text")
        );
    }

    #[test]
    fn test_multiple_packages() {
        let mock = MockPal::new();
        mock.add_file("/go/src/mixed/a.go", "package alpha\n");
        mock.add_file("/go/src/mixed/b.go", "package beta\n");

        let error = resolver(&mock)
            .resolve("mixed", &FilePath::from("/work"))
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "found packages alpha (a.go) and beta (b.go) in /go/src/mixed"
        );
    }

    #[test]
    fn test_no_go_files_reasons() {
        let mock = MockPal::new();
        mock.add_directory("/go/src/empty");
        mock.add_file("/go/src/tests/x_test.go", "package tests\n");
        mock.add_file("/go/src/windows/w_windows.go", "package windows\n");
        mock.add_file("/go/src/tagged/t.go", "// +build integration\n\npackage tagged\n");
        let resolver = resolver(&mock);
        let message = |identifier: &str| {
            resolver
                .resolve(identifier, &FilePath::from("/work"))
                .unwrap_err()
                .to_string()
        };

        assert_eq!(
            message("empty"),
            "no buildable Go source files in /go/src/empty"
        );
        assert_eq!(message("tests"), "no non-test Go files in /go/src/tests");
        assert_eq!(
            message("windows"),
            "build constraints exclude all Go files in /go/src/windows"
        );
        assert_eq!(
            message("tagged"),
            "build constraints exclude all Go files in /go/src/tagged"
        );
    }

    #[test]
    fn test_build_tags_enable_files() {
        let mock = MockPal::new();
        mock.add_file("/go/src/tagged/t.go", "//go:build integration\n\npackage tagged\n");
        let mut resolver = resolver(&mock);
        resolver.context.build_tags = vec!["integration".to_string()];

        let package = resolver.resolve("tagged", &FilePath::from("/work")).unwrap();
        assert_eq!(names(&package.go_files), vec!["t.go"]);
    }

    #[test]
    fn test_missing_package_clause_is_a_syntax_error() {
        let mock = MockPal::new();
        mock.add_file("/go/src/broken/b.go", "func f() {}\n");

        let error = resolver(&mock)
            .resolve("broken", &FilePath::from("/work"))
            .unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::Syntax { .. }));
        assert_eq!(
            error.to_string(),
            "/go/src/broken/b.go:1:1: expected 'package', found 'func'"
        );
    }

    #[test]
    fn test_byte_order_mark_is_accepted() {
        let mock = MockPal::new();
        mock.add_file(
            "/go/src/bom/a.go",
            "\u{feff}//go:build linux\n\n// TODO: bom file\npackage bom\n",
        );
        mock.add_file("/go/src/bom/b_other.go", "\u{feff}//go:build windows\n\npackage bom\n");

        let package = resolver(&mock)
            .resolve("bom", &FilePath::from("/work"))
            .unwrap();
        assert_eq!(package.name, "bom");
        assert_eq!(names(&package.go_files), vec!["a.go"]);
        assert_eq!(names(&package.ignored_files), vec!["b_other.go"]);
    }
}
