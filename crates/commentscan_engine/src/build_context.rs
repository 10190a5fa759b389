/* 📖 # What is the BuildContext?

Which files belong to a Go package depends on the target: `net_windows.go` is not part
of `net` on Linux, and a file guarded by `//go:build cgo` disappears when cgo is off.
The BuildContext captures that target (GOOS, GOARCH, cgo, tags) together with the
GOROOT/GOPATH search roots, so resolution gives the same answer the Go toolchain would.
*/

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Operating systems recognised in file name suffixes and build tags.
pub const KNOWN_OS: &[&str] = &[
    "aix",
    "android",
    "darwin",
    "dragonfly",
    "freebsd",
    "hurd",
    "illumos",
    "ios",
    "js",
    "linux",
    "nacl",
    "netbsd",
    "openbsd",
    "plan9",
    "solaris",
    "wasip1",
    "windows",
    "zos",
];

/// Architectures recognised in file name suffixes and build tags.
pub const KNOWN_ARCH: &[&str] = &[
    "386",
    "amd64",
    "amd64p32",
    "arm",
    "armbe",
    "arm64",
    "arm64be",
    "loong64",
    "mips",
    "mipsle",
    "mips64",
    "mips64le",
    "mips64p32",
    "mips64p32le",
    "ppc",
    "ppc64",
    "ppc64le",
    "riscv",
    "riscv64",
    "s390",
    "s390x",
    "sparc",
    "sparc64",
    "wasm",
];

/// Operating systems satisfying the `unix` tag.
const UNIX_OS: &[&str] = &[
    "aix",
    "android",
    "darwin",
    "dragonfly",
    "freebsd",
    "hurd",
    "illumos",
    "ios",
    "linux",
    "netbsd",
    "openbsd",
    "solaris",
];

/// GOROOT used when neither `$GOROOT` nor `go env GOROOT` name one.
pub const DEFAULT_GOROOT: &str = "/usr/local/go";

/// Highest `go1.N` release tag assumed when the installed version is unknown.
pub const DEFAULT_GO_MINOR_VERSION: u32 = 22;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub goroot: PathBuf,
    pub gopath: Vec<PathBuf>,
    pub goos: String,
    pub goarch: String,
    pub cgo_enabled: bool,
    /// Extra tags, as passed with `-tags`
    pub build_tags: Vec<String>,
    /// `go1.1` up to the configured version
    pub release_tags: Vec<String>,
}

impl BuildContext {
    /// Context described by the process environment and the installed Go toolchain.
    ///
    /// An unset `GOROOT` is asked from `go env GOROOT`, and the release tags end at the
    /// version recorded in `$GOROOT/VERSION`.
    pub fn from_env() -> Self {
        let mut context = Self::from_env_with(|key| {
            let value = std::env::var(key).ok().filter(|value| !value.is_empty());
            if key == "GOROOT" {
                value.or_else(goroot_from_go_command)
            } else {
                value
            }
        });
        if let Some(minor) = installed_go_minor_version(&context.goroot) {
            context.release_tags = release_tags(minor);
        }
        context
    }

    /// Context described by `lookup`, which plays the role of the environment.
    ///
    /// Unset or empty variables fall back to the host platform, `/usr/local/go` and `$HOME/go`.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let goroot = var("GOROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GOROOT));
        let gopath = match var("GOPATH") {
            Some(value) => std::env::split_paths(&value).collect(),
            None => var("HOME")
                .map(|home| vec![PathBuf::from(home).join("go")])
                .unwrap_or_default(),
        };
        let goos = var("GOOS").unwrap_or_else(|| host_goos().to_string());
        let goarch = var("GOARCH").unwrap_or_else(|| host_goarch().to_string());
        let cgo_enabled = var("CGO_ENABLED").is_none_or(|value| value != "0");

        let mut context = Self {
            goroot,
            gopath: Vec::new(),
            goos,
            goarch,
            cgo_enabled,
            build_tags: Vec::new(),
            release_tags: release_tags(DEFAULT_GO_MINOR_VERSION),
        };
        context.set_gopath(gopath);
        context
    }

    /// Replace the GOPATH entries, dropping empty ones and any equal to GOROOT.
    pub fn set_gopath(&mut self, entries: Vec<PathBuf>) {
        let goroot = self.goroot.clone();
        self.gopath = entries
            .into_iter()
            .filter(|entry| !entry.as_os_str().is_empty() && entry != &goroot)
            .collect();
    }

    /// Whether `name` is satisfied by this context.
    pub fn match_tag(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        if name == "cgo" {
            return self.cgo_enabled;
        }
        if name == self.goos || name == self.goarch || name == "gc" {
            return true;
        }
        let implied = match self.goos.as_str() {
            "android" => name == "linux",
            "illumos" => name == "solaris",
            "ios" => name == "darwin",
            _ => false,
        };
        if implied {
            return true;
        }
        if name == "unix" && UNIX_OS.contains(&self.goos.as_str()) {
            return true;
        }
        self.build_tags.iter().any(|tag| tag == name)
            || self.release_tags.iter().any(|tag| tag == name)
    }

    /// Applies the `_GOOS`, `_GOARCH` and `_GOOS_GOARCH` file name conventions.
    ///
    /// Only known operating systems and architectures act as constraints, so
    /// `file_unknown.go` is always accepted.
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        let stem = match file_name.split_once('.') {
            Some((stem, _)) => stem,
            None => file_name,
        };
        let Some(underscore) = stem.find('_') else {
            return true;
        };
        let mut parts: Vec<&str> = stem[underscore..].split('_').collect();
        if parts.last() == Some(&"test") {
            parts.pop();
        }
        let n = parts.len();
        if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.match_tag(parts[n - 2]) && self.match_tag(parts[n - 1]);
        }
        if n >= 1 && (KNOWN_OS.contains(&parts[n - 1]) || KNOWN_ARCH.contains(&parts[n - 1])) {
            return self.match_tag(parts[n - 1]);
        }
        true
    }
}

/// Ask the `go` command for its GOROOT.
pub fn goroot_from_go_command() -> Option<String> {
    let output = Command::new("go").args(["env", "GOROOT"]).output().ok()?;
    if !output.status.success() {
        debug!(status = %output.status, "go env GOROOT failed");
        return None;
    }
    let goroot = String::from_utf8(output.stdout).ok()?.trim().to_string();
    debug!(goroot = %goroot, "GOROOT reported by the go command");
    Some(goroot).filter(|goroot| !goroot.is_empty())
}

/// Minor version of the Go installation at `goroot`, read from its `VERSION` file.
pub fn installed_go_minor_version(goroot: &Path) -> Option<u32> {
    let version = std::fs::read_to_string(goroot.join("VERSION")).ok()?;
    parse_go_minor_version(version.lines().next()?.trim())
}

/// Minor version of a `1.N`, `1.N.P`, `go1.N` or `go1.NrcM` version string.
pub fn parse_go_minor_version(version: &str) -> Option<u32> {
    let trimmed = version.strip_prefix("go").unwrap_or(version);
    let mut parts = trimmed.split('.');
    if parts.next() != Some("1") {
        return None;
    }
    let minor = parts.next()?;
    let digits = minor
        .find(|c: char| !c.is_ascii_digit())
        .map_or(minor, |end| &minor[..end]);
    digits.parse().ok()
}

/// `go1.1` through `go1.{minor}`.
pub fn release_tags(minor: u32) -> Vec<String> {
    (1..=minor).map(|n| format!("go1.{}", n)).collect()
}

/// GOOS naming of the host operating system.
pub fn host_goos() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// GOARCH naming of the host architecture.
pub fn host_goarch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc" => "ppc",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        "wasm32" => "wasm",
        other => other,
    }
}
