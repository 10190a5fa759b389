/* 📖 # Why are build settings optional in the config file?

The Go environment variables already describe the target in most setups, so an
unset key falls back to the environment (`GOROOT`, `GOPATH`, `GOOS`, ...). The file
only needs to pin what differs, for example a server scanning a GOPATH that is not
the one of the user running it.
*/

use std::path::PathBuf;

use serde::Deserialize;

use commentscan_base::{CommentscanError, CommentscanResult, FilePath, PalHandle, ResultExt};

use crate::build_context::{
    BuildContext, installed_go_minor_version, parse_go_minor_version, release_tags,
};

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_SUPPORT_NOTICE: &str =
    "An internal server error has occurred, please contact support";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Contents of `commentscan.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub build: BuildConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Show internal error messages to HTTP clients
    pub development: bool,
    pub address: String,
    /// Replaces internal error messages outside development mode
    pub support_notice: String,
    /// Used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            development: false,
            address: DEFAULT_ADDRESS.to_string(),
            support_notice: DEFAULT_SUPPORT_NOTICE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Overrides for the environment-derived BuildContext.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub goroot: Option<PathBuf>,
    pub gopath: Option<Vec<PathBuf>>,
    pub goos: Option<String>,
    pub goarch: Option<String>,
    pub cgo_enabled: Option<bool>,
    pub tags: Vec<String>,
    /// `1.22` or `go1.22`
    pub go_version: Option<String>,
}

impl BuildConfig {
    /// Environment context with the configured overrides applied.
    pub fn build_context(&self) -> CommentscanResult<BuildContext> {
        let mut context = BuildContext::from_env();
        self.apply(&mut context)?;
        Ok(context)
    }

    pub fn apply(&self, context: &mut BuildContext) -> CommentscanResult<()> {
        if let Some(goroot) = &self.goroot {
            context.goroot = goroot.clone();
            if let Some(minor) = installed_go_minor_version(goroot) {
                context.release_tags = release_tags(minor);
            }
        }
        let gopath = self.gopath.as_ref().unwrap_or(&context.gopath).clone();
        context.set_gopath(gopath);
        if let Some(goos) = &self.goos {
            context.goos = goos.clone();
        }
        if let Some(goarch) = &self.goarch {
            context.goarch = goarch.clone();
        }
        if let Some(cgo_enabled) = self.cgo_enabled {
            context.cgo_enabled = cgo_enabled;
        }
        context.build_tags.extend(self.tags.iter().cloned());
        if let Some(version) = &self.go_version {
            context.release_tags = release_tags(configured_go_minor_version(version)?);
        }
        Ok(())
    }
}

fn configured_go_minor_version(version: &str) -> CommentscanResult<u32> {
    parse_go_minor_version(version).ok_or_else(|| {
        Box::new(CommentscanError::validation(format!(
            "Invalid Go version '{}', expected something like 1.22",
            version
        )))
    })
}

pub fn parse_config(text: &str) -> CommentscanResult<Config> {
    toml::from_str(text).map_err(|e| {
        Box::new(CommentscanError::message(format!(
            "Invalid configuration: {}",
            e.message()
        )))
    })
}

/// Read and parse a configuration file through the PAL.
pub fn load_config(pal: &PalHandle, path: &FilePath) -> CommentscanResult<Config> {
    let text = pal.read_file_to_string(path)?;
    parse_config(&text).with_context(|| format!("Loading configuration from {}", path))
}
