/* 📖 # How do the engine modules fit together?

`resolver` turns a package identifier into a directory and the list of files the Go
toolchain would compile for the configured BuildContext (`build_context`, `header`,
`constraint`). `comment_parser` and `extractor` turn one file into comment groups and
token matches, and `scanner` drives both for a whole package. `api` exposes the
scanner over HTTP, while `request`, `model` and `config` hold the shapes that cross
the process boundary.
*/

pub mod api;
pub mod build_context;
pub mod comment_parser;
pub mod config;
pub mod constraint;
pub mod extractor;
pub mod header;
pub mod model;
pub mod request;
pub mod resolver;
pub mod scanner;

pub use api::{CommentScanService, ErrorPolicy, Measurement, NoopMeasurement, TracingMeasurement};
pub use build_context::BuildContext;
pub use config::{Config, load_config, parse_config};
pub use model::{CommentMatch, ScanResult, TokenMatches};
pub use request::ScanRequest;
pub use resolver::{GoPathResolver, PackageResolver, ResolvedPackage};
pub use scanner::{CommentScanner, scan_package};
