/* 📖 # Why an API module in commentscan_engine?

The api module exposes package scans over HTTP. CommentScanService implements the
HttpService trait from commentscan_base, so it runs unchanged on RealPal's tiny_http
server and in MockPal-driven tests.

Routes:
- `GET /?package=<id>&tokens=<a,b>`
- `POST /parse` with a JSON ScanRequest body
*/

mod measurement;
mod service;

pub use measurement::{Measurement, NoopMeasurement, TracingMeasurement};
pub use service::{CommentScanService, ErrorPolicy};
