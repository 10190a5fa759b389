/* 📖 # Why is request timing behind a trait?

Where latency numbers end up is a deployment decision. The service only reports
route, status and elapsed time; production logs them through tracing, and tests
either drop them or record them to assert that every request was measured.
*/

use std::fmt::Debug;
use std::time::Duration;

use commentscan_base::pal::http::HttpStatusCode;
use tracing::info;

/// Receives one record per handled request.
pub trait Measurement: Debug + Send + Sync {
    fn record(&self, route: &str, status: HttpStatusCode, elapsed: Duration);
}

/// Emits each measurement as an `info` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMeasurement;

impl Measurement for TracingMeasurement {
    fn record(&self, route: &str, status: HttpStatusCode, elapsed: Duration) {
        info!(
            target: "commentscan::measurement",
            route,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "request handled"
        );
    }
}

/// Discards measurements.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMeasurement;

impl Measurement for NoopMeasurement {
    fn record(&self, _route: &str, _status: HttpStatusCode, _elapsed: Duration) {}
}
