/* 📖 # Why does the service hide internal error messages?

Resolution and parse failures carry filesystem paths from the server. Outside
development mode a 500 response only carries the configured support notice, while
the full error (with its context and span trace) goes to the log. Validation
failures are the client's own input, so their message is always returned with a
400.
*/

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, warn};

use commentscan_base::pal::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpService, HttpStatusCode,
};
use commentscan_base::{CommentscanError, CommentscanResult};

use super::measurement::Measurement;
use crate::config::ServerConfig;
use crate::request::ScanRequest;
use crate::scanner::CommentScanner;

/// How failures are reported to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub development: bool,
    pub support_notice: String,
}

impl ErrorPolicy {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            development: config.development,
            support_notice: config.support_notice.clone(),
        }
    }

    fn failure_response(&self, failure: &CommentscanError) -> HttpResponse {
        if failure.is_client_error() {
            warn!(error = %failure, "rejected request");
            return HttpResponse::error(HttpStatusCode::BadRequest, failure);
        }
        error!(error = ?failure, "request failed");
        if self.development {
            HttpResponse::error(HttpStatusCode::InternalServerError, failure)
        } else {
            HttpResponse::error(HttpStatusCode::InternalServerError, &self.support_notice)
        }
    }
}

/// HTTP front end for package scans.
pub struct CommentScanService {
    scanner: CommentScanner,
    policy: ErrorPolicy,
    measurement: Arc<dyn Measurement>,
}

impl CommentScanService {
    pub fn new(
        scanner: CommentScanner,
        policy: ErrorPolicy,
        measurement: Arc<dyn Measurement>,
    ) -> Self {
        Self {
            scanner,
            policy,
            measurement,
        }
    }

    fn serialize_json_response<T: Serialize>(data: &T) -> CommentscanResult<HttpResponse> {
        serde_json::to_string(data)
            .map(HttpResponse::json)
            .map_err(|e| {
                Box::new(CommentscanError::message(format!(
                    "JSON serialization error: {}",
                    e
                )))
            })
    }

    /// `GET /?package=..&tokens=..`
    fn handle_index(&self, request: &HttpRequest) -> CommentscanResult<HttpResponse> {
        let scan_request = ScanRequest::from_query(request.query())?;
        let result = self.scanner.scan(&scan_request)?;
        Self::serialize_json_response(&result)
    }

    /// `POST /parse` with a JSON body
    fn handle_parse(&self, request: &HttpRequest) -> CommentscanResult<HttpResponse> {
        let scan_request = ScanRequest::from_json(request.body().as_bytes())?;
        let result = self.scanner.scan(&scan_request)?;
        Self::serialize_json_response(&result)
    }

    fn measured(
        &self,
        request: &HttpRequest,
        handler: fn(&Self, &HttpRequest) -> CommentscanResult<HttpResponse>,
    ) -> HttpResponse {
        let start = Instant::now();
        let response = match handler(self, request) {
            Ok(response) => response,
            Err(failure) => self.policy.failure_response(&failure),
        };
        self.measurement
            .record(request.route(), response.status(), start.elapsed());
        response
    }
}

impl std::fmt::Debug for CommentScanService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentScanService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl HttpService for CommentScanService {
    fn handle_request(&self, request: HttpRequest) -> CommentscanResult<HttpResponse> {
        debug!(method = %request.method(), path = request.path(), "handling request");
        let response = match (request.route(), request.method()) {
            ("/", HttpMethod::Get) => self.measured(&request, Self::handle_index),
            ("/parse", HttpMethod::Post) => self.measured(&request, Self::handle_parse),
            ("/", _) | ("/parse", _) => HttpResponse::error(
                HttpStatusCode::UnprocessableEntity,
                "Unsupported HTTP method",
            ),
            _ => HttpResponse::error(HttpStatusCode::NotFound, "404 page not found"),
        };
        Ok(response)
    }
}
