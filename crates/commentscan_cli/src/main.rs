/* 📖 # Why does the CLI load the configuration before anything else?

The log filter is part of the configuration, so tracing can only be installed once
the file has been read. Configuration errors are therefore reported with a plain
message on stderr instead of a log event.

Exit codes:
- 0: Success (scan finished, or the server shut down)
- 1: Error (invalid configuration, failed scan, or the server could not start)
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use commentscan_base::pal::http::HttpServerConfig;
use commentscan_base::tracing::{info, init_tracing};
use commentscan_base::{CommentscanResult, FilePath, PalHandle, RealPal, critical};
use commentscan_engine::request::split_tokens;
use commentscan_engine::{
    CommentScanService, CommentScanner, Config, ErrorPolicy, GoPathResolver, ScanRequest,
    ScanResult, TracingMeasurement, load_config,
};

#[derive(Debug, Parser)]
#[command(name = "commentscan", version, about = "Search the comments of Go packages")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the comments of a package that contain any of the tokens
    Scan {
        /// Import path, or a directory starting with `./` or `../`
        package: String,
        /// Comma separated tokens, matched case-sensitively
        tokens: String,
    },
    /// Serve scans over HTTP
    Server {
        /// Bind address, overrides `server.address`
        #[arg(long)]
        address: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let current_dir = std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Error: Failed to get current directory: {}", e);
        process::exit(1);
    });
    let pal = PalHandle::new(RealPal::new(current_dir));

    let config = match &cli.config {
        Some(path) => load_config(&pal, &FilePath::from(path.as_path())).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        }),
        None => Config::default(),
    };

    if let Err(e) = init_tracing(&config.server.log_filter) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let outcome = match cli.command {
        Command::Scan { package, tokens } => run_scan(&pal, &config, package, &tokens),
        Command::Server { address } => run_server(&pal, &config, address),
    };
    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn scanner(pal: &PalHandle, config: &Config) -> CommentscanResult<CommentScanner> {
    let context = config.build.build_context()?;
    let resolver = Arc::new(GoPathResolver::new(pal.clone(), context));
    Ok(CommentScanner::new(pal.clone(), resolver))
}

fn run_scan(
    pal: &PalHandle,
    config: &Config,
    package: String,
    tokens: &str,
) -> CommentscanResult<()> {
    let request = ScanRequest::new(package, split_tokens(tokens));
    let result = scanner(pal, config)?.scan(&request)?;
    if result.binary_only {
        eprintln!(
            "{} is a binary-only package, its comments cannot be scanned",
            result.package_name
        );
        return Ok(());
    }
    print!("{}", format_matches(&result, &request.tokens));
    Ok(())
}

/// One `<file>:<line>:` block per match, tokens in request order.
fn format_matches(result: &ScanResult, tokens: &[String]) -> String {
    let mut output = String::new();
    let mut seen: Vec<&str> = Vec::new();
    for token in tokens {
        if seen.contains(&token.as_str()) {
            continue;
        }
        seen.push(token);
        for found in result.matches_for(token) {
            output.push_str(&format!(
                "{}:{}:\n{}",
                found.file_name, found.line_number, found.line_content
            ));
        }
    }
    output
}

fn run_server(pal: &PalHandle, config: &Config, address: Option<String>) -> CommentscanResult<()> {
    let address = address.unwrap_or_else(|| config.server.address.clone());
    let service = CommentScanService::new(
        scanner(pal, config)?,
        ErrorPolicy::from_config(&config.server),
        Arc::new(TracingMeasurement),
    );
    let server_config = HttpServerConfig::from_address(&address)?;
    let handle = pal
        .start_http_server(Box::new(service), server_config.clone())
        .inspect_err(|e| critical!(address = %address, error = %e, "could not start the server"))?;
    info!(
        address = %handle.address(&server_config.host),
        development = config.server.development,
        "serving comment scans"
    );
    handle.wait();
    Ok(())
}
