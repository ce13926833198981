mod check;
mod client;
mod metrics;
mod reset;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use crate::client::{ClientError, DepthClient, StreamOptions, Timeouts};
use crate::metrics::LatencyMetrics;
use crate::reset::{Platform, ResetOptions, SystemPlatform};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("could not write {path}: {source}")]
    WriteReport { path: PathBuf, source: std::io::Error },
}

#[derive(Parser, Debug)]
#[command(name = "depth-cli", about = "Depth server test client and camera utility")]
struct Cli {
    #[arg(long, env = "DEPTH_SERVER_URL", default_value = frames::DEFAULT_URL)]
    url: String,

    #[arg(long, default_value_t = 3000)]
    connect_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Round-trip one ping.
    Ping,
    /// Request a single frame.
    Frame {
        #[arg(long)]
        topography: bool,
        /// Print the full frame as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Stream frames and report the rate.
    Stream(StreamArgs),
    /// Run the protocol check sequence.
    Check {
        #[command(flatten)]
        stream: StreamArgs,
        /// Write the JSON report here.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Measure ping and get_frame latency.
    Bench {
        #[arg(long, default_value_t = 50)]
        requests: usize,
        #[arg(long)]
        json: bool,
    },
    /// GET /healthz.
    Health,
    /// GET /status.
    Status,
    /// GET /version.
    Version,
    /// List video devices and camera processes.
    Devices,
    /// Kill camera processes, restart camera services, and probe devices.
    Reset {
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value_t = 5000)]
        settle_ms: u64,
        /// Warn when fewer video devices than this are present.
        #[arg(long, default_value_t = 3)]
        expect: usize,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct StreamArgs {
    #[arg(long, default_value_t = 5)]
    frames: usize,
    #[arg(long, default_value_t = 5000)]
    duration_ms: u64,
    #[arg(long, default_value_t = 1000)]
    frame_timeout_ms: u64,
    #[arg(long)]
    fps: Option<u32>,
    #[arg(long)]
    topography: bool,
}

impl From<&StreamArgs> for StreamOptions {
    fn from(args: &StreamArgs) -> Self {
        Self {
            frames: args.frames,
            duration: Duration::from_millis(args.duration_ms),
            frame_timeout: Duration::from_millis(args.frame_timeout_ms),
            fps: args.fps,
            include_topography: args.topography,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let timeouts = Timeouts { connect: Duration::from_millis(cli.connect_timeout_ms), ..Timeouts::default() };

    match cli.command {
        Command::Ping => {
            let mut client = DepthClient::connect(&cli.url, timeouts).await?;
            let rtt = client.ping().await?;
            println!("pong in {:.2} ms", millis(rtt));
            client.close().await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Frame { topography, json } => {
            let mut client = DepthClient::connect(&cli.url, timeouts).await?;
            let frame = client.get_frame(topography).await?;
            client.close().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&frame)?);
            } else {
                print_frame(&frame);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Stream(args) => run_stream(&cli.url, timeouts, &args).await,
        Command::Check { stream, report } => run_check(&cli.url, timeouts, &stream, report).await,
        Command::Bench { requests, json } => run_bench(&cli.url, timeouts, requests, json).await,
        Command::Health => {
            http_get(&cli.url, "/healthz").await?;
            println!("ok");
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => print_json(&http_json(&cli.url, "/status").await?),
        Command::Version => print_json(&http_json(&cli.url, "/version").await?),
        Command::Devices => Ok(run_devices(&SystemPlatform)),
        Command::Reset { dry_run, settle_ms, expect, json } => {
            let options = ResetOptions { dry_run, settle: Duration::from_millis(settle_ms), expected_devices: expect };
            run_reset(&SystemPlatform, &options, json).await
        }
    }
}

async fn run_stream(url: &str, timeouts: Timeouts, args: &StreamArgs) -> Result<ExitCode, CliError> {
    let mut client = DepthClient::connect(url, timeouts).await?;
    let summary = client.stream(&StreamOptions::from(args)).await?;
    client.close().await;

    println!(
        "{} frames in {:.0} ms ({:.1} fps), last frame id {}",
        summary.frames_received,
        millis(summary.elapsed),
        summary.fps(),
        summary.last_frame_id.map_or_else(|| "-".to_owned(), |id| id.to_string())
    );
    if !summary.is_clean() {
        println!(
            "unexpected messages: [{}], malformed messages: {}",
            summary.unexpected.join(", "),
            summary.malformed
        );
    }
    println!("stopped: {} ({} frames drained)", summary.stopped, summary.drained);

    Ok(if summary.frames_received > 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run_check(
    url: &str,
    timeouts: Timeouts,
    stream: &StreamArgs,
    report_path: Option<PathBuf>,
) -> Result<ExitCode, CliError> {
    let report = check::run_checks(url, timeouts, &StreamOptions::from(stream)).await;

    for result in &report.results {
        println!("[{}] {:<12} {:>8.1} ms  {}", result.status, result.name, result.duration_ms, result.detail);
    }
    println!(
        "{}/{} passed ({:.0}%), {} failed, {} skipped",
        report.passed, report.total, report.success_rate, report.failed, report.skipped
    );

    if let Some(path) = report_path {
        let json = report.to_json_pretty()?;
        std::fs::write(&path, json).map_err(|source| CliError::WriteReport { path: path.clone(), source })?;
        println!("report written to {}", path.display());
    }

    Ok(if report.all_passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run_bench(url: &str, timeouts: Timeouts, requests: usize, json: bool) -> Result<ExitCode, CliError> {
    let mut client = DepthClient::connect(url, timeouts).await?;

    let mut pings = Vec::with_capacity(requests);
    for _ in 0..requests {
        pings.push(client.ping().await?);
    }

    let mut frame_times = Vec::with_capacity(requests);
    for _ in 0..requests {
        let started = Instant::now();
        client.get_frame(false).await?;
        frame_times.push(started.elapsed());
    }
    client.close().await;

    let ping = LatencyMetrics::from_durations(&pings);
    let get_frame = LatencyMetrics::from_durations(&frame_times);
    if json {
        return print_json(&serde_json::json!({ "ping": ping, "get_frame": get_frame }));
    }
    println!("{}", ping.summary_line("ping"));
    println!("{}", get_frame.summary_line("get_frame"));
    Ok(ExitCode::SUCCESS)
}

fn run_devices(platform: &dyn Platform) -> ExitCode {
    let devices = platform.video_devices();
    match &devices {
        Ok(found) if found.is_empty() => println!("no video devices found"),
        Ok(found) => found.iter().for_each(|device| println!("device   {device}")),
        Err(e) => eprintln!("warning: {e}"),
    }
    for process in reset::camera_processes(platform) {
        println!("process  {:>7}  {}  {}", process.pid, process.name, process.cmdline);
    }
    devices_exit_code(devices.as_deref())
}

/// Failure only when probing worked and found nothing.
fn devices_exit_code(devices: Result<&[String], &reset::ResetError>) -> ExitCode {
    match devices {
        Ok([]) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

async fn run_reset(platform: &dyn Platform, options: &ResetOptions, json: bool) -> Result<ExitCode, CliError> {
    if options.dry_run && !json {
        println!("dry run: nothing will be killed or restarted");
    }
    let report = reset::run_reset(platform, options).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    for process in &report.camera_processes {
        let action = if report.killed.contains(&process.pid) { "killed" } else { "found" };
        println!("{action:<9} {:>7}  {}", process.pid, process.name);
    }
    for service in &report.restarted {
        println!("restarted {service}");
    }
    for failure in &report.failures {
        eprintln!("warning: {failure}");
    }
    if let Some(devices) = &report.devices {
        println!("{} video devices: {}", devices.len(), devices.join(", "));
    }
    if let Some(warning) = &report.warning {
        eprintln!("warning: {warning}");
    }
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// HTTP
// =============================================================================

/// HTTP base URL for the server behind a websocket URL.
fn http_base(ws_url: &str) -> Result<String, CliError> {
    let rest = if let Some(rest) = ws_url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else if let Some(rest) = ws_url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if ws_url.starts_with("http://") || ws_url.starts_with("https://") {
        ws_url.to_owned()
    } else {
        return Err(CliError::InvalidUrl(ws_url.to_owned()));
    };
    let trimmed = rest.trim_end_matches('/');
    Ok(trimmed.strip_suffix("/ws").unwrap_or(trimmed).to_owned())
}

async fn http_get(ws_url: &str, path: &str) -> Result<reqwest::Response, CliError> {
    let url = format!("{}{path}", http_base(ws_url)?);
    let response = reqwest::Client::new().get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::HttpStatus { status: status.as_u16(), url });
    }
    Ok(response)
}

async fn http_json(ws_url: &str, path: &str) -> Result<Value, CliError> {
    Ok(http_get(ws_url, path).await?.json::<Value>().await?)
}

fn print_json(value: &Value) -> Result<ExitCode, CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(ExitCode::SUCCESS)
}

fn print_frame(frame: &frames::FrameData) {
    println!("frame {} at {:.3}", frame.frame_id, frame.timestamp);
    if let Some(depth) = &frame.depth_data {
        println!(
            "  depth  {}x{}  min {:.0} mm  max {:.0} mm  mean {:.1} mm",
            depth.width, depth.height, depth.min_depth, depth.max_depth, depth.mean_depth
        );
    }
    if let Some(rgb) = &frame.rgb_data {
        println!("  rgb    {}x{}", rgb.width, rgb.height);
    }
    if let Some(mesh) = &frame.mesh_data {
        println!("  mesh   {}x{} ({} cells)", mesh.width, mesh.height, mesh.data.len());
    }
    if let Some(topo) = &frame.topography {
        let stats = &topo.elevation_stats;
        println!(
            "  terrain elevation {:.1}..{:.1} mm (mean {:.1}), roughness {:.2}",
            stats.min, stats.max, stats.mean, topo.roughness
        );
    }
    if let Some(interaction) = &frame.interaction {
        println!("  hands  {}", interaction.interaction_points.len());
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
