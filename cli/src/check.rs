//! End-to-end protocol check against a running depth server.
//!
//! DESIGN
//! ======
//! Checks run in a fixed order on one connection. The first failure ends the
//! run; every later check is recorded as SKIP so the report always lists the
//! full sequence.

use std::time::Instant;

use serde::Serialize;

use crate::client::{DepthClient, StreamOptions, StreamSummary, Timeouts};

pub const CHECKS: [&str; 5] = ["connect", "ping", "get_frame", "stream", "stop_stream"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub duration_ms: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub timestamp: f64,
    pub url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Percentage of checks that passed.
    pub success_rate: f64,
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_results(url: &str, results: Vec<CheckResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        let (passed, failed, skipped) = (count(CheckStatus::Pass), count(CheckStatus::Fail), count(CheckStatus::Skip));
        let total = results.len();
        let success_rate = if total == 0 { 0.0 } else { passed as f64 * 100.0 / total as f64 };
        Self { timestamp: frames::now_secs(), url: url.to_owned(), total, passed, failed, skipped, success_rate, results }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }

    /// Pretty JSON for `--report`.
    ///
    /// # Errors
    ///
    /// Only if serialization fails, which plain data cannot trigger.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Default)]
struct Checklist {
    results: Vec<CheckResult>,
}

impl Checklist {
    /// Record one outcome; returns whether it passed.
    fn record(&mut self, name: &'static str, started: Instant, outcome: Result<String, String>) -> bool {
        let (status, detail) = match outcome {
            Ok(detail) => (CheckStatus::Pass, detail),
            Err(detail) => (CheckStatus::Fail, detail),
        };
        self.results.push(CheckResult {
            name,
            status,
            duration_ms: started.elapsed().as_secs_f64() * 1_000.0,
            detail,
        });
        status == CheckStatus::Pass
    }

    fn finish(mut self, url: &str) -> CheckReport {
        for &name in CHECKS.iter().skip(self.results.len()) {
            self.results.push(CheckResult {
                name,
                status: CheckStatus::Skip,
                duration_ms: 0.0,
                detail: "skipped after earlier failure".to_owned(),
            });
        }
        CheckReport::from_results(url, self.results)
    }
}

/// Run the full check sequence against `url`.
pub async fn run_checks(url: &str, timeouts: Timeouts, stream: &StreamOptions) -> CheckReport {
    let mut list = Checklist::default();

    let started = Instant::now();
    let mut client = match DepthClient::connect(url, timeouts).await {
        Ok(client) => {
            list.record("connect", started, Ok(format!("connected to {url}")));
            client
        }
        Err(e) => {
            list.record("connect", started, Err(e.to_string()));
            return list.finish(url);
        }
    };

    let started = Instant::now();
    let ping = client
        .ping()
        .await
        .map(|rtt| format!("round trip {:.1} ms", rtt.as_secs_f64() * 1_000.0))
        .map_err(|e| e.to_string());
    if !list.record("ping", started, ping) {
        client.close().await;
        return list.finish(url);
    }

    let started = Instant::now();
    let frame = match client.get_frame(stream.include_topography).await {
        Ok(frame) if frame.has_payload() => Ok(describe_frame(&frame)),
        Ok(_) => Err("frame carried no depth, rgb, or mesh data".to_owned()),
        Err(e) => Err(e.to_string()),
    };
    if !list.record("get_frame", started, frame) {
        client.close().await;
        return list.finish(url);
    }

    let started = Instant::now();
    let summary = match client.stream(stream).await {
        Ok(summary) => summary,
        Err(e) => {
            list.record("stream", started, Err(e.to_string()));
            client.close().await;
            return list.finish(url);
        }
    };
    if list.record("stream", started, evaluate_stream(&summary)) {
        let stop = if summary.stopped {
            Ok(format!("stream stopped, {} in-flight frames drained", summary.drained))
        } else {
            Err("no stream_stopped acknowledgement".to_owned())
        };
        list.record("stop_stream", Instant::now(), stop);
    }

    client.close().await;
    list.finish(url)
}

/// Stream check verdict: at least one frame and nothing but frames.
pub fn evaluate_stream(summary: &StreamSummary) -> Result<String, String> {
    if summary.frames_received == 0 {
        return Err("no frames received".to_owned());
    }
    if !summary.unexpected.is_empty() {
        return Err(format!("unexpected message types during stream: {}", summary.unexpected.join(", ")));
    }
    if summary.malformed > 0 {
        return Err(format!("{} malformed messages during stream", summary.malformed));
    }
    Ok(format!(
        "{} frames in {:.0} ms ({:.1} fps)",
        summary.frames_received,
        summary.elapsed.as_secs_f64() * 1_000.0,
        summary.fps()
    ))
}

fn describe_frame(frame: &frames::FrameData) -> String {
    match &frame.depth_data {
        Some(depth) => format!(
            "frame {} ({}x{}, depth {:.0}-{:.0} mm)",
            frame.frame_id, depth.width, depth.height, depth.min_depth, depth.max_depth
        ),
        None => format!("frame {}", frame.frame_id),
    }
}

#[cfg(test)]
#[path = "check_test.rs"]
mod tests;
