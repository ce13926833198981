//! Camera detection and reset.
//!
//! DESIGN
//! ======
//! OS access goes through the `Platform` trait so the reset sequence can be
//! exercised with a scripted platform in tests. `SystemPlatform` uses
//! `sysinfo` for processes and shells out to the service manager:
//! `net stop/start` on Windows, `modprobe -r/modprobe` on Linux.
//!
//! SEQUENCE
//! ========
//! 1. Find camera processes (never this process) and kill them
//! 2. Restart camera services
//! 3. Wait for hardware to settle
//! 4. Probe video devices and warn when fewer than expected are present
//!
//! Steps 1 and 2 only report what they would do in a dry run.

use std::time::Duration;

use serde::Serialize;

/// Executables owned by camera apps that hold the device open.
pub const CAMERA_EXECUTABLES: [&str; 3] = ["Camera.exe", "WindowsCamera.exe", "opencv_videoio_msmf.exe"];

/// Command-line fragments that mark a process as camera-related.
const CAMERA_KEYWORDS: [&str; 2] = ["camera", "kinect"];

#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("process {0} not found")]
    NoSuchProcess(u32),
    #[error("could not signal process {0}")]
    KillFailed(u32),
    #[error("service {name}: {reason}")]
    Service { name: String, reason: String },
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cmdline: String,
}

pub trait Platform: Send + Sync {
    fn own_pid(&self) -> u32;
    fn processes(&self) -> Vec<ProcessInfo>;
    fn kill(&self, pid: u32) -> Result<(), ResetError>;
    fn camera_services(&self) -> Vec<String>;
    fn restart_service(&self, name: &str) -> Result<(), ResetError>;
    /// Paths or names of video capture devices currently present.
    fn video_devices(&self) -> Result<Vec<String>, ResetError>;
}

/// Whether `process` looks like something holding a camera open.
#[must_use]
pub fn is_camera_process(process: &ProcessInfo, own_pid: u32) -> bool {
    if process.pid == own_pid {
        return false;
    }
    if CAMERA_EXECUTABLES.iter().any(|exe| process.name.eq_ignore_ascii_case(exe)) {
        return true;
    }
    let cmdline = process.cmdline.to_lowercase();
    CAMERA_KEYWORDS.iter().any(|k| cmdline.contains(k))
}

/// Camera processes visible on `platform`.
#[must_use]
pub fn camera_processes(platform: &dyn Platform) -> Vec<ProcessInfo> {
    let own = platform.own_pid();
    platform.processes().into_iter().filter(|p| is_camera_process(p, own)).collect()
}

// =============================================================================
// RESET
// =============================================================================

#[derive(Debug, Clone)]
pub struct ResetOptions {
    pub dry_run: bool,
    pub settle: Duration,
    pub expected_devices: usize,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self { dry_run: false, settle: Duration::from_secs(5), expected_devices: 3 }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResetReport {
    pub dry_run: bool,
    /// Camera processes found, killed or not.
    pub camera_processes: Vec<ProcessInfo>,
    pub killed: Vec<u32>,
    pub services: Vec<String>,
    pub restarted: Vec<String>,
    pub failures: Vec<String>,
    /// `None` when the platform cannot enumerate devices.
    pub devices: Option<Vec<String>>,
    pub expected_devices: usize,
    pub warning: Option<String>,
}

impl ResetReport {
    #[must_use]
    pub fn enough_devices(&self) -> bool {
        self.devices.as_ref().is_none_or(|d| d.len() >= self.expected_devices)
    }
}

pub async fn run_reset(platform: &dyn Platform, options: &ResetOptions) -> ResetReport {
    let mut report = ResetReport {
        dry_run: options.dry_run,
        camera_processes: camera_processes(platform),
        services: platform.camera_services(),
        expected_devices: options.expected_devices,
        ..ResetReport::default()
    };

    if !options.dry_run {
        for process in &report.camera_processes {
            match platform.kill(process.pid) {
                Ok(()) => report.killed.push(process.pid),
                Err(e) => report.failures.push(format!("kill {} ({}): {e}", process.name, process.pid)),
            }
        }
        for service in &report.services {
            match platform.restart_service(service) {
                Ok(()) => report.restarted.push(service.clone()),
                Err(e) => report.failures.push(e.to_string()),
            }
        }
        tokio::time::sleep(options.settle).await;
    }

    match platform.video_devices() {
        Ok(devices) => {
            if devices.len() < options.expected_devices {
                report.warning = Some(format!(
                    "only {} of {} expected video devices found; check cables and drivers",
                    devices.len(),
                    options.expected_devices
                ));
            }
            report.devices = Some(devices);
        }
        Err(e) => report.failures.push(e.to_string()),
    }
    report
}

// =============================================================================
// SYSTEM PLATFORM
// =============================================================================

/// The real operating system.
pub struct SystemPlatform;

impl Platform for SystemPlatform {
    fn own_pid(&self) -> u32 {
        std::process::id()
    }

    fn processes(&self) -> Vec<ProcessInfo> {
        let mut sys = sysinfo::System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        sys.processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                cmdline: process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" "),
            })
            .collect()
    }

    fn kill(&self, pid: u32) -> Result<(), ResetError> {
        let target = sysinfo::Pid::from_u32(pid);
        let mut sys = sysinfo::System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[target]), true);
        let process = sys.process(target).ok_or(ResetError::NoSuchProcess(pid))?;
        if process.kill() { Ok(()) } else { Err(ResetError::KillFailed(pid)) }
    }

    fn camera_services(&self) -> Vec<String> {
        if cfg!(windows) {
            ["FrameServer", "KinectManagement", "KinectService"].map(String::from).to_vec()
        } else if cfg!(target_os = "linux") {
            vec!["uvcvideo".to_owned()]
        } else {
            Vec::new()
        }
    }

    fn restart_service(&self, name: &str) -> Result<(), ResetError> {
        if cfg!(windows) {
            run_service_command(name, "net", &["stop", name])?;
            run_service_command(name, "net", &["start", name])
        } else if cfg!(target_os = "linux") {
            run_service_command(name, "modprobe", &["-r", name])?;
            run_service_command(name, "modprobe", &[name])
        } else {
            Err(ResetError::Unsupported("service control"))
        }
    }

    fn video_devices(&self) -> Result<Vec<String>, ResetError> {
        if !cfg!(target_os = "linux") {
            return Err(ResetError::Unsupported("video device probing"));
        }
        let Ok(entries) = std::fs::read_dir("/dev") else {
            return Ok(Vec::new());
        };
        let mut devices: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("video"))
            .map(|entry| entry.path().display().to_string())
            .collect();
        devices.sort();
        Ok(devices)
    }
}

fn run_service_command(service: &str, program: &str, args: &[&str]) -> Result<(), ResetError> {
    let service_error = |reason: String| ResetError::Service { name: service.to_owned(), reason };
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| service_error(format!("{program}: {e}")))?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(service_error(format!("{program} {} exited with {}: {}", args.join(" "), output.status, stderr.trim())))
    }
}

#[cfg(test)]
#[path = "reset_test.rs"]
mod tests;
