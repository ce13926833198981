use super::*;
use std::sync::Mutex;

const OWN_PID: u32 = 100;

fn process(pid: u32, name: &str, cmdline: &str) -> ProcessInfo {
    ProcessInfo { pid, name: name.to_owned(), cmdline: cmdline.to_owned() }
}

struct MockPlatform {
    processes: Vec<ProcessInfo>,
    devices: Option<Vec<String>>,
    failing_pid: Option<u32>,
    killed: Mutex<Vec<u32>>,
    restarted: Mutex<Vec<String>>,
}

impl MockPlatform {
    fn new(devices: usize) -> Self {
        Self {
            processes: vec![
                process(OWN_PID, "depth-cli", "depth-cli reset --camera"),
                process(1, "WindowsCamera.exe", ""),
                process(2, "python3", "python3 kinect_bridge.py"),
                process(3, "bash", "bash"),
                process(4, "camera.exe", ""),
            ],
            devices: Some((0..devices).map(|i| format!("/dev/video{i}")).collect()),
            failing_pid: None,
            killed: Mutex::new(Vec::new()),
            restarted: Mutex::new(Vec::new()),
        }
    }
}

impl Platform for MockPlatform {
    fn own_pid(&self) -> u32 {
        OWN_PID
    }

    fn processes(&self) -> Vec<ProcessInfo> {
        self.processes.clone()
    }

    fn kill(&self, pid: u32) -> Result<(), ResetError> {
        if self.failing_pid == Some(pid) {
            return Err(ResetError::KillFailed(pid));
        }
        self.killed.lock().unwrap().push(pid);
        Ok(())
    }

    fn camera_services(&self) -> Vec<String> {
        vec!["FrameServer".to_owned()]
    }

    fn restart_service(&self, name: &str) -> Result<(), ResetError> {
        self.restarted.lock().unwrap().push(name.to_owned());
        Ok(())
    }

    fn video_devices(&self) -> Result<Vec<String>, ResetError> {
        self.devices.clone().ok_or(ResetError::Unsupported("video device probing"))
    }
}

fn quick(dry_run: bool, expected_devices: usize) -> ResetOptions {
    ResetOptions { dry_run, settle: Duration::ZERO, expected_devices }
}

#[test]
fn camera_detection_by_name_and_cmdline() {
    assert!(is_camera_process(&process(1, "Camera.exe", ""), OWN_PID));
    assert!(is_camera_process(&process(1, "CAMERA.EXE", ""), OWN_PID));
    assert!(is_camera_process(&process(1, "python", "python reset_Camera.py"), OWN_PID));
    assert!(is_camera_process(&process(1, "node", "node --kinect"), OWN_PID));
    assert!(!is_camera_process(&process(1, "bash", "bash -l"), OWN_PID));
}

#[test]
fn own_process_is_never_a_target() {
    assert!(!is_camera_process(&process(OWN_PID, "Camera.exe", "camera"), OWN_PID));
}

#[tokio::test]
async fn reset_kills_camera_processes_and_restarts_services() {
    let platform = MockPlatform::new(3);
    let report = run_reset(&platform, &quick(false, 3)).await;

    assert_eq!(report.killed, vec![1, 2, 4]);
    assert_eq!(*platform.killed.lock().unwrap(), vec![1, 2, 4]);
    assert_eq!(report.restarted, vec!["FrameServer".to_owned()]);
    assert!(report.failures.is_empty());
    assert!(report.enough_devices());
    assert!(report.warning.is_none());
}

#[tokio::test]
async fn dry_run_touches_nothing() {
    let platform = MockPlatform::new(3);
    let report = run_reset(&platform, &quick(true, 3)).await;

    assert!(report.dry_run);
    assert_eq!(report.camera_processes.len(), 3);
    assert!(report.killed.is_empty());
    assert!(report.restarted.is_empty());
    assert!(platform.killed.lock().unwrap().is_empty());
    assert!(platform.restarted.lock().unwrap().is_empty());
    assert_eq!(report.devices.map(|d| d.len()), Some(3));
}

#[tokio::test]
async fn kill_failures_are_reported_and_reset_continues() {
    let mut platform = MockPlatform::new(3);
    platform.failing_pid = Some(2);
    let report = run_reset(&platform, &quick(false, 3)).await;

    assert_eq!(report.killed, vec![1, 4]);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].contains("could not signal process 2"));
    assert_eq!(report.restarted.len(), 1);
}

#[tokio::test]
async fn too_few_devices_warns() {
    let platform = MockPlatform::new(1);
    let report = run_reset(&platform, &quick(false, 3)).await;

    assert!(!report.enough_devices());
    let warning = report.warning.expect("warning");
    assert!(warning.contains("only 1 of 3"));
}

#[test]
fn camera_processes_filters_platform_list() {
    let platform = MockPlatform::new(0);
    let pids: Vec<u32> = camera_processes(&platform).iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![1, 2, 4]);
}

#[tokio::test]
async fn unsupported_device_probe_is_a_failure_not_a_warning() {
    let mut platform = MockPlatform::new(0);
    platform.devices = None;
    let report = run_reset(&platform, &quick(false, 3)).await;

    assert!(report.devices.is_none());
    assert!(report.enough_devices());
    assert!(report.warning.is_none());
    assert_eq!(report.failures, vec!["video device probing is not supported on this platform".to_owned()]);
}

#[cfg(not(target_os = "linux"))]
#[test]
fn system_platform_reports_device_probing_unsupported() {
    assert!(matches!(SystemPlatform.video_devices(), Err(ResetError::Unsupported(_))));
}
