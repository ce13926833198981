use super::*;

#[test]
fn http_base_maps_websocket_schemes() {
    assert_eq!(http_base("ws://localhost:8765").unwrap(), "http://localhost:8765");
    assert_eq!(http_base("wss://sandbox.local/").unwrap(), "https://sandbox.local");
    assert_eq!(http_base("ws://127.0.0.1:8765/ws").unwrap(), "http://127.0.0.1:8765");
    assert_eq!(http_base("http://host:1").unwrap(), "http://host:1");
}

#[test]
fn http_base_rejects_unknown_scheme() {
    assert!(matches!(http_base("localhost:8765"), Err(CliError::InvalidUrl(_))));
}

#[test]
fn cli_defaults() {
    let cli = Cli::try_parse_from(["depth-cli", "ping"]).unwrap();
    assert_eq!(cli.connect_timeout_ms, 3000);
    assert!(matches!(cli.command, Command::Ping));
}

#[test]
fn stream_args_convert_to_options() {
    let cli = Cli::try_parse_from(["depth-cli", "stream", "--frames", "12", "--fps", "15", "--topography"]).unwrap();
    let Command::Stream(args) = cli.command else { panic!("expected stream") };
    let options = StreamOptions::from(&args);
    assert_eq!(options.frames, 12);
    assert_eq!(options.fps, Some(15));
    assert!(options.include_topography);
    assert_eq!(options.frame_timeout, Duration::from_secs(1));
}

#[test]
fn reset_flags_parse() {
    let cli = Cli::try_parse_from(["depth-cli", "reset", "--dry-run", "--settle-ms", "0", "--expect", "2"]).unwrap();
    let Command::Reset { dry_run, settle_ms, expect, json } = cli.command else { panic!("expected reset") };
    assert!(dry_run);
    assert_eq!(settle_ms, 0);
    assert_eq!(expect, 2);
    assert!(!json);
}

#[test]
fn devices_exit_code_fails_only_on_empty_probe() {
    let found = vec!["/dev/video0".to_owned()];
    let unsupported = reset::ResetError::Unsupported("video device probing");
    assert_eq!(devices_exit_code(Ok(&[])), ExitCode::FAILURE);
    assert_eq!(devices_exit_code(Ok(&found)), ExitCode::SUCCESS);
    assert_eq!(devices_exit_code(Err(&unsupported)), ExitCode::SUCCESS);
}
