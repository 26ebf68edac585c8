use assert_cmd::cmd::Command;

#[allow(dead_code)]
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// The binary with both credential variables cleared, so nothing reaches
/// the network by accident.
pub fn make_cli() -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).expect("Failed to find binary");
    cmd.env_remove("GOOGLE_USER").env_remove("GOOGLE_PASSWORD");
    cmd
}
