//! Global command probing

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use tokio::process::Command;
use tracing::trace;

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?").unwrap()
});

/// Runs `<command> --version`
///
/// Implementations return standard output only when the command succeeded,
/// printed something, and wrote nothing to standard error.
#[async_trait]
pub trait CommandProbe: Send + Sync {
    async fn probe(&self, command: &str) -> Option<String>;
}

/// Probes commands on the real `PATH`. No timeout is applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

#[async_trait]
impl CommandProbe for SystemProbe {
    async fn probe(&self, command: &str) -> Option<String> {
        let output = version_command(command).output().await.ok()?;
        trace!(
            "{command} --version -> {:?} (stderr {:?})",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        accept_output(output.status.success(), &output.stdout, &output.stderr)
    }
}

/// The version text of a probe run; the streams are checked untrimmed
fn accept_output(success: bool, stdout: &[u8], stderr: &[u8]) -> Option<String> {
    if !success || stdout.is_empty() || !stderr.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(stdout).trim().to_string())
}

#[cfg(windows)]
fn version_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command, "--version"]);
    cmd
}

#[cfg(not(windows))]
fn version_command(command: &str) -> Command {
    let mut cmd = Command::new(command);
    cmd.arg("--version");
    cmd
}

/// First semantic version found in a `--version` banner
pub fn parse_version(output: &str) -> Option<Version> {
    VERSION_REGEX
        .find(output)
        .and_then(|found| Version::parse(found.as_str()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("3.6.1"), Some(Version::new(3, 6, 1)));
        assert_eq!(parse_version("yarn v1.22.19\n"), Some(Version::new(1, 22, 19)));
        assert_eq!(
            parse_version("4.0.0-rc.42").map(|v| v.to_string()),
            Some("4.0.0-rc.42".to_string())
        );
        assert_eq!(parse_version("unknown"), None);
    }

    #[test]
    fn test_accept_output() {
        assert_eq!(accept_output(true, b"3.6.1\n", b""), Some("3.6.1".to_string()));
        assert_eq!(accept_output(true, b"\n", b""), Some(String::new()));
        assert_eq!(accept_output(true, b"3.6.1\n", b"\n"), None);
        assert_eq!(accept_output(true, b"3.6.1\n", b"warning: deprecated\n"), None);
        assert_eq!(accept_output(true, b"", b""), None);
        assert_eq!(accept_output(false, b"3.6.1\n", b""), None);
    }
}
