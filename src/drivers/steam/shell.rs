//! Thin wrappers around the Windows command-line tools the driver shells out to

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::trace;

/// Hide the console window that would otherwise flash up for every command
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Run a program to completion and return its stdout
pub(super) async fn run(program: &str, args: &[&str]) -> Result<String> {
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    trace!(program, ?args, "Running command");

    let output = cmd
        .output()
        .await
        .with_context(|| format!("Failed to spawn `{}`", program))?;

    if !output.status.success() {
        bail!(
            "`{} {}` exited with {}: {}",
            program,
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Hand a target (URI or executable) to the shell's `start` builtin
pub(super) async fn start(target: &str) -> Result<()> {
    run("cmd", &["/C", "start", "", target]).await.map(|_| ())
}

/// Run a PowerShell snippet and return its trimmed output
pub(super) async fn powershell(script: &str) -> Result<String> {
    let stdout = run("powershell", &["-NoProfile", "-NonInteractive", "-Command", script]).await?;
    Ok(stdout.trim().to_string())
}

/// Whether `tasklist` output lists `process_name`
///
/// `tasklist` prints an informational line (and exits 0) when no process
/// matches the filter, so the output has to be searched.
pub(super) fn tasklist_contains(stdout: &str, process_name: &str) -> bool {
    stdout
        .to_lowercase()
        .contains(&process_name.to_lowercase())
}

/// Extract a `REG_SZ` value from `reg query <key> /v <value>` output
pub(super) fn parse_reg_sz(stdout: &str, value_name: &str) -> Option<PathBuf> {
    stdout.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let name = parts.next()?;
        if !name.eq_ignore_ascii_case(value_name) {
            return None;
        }
        if !parts.next()?.eq_ignore_ascii_case("REG_SZ") {
            return None;
        }
        let value = parts.collect::<Vec<_>>().join(" ");
        if value.is_empty() {
            None
        } else {
            Some(PathBuf::from(value))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reg_sz_with_spaces() {
        let stdout = "\r\nHKEY_CURRENT_USER\\Software\\Valve\\Steam\r\n    SteamExe    REG_SZ    c:/program files (x86)/steam/steam.exe\r\n\r\n";
        assert_eq!(
            parse_reg_sz(stdout, "SteamExe"),
            Some(PathBuf::from("c:/program files (x86)/steam/steam.exe"))
        );
    }

    #[test]
    fn test_parse_reg_sz_missing_value() {
        let stdout = "HKEY_CURRENT_USER\\Software\\Valve\\Steam\r\n    SteamPath    REG_SZ    c:/steam\r\n";
        assert_eq!(parse_reg_sz(stdout, "SteamExe"), None);
        assert_eq!(parse_reg_sz("", "SteamExe"), None);
    }

    #[test]
    fn test_tasklist_contains() {
        let running = "steam.exe                    12345 Console                    1    150,000 K\r\n";
        let absent = "INFO: No tasks are running which match the specified criteria.\r\n";
        assert!(tasklist_contains(running, "Steam.exe"));
        assert!(!tasklist_contains(absent, "steam.exe"));
    }
}
