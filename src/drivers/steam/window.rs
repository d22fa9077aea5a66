//! Win32 window handling for "minimize to tray"

use anyhow::{bail, Context, Result};
use windows::core::{HSTRING, PCWSTR};
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{FindWindowW, PostMessageW, WM_CLOSE};

/// Post `WM_CLOSE` to the top-level window titled `title`
///
/// Steam treats closing its main window as "hide to tray".
pub(super) fn close_window(title: &str) -> Result<()> {
    let title = HSTRING::from(title);

    // SAFETY: `title` outlives the call and a null class name is allowed.
    let hwnd = unsafe { FindWindowW(PCWSTR::null(), &title) };
    if hwnd.0 == 0 {
        bail!("No window titled '{}'", title);
    }

    // SAFETY: `hwnd` was just returned by FindWindowW; posting to a window
    // that has since closed fails cleanly.
    unsafe { PostMessageW(hwnd, WM_CLOSE, WPARAM(0), LPARAM(0)) }
        .context("PostMessageW(WM_CLOSE) failed")?;

    Ok(())
}
