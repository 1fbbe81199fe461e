//! Best-effort clipboard copy.
//!
//! Clipboard failures never propagate into the pipeline; they are logged
//! and forgotten.

/// Copy `text` to the system clipboard on a dedicated thread.
///
/// arboard's Clipboard is not Send, so the copy runs on its own thread.
/// On Linux/X11 the thread lingers until another application takes
/// clipboard ownership, otherwise the selection would vanish with it.
pub fn copy_text(text: &str) {
    let text = text.to_string();

    std::thread::spawn(move || {
        let mut clipboard = match arboard::Clipboard::new() {
            Ok(c) => c,
            Err(e) => {
                log::warn!("clipboard access failed: {}", e);
                return;
            }
        };

        if let Err(e) = clipboard.set_text(&text) {
            log::warn!("clipboard set failed: {}", e);
            return;
        }

        log::info!("copied {} chars to clipboard", text.len());

        #[cfg(target_os = "linux")]
        {
            use std::time::{Duration, Instant};
            let start = Instant::now();
            let timeout = Duration::from_secs(30);

            while start.elapsed() < timeout {
                std::thread::sleep(Duration::from_millis(100));
                match clipboard.get_text() {
                    Ok(current) if current == text => {}
                    _ => {
                        log::debug!("clipboard ownership transferred");
                        break;
                    }
                }
            }
        }
    });
}
