//! System clipboard backed by `arboard`.

use super::{Clipboard, HostError};
use log::{debug, warn};

/// Writes to the OS clipboard.
///
/// The clipboard connection is opened lazily per write so a headless
/// session only fails the write, not construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), HostError> {
        let result = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text));
        match result {
            Ok(()) => {
                debug!(
                    "event=clipboard_write module=host status=ok chars={}",
                    text.chars().count()
                );
                Ok(())
            }
            Err(err) => {
                warn!("event=clipboard_write module=host status=error error={err}");
                Err(HostError::Clipboard(err.to_string()))
            }
        }
    }
}
