use anyhow::{Context, Result};

/// Destination for the optional "copy URL" side effect.
pub trait ClipboardSink: Send + Sync {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// The desktop clipboard.
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
        clipboard
            .set_text(text.to_owned())
            .context("failed to write to clipboard")
    }
}
