//! Clipboard over the OSC 52 terminal escape sequence.
//!
//! Most modern terminals (and tmux with `set-clipboard on`) accept
//! `ESC ] 52 ; c ; <base64> BEL` and place the payload on the system
//! clipboard. Terminals that ignore it give no error back, so a successful
//! write only means the sequence was sent.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use pinbazaar_storefront::checkout::{Clipboard, ClipboardError};

/// Writes OSC 52 sequences to a terminal.
pub struct Osc52Clipboard<W> {
    out: Mutex<W>,
}

impl Osc52Clipboard<std::io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Osc52Clipboard<W> {
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// The escape sequence that copies `text`.
fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

#[async_trait]
impl<W: Write + Send> Clipboard for Osc52Clipboard<W> {
    async fn copy(&self, label: &str, text: &str) -> Result<(), ClipboardError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| ClipboardError("terminal writer poisoned".to_string()))?;
        out.write_all(osc52_sequence(text).as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| ClipboardError(e.to_string()))?;
        tracing::debug!(label, "Copied to clipboard");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_encodes_payload() {
        assert_eq!(osc52_sequence("TR33"), "\x1b]52;c;VFIzMw==\x07");
    }

    #[tokio::test]
    async fn test_copy_writes_sequence() {
        let clipboard = Osc52Clipboard::new(Vec::new());
        clipboard.copy("IBAN", "TR33").await.unwrap();
        let written = String::from_utf8(clipboard.into_inner()).unwrap();
        assert_eq!(written, "\x1b]52;c;VFIzMw==\x07");
    }
}
