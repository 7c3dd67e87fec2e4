//! Scoped use of the capture bridge and payload decoding.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::host::CaptureBridge;
use crate::{Result, ThreadmarkError};

/// Installed capture bridge. The host primitives are restored when the guard
/// drops, whether the capture arrived, timed out or the future was dropped.
pub struct CaptureScope<'a, B: CaptureBridge + ?Sized> {
    bridge: &'a mut B,
}

impl<'a, B: CaptureBridge + ?Sized> CaptureScope<'a, B> {
    pub fn install(bridge: &'a mut B) -> Result<Self> {
        bridge.install()?;
        Ok(Self { bridge })
    }

    /// Wait for the intercepted payload and decode it.
    pub async fn await_capture(&mut self, timeout: Duration) -> Result<String> {
        let raw = self
            .bridge
            .await_capture(timeout)
            .await
            .ok_or(ThreadmarkError::CaptureTimeout { timeout_ms: timeout.as_millis() as u64 })?;
        decode_payload(&raw)
    }
}

impl<B: CaptureBridge + ?Sized> Drop for CaptureScope<'_, B> {
    fn drop(&mut self) {
        self.bridge.uninstall();
    }
}

/// Decode a captured payload: `data:` URIs (base64 or percent-encoded) or
/// plain text.
pub fn decode_payload(raw: &str) -> Result<String> {
    let Some(uri) = raw.trim_start().strip_prefix("data:") else {
        return Ok(raw.to_string());
    };
    let (meta, data) = uri
        .split_once(',')
        .ok_or_else(|| ThreadmarkError::Decode("data URI without payload".to_string()))?;

    if meta.ends_with(";base64") {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| ThreadmarkError::Decode(e.to_string()))?;
        return String::from_utf8(bytes).map_err(|e| ThreadmarkError::Decode(e.to_string()));
    }

    urlencoding::decode(data)
        .map(|text| text.into_owned())
        .map_err(|e| ThreadmarkError::Decode(e.to_string()))
}
