//! Host identity, resolved once per process.

use std::ffi::OsString;
use std::io;
use std::sync::OnceLock;

static HOSTNAME: OnceLock<String> = OnceLock::new();

const FALLBACK: &str = "localhost";

/// Returns the host name recorded on every log entry.
///
/// Asks the OS through `hostname::get`; `localhost` is used only if that
/// fails or yields an empty name. The first call fixes the value for the
/// process.
#[must_use]
pub fn hostname() -> &'static str {
    HOSTNAME.get_or_init(|| resolve(::hostname::get()))
}

fn resolve(found: io::Result<OsString>) -> String {
    match found {
        Ok(name) => {
            let name = name.to_string_lossy().trim().to_string();
            if name.is_empty() {
                FALLBACK.to_string()
            } else {
                name
            }
        }
        Err(err) => {
            tracing::debug!(error = %err, "host name lookup failed, using {FALLBACK}");
            FALLBACK.to_string()
        }
    }
}
