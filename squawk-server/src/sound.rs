//! Audible cue sinks.
//!
//! Cues are fire-and-forget: an external player is spawned and left to run,
//! and the terminal bell is a single write. Failures come back as
//! `SoundError` for the dispatcher to log.

use std::io::Write;
use std::process::Stdio;

use async_trait::async_trait;

use squawk_core::types::SoundError;

/// Accepts an opaque alert token (a sound file path for `CommandCue`).
#[async_trait]
pub trait CueSink: Send + Sync {
    async fn play(&self, token: &str) -> Result<(), SoundError>;
}

/// Rings the terminal bell on stderr.
pub struct BellCue;

#[async_trait]
impl CueSink for BellCue {
    async fn play(&self, _token: &str) -> Result<(), SoundError> {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(())
    }
}

/// Spawns `<program> [args..] <token>` and does not wait for it.
pub struct CommandCue {
    program: String,
    args: Vec<String>,
}

impl CommandCue {
    /// Split a player command line such as `"mpg123 -q"` on whitespace.
    pub fn new(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(CommandCue {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl CueSink for CommandCue {
    async fn play(&self, token: &str) -> Result<(), SoundError> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(token)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SoundError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Reap in the background so the player never becomes a zombie
        let program = self.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    tracing::warn!(%program, %status, "alert player exited with failure");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(%program, error = %e, "alert player wait failed"),
            }
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
