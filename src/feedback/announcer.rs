use crate::config::{AnnouncerKind, FeedbackConfig};
use crate::error::{RepcamError, Result};

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Speaks or prints feedback text. Returns once the text has been delivered.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, text: &str) -> Result<()>;

    /// Get the name of this announcer for logging
    fn name(&self) -> &str;
}

/// Writes announcements to the log
#[derive(Debug, Default)]
pub struct LogAnnouncer;

#[async_trait]
impl Announcer for LogAnnouncer {
    async fn announce(&self, text: &str) -> Result<()> {
        info!(announcement = text, "Announcing");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Prints each announcement on its own line on stdout
#[derive(Debug, Default)]
pub struct StdoutAnnouncer;

#[async_trait]
impl Announcer for StdoutAnnouncer {
    async fn announce(&self, text: &str) -> Result<()> {
        println!("{}", text);
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

/// Hands each announcement to an external speech program, e.g. `espeak`.
///
/// Announcements play one at a time in call order: each call waits for the
/// previous speech process to exit before starting its own.
#[derive(Debug)]
pub struct CommandAnnouncer {
    program: String,
    args: Vec<String>,
    speaking: Mutex<()>,
}

impl CommandAnnouncer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            speaking: Mutex::new(()),
        }
    }
}

#[async_trait]
impl Announcer for CommandAnnouncer {
    async fn announce(&self, text: &str) -> Result<()> {
        let _speaking = self.speaking.lock().await;
        debug!("Spawning '{}' to speak '{}'", self.program, text);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| RepcamError::Component {
                component: "command_announcer".to_string(),
                message: format!("failed to spawn '{}': {}", self.program, e),
            })?;

        match child.wait().await {
            Ok(status) if !status.success() => {
                warn!("Speech command '{}' exited with {}", self.program, status);
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to wait for speech command '{}': {}", self.program, e),
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Build the announcer selected in the feedback configuration
pub fn announcer_from_config(config: &FeedbackConfig) -> Arc<dyn Announcer> {
    match config.announcer {
        AnnouncerKind::Log => Arc::new(LogAnnouncer),
        AnnouncerKind::Stdout => Arc::new(StdoutAnnouncer),
        AnnouncerKind::Command => Arc::new(CommandAnnouncer::new(
            config.command.clone(),
            config.command_args.clone(),
        )),
    }
}
