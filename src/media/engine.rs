// Media engine - owned ffmpeg wrapper plus scoped temp workspace

use super::NormalizationError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::OnceCell;

const STDERR_SUFFIX_LEN: usize = 400;

/// Wrapper around the `ffmpeg` binary.
///
/// One instance per process, owned by the media processor and verified
/// lazily on first use. Runs are never concurrent with each other, so no
/// locking is needed beyond the one-time verification.
pub struct MediaEngine {
    binary: PathBuf,
    verified: OnceCell<()>,
}

impl MediaEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            verified: OnceCell::new(),
        }
    }

    /// Binary path from `FFMPEG_PATH`, falling back to `ffmpeg` on PATH.
    pub fn from_env() -> Self {
        let binary = std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());
        Self::new(binary)
    }

    /// Verify the binary once per process by probing `-version`.
    pub async fn ensure_ready(&self) -> Result<(), NormalizationError> {
        self.verified
            .get_or_try_init(|| async {
                let status = Command::new(&self.binary)
                    .arg("-version")
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await
                    .map_err(|e| {
                        NormalizationError::EngineInit(format!(
                            "{}: {}",
                            self.binary.display(),
                            e
                        ))
                    })?;

                if !status.success() {
                    return Err(NormalizationError::EngineInit(format!(
                        "{} exited with {}",
                        self.binary.display(),
                        status
                    )));
                }

                tracing::info!("Media engine ready: {}", self.binary.display());
                Ok(())
            })
            .await
            .copied()
    }

    /// Run one transform command inside `dir`.
    pub async fn run(&self, args: &[&str], dir: &Path) -> Result<(), NormalizationError> {
        self.ensure_ready().await?;

        tracing::debug!("Running media transform: {}", args.join(" "));

        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::null())
            .output()
            .await
            .map_err(|e| NormalizationError::EngineInit(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut suffix_start = stderr.len().saturating_sub(STDERR_SUFFIX_LEN);
            while !stderr.is_char_boundary(suffix_start) {
                suffix_start += 1;
            }
            return Err(NormalizationError::CommandFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: stderr[suffix_start..].to_string(),
            });
        }

        Ok(())
    }
}

/// Scoped workspace for one transform.
///
/// The backing temp directory is removed when the workspace drops, on
/// success and failure paths alike.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn create() -> Result<Self, NormalizationError> {
        let dir = tempfile::Builder::new()
            .prefix("sessionscribe-")
            .tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), NormalizationError> {
        tokio::fs::write(self.dir.path().join(name), bytes).await?;
        Ok(())
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>, NormalizationError> {
        Ok(tokio::fs::read(self.dir.path().join(name)).await?)
    }

    pub async fn exists(&self, name: &str) -> bool {
        tokio::fs::try_exists(self.dir.path().join(name))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn workspace_round_trips_files_and_cleans_up_on_drop() {
        let workspace = Workspace::create().unwrap();
        let dir = workspace.path().to_path_buf();

        workspace.write("probe.bin", &[1, 2, 3]).await.unwrap();
        assert!(workspace.exists("probe.bin").await);
        assert_eq!(workspace.read("probe.bin").await.unwrap(), vec![1, 2, 3]);
        assert!(!workspace.exists("missing.bin").await);

        drop(workspace);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn missing_binary_fails_initialization() {
        let engine = MediaEngine::new("/nonexistent/sessionscribe-ffmpeg");
        let err = engine.ensure_ready().await.unwrap_err();
        assert!(matches!(err, NormalizationError::EngineInit(_)));
    }
}
