//! Captcha solvers available to the operator CLI.

use std::path::PathBuf;

use ceac_portal::{normalize_guess, CaptchaSolver, PortalError, RemoteCaptchaSolver};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

/// Operator-in-the-loop solver: saves each captcha to `image_path` and reads
/// the guess from a line of input.
pub(crate) struct ManualCaptchaSolver<R> {
    image_path: PathBuf,
    input: Mutex<R>,
}

impl ManualCaptchaSolver<BufReader<tokio::io::Stdin>> {
    pub(crate) fn from_stdin(image_path: PathBuf) -> Self {
        Self::new(image_path, BufReader::new(tokio::io::stdin()))
    }
}

impl<R> ManualCaptchaSolver<R> {
    pub(crate) fn new(image_path: PathBuf, input: R) -> Self {
        Self {
            image_path,
            input: Mutex::new(input),
        }
    }
}

fn manual_error(reason: impl Into<String>) -> PortalError {
    PortalError::Captcha {
        reason: reason.into(),
    }
}

impl<R: AsyncBufRead + Unpin + Send> CaptchaSolver for ManualCaptchaSolver<R> {
    async fn predict(&self, image: &[u8]) -> Result<String, PortalError> {
        tokio::fs::write(&self.image_path, image)
            .await
            .map_err(|e| manual_error(format!("writing {}: {e}", self.image_path.display())))?;
        eprintln!(
            "captcha saved to {}; type the code and press enter:",
            self.image_path.display()
        );

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .map_err(|e| manual_error(format!("reading guess: {e}")))?;
        if read == 0 {
            return Err(manual_error("input closed before a guess was entered"));
        }
        Ok(normalize_guess(&line))
    }
}

/// The solver selected on the command line.
pub(crate) enum CliSolver {
    Remote(RemoteCaptchaSolver),
    Manual(ManualCaptchaSolver<BufReader<tokio::io::Stdin>>),
}

impl CaptchaSolver for CliSolver {
    async fn predict(&self, image: &[u8]) -> Result<String, PortalError> {
        match self {
            Self::Remote(solver) => solver.predict(image).await,
            Self::Manual(solver) => solver.predict(image).await,
        }
    }
}
