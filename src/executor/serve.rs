//! Newline-delimited JSON front end for one worker
//!
//! Each non-blank input line is a `LaunchRequest`. Every one of them is
//! answered with the run's status messages, one JSON object per line,
//! ending in exactly one `finished`.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use super::worker::{WorkerError, WorkerHandle};
use crate::protocol::{LaunchRequest, StatusMessage};

/// Serve requests from `input` until it closes. Returns how many lines were answered.
pub async fn serve_lines<R, W>(worker: &WorkerHandle, input: R, output: &mut W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut answered = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        answered += 1;

        let request = match LaunchRequest::from_json(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected launch request: {}", e);
                let reply = StatusMessage::finished(Some(format!("invalid launch request: {e}")));
                emit(output, &reply).await?;
                continue;
            }
        };

        info!("Launching {}", request);
        let mut run = match worker.launch(request) {
            Ok(run) => run,
            Err(e) => {
                warn!("Could not launch on worker {}: {}", worker.id(), e);
                emit(output, &StatusMessage::finished(Some(e.to_string()))).await?;
                continue;
            }
        };

        let mut finished = false;
        while let Some(message) = run.next().await {
            finished = message.is_terminal();
            emit(output, &message).await?;
        }
        if !finished {
            let lost = WorkerError::Disconnected(worker.id()).to_string();
            emit(output, &StatusMessage::finished(Some(lost))).await?;
        }
    }

    info!("Input closed after {} requests", answered);
    Ok(answered)
}

async fn emit<W>(output: &mut W, message: &StatusMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = message.to_json().context("Failed to encode status message")?;
    line.push('\n');
    output
        .write_all(line.as_bytes())
        .await
        .context("Failed to write output")?;
    output.flush().await.context("Failed to flush output")?;
    Ok(())
}
