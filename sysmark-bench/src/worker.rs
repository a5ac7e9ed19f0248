// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Line protocol spoken between the trial runner and process units.
//!
//! ```text
//! child  -> READY                    warm-up done
//! parent -> GO                       clock started
//! child  -> DONE <items>             measured pass done
//! child  -> ERROR <kind> <message>   either pass failed
//! ```

use std::io::{BufRead, Write};

use thiserror::Error;

use sysmark_core::{CancelToken, ErrorKind, UnitContext, UnitPhase, Workload, WorkloadError};

const READY: &str = "READY";
const GO: &str = "GO";
const DONE: &str = "DONE";
const ERROR: &str = "ERROR";

/// Line written by the parent to release a unit.
pub const GO_LINE: &str = "GO\n";

/// Errors on the protocol channel itself, as opposed to workload failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unexpected protocol line: {line:?}")]
    Unexpected { line: String },

    #[error("Stream closed while waiting for {expected}")]
    Closed { expected: &'static str },

    #[error("Protocol I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A message sent by a process unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    Ready,
    Done(u64),
    Failed(WorkloadError),
}

impl WorkerMessage {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        let unexpected = || ProtocolError::Unexpected {
            line: line.to_string(),
        };

        let mut parts = line.splitn(3, ' ');
        match parts.next() {
            Some(READY) if parts.next().is_none() => Ok(Self::Ready),
            Some(DONE) => {
                let items = parts
                    .next()
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(unexpected)?;
                Ok(Self::Done(items))
            }
            Some(ERROR) => {
                let kind = parts
                    .next()
                    .and_then(ErrorKind::from_name)
                    .ok_or_else(unexpected)?;
                let message = parts.next().unwrap_or_default();
                Ok(Self::Failed(WorkloadError::from_kind(kind, message)))
            }
            _ => Err(unexpected()),
        }
    }

    /// Encode as a single newline-terminated line.
    pub fn to_line(&self) -> String {
        match self {
            Self::Ready => format!("{}\n", READY),
            Self::Done(items) => format!("{} {}\n", DONE, items),
            Self::Failed(err) => {
                let detail = err.detail().replace(['\n', '\r'], " ");
                format!("{} {} {}\n", ERROR, err.kind(), detail)
            }
        }
    }
}

fn send<W: Write>(output: &mut W, message: &WorkerMessage) -> Result<(), ProtocolError> {
    output.write_all(message.to_line().as_bytes())?;
    output.flush()?;
    Ok(())
}

/// Run one process unit: warm up, report ready, wait for `GO`, run the
/// measured pass and report its item count.
///
/// Workload failures are reported over the channel and return `Ok`; only a
/// broken channel is an error.
pub fn serve<R, W>(
    workload: &dyn Workload,
    size: u64,
    mut input: R,
    mut output: W,
) -> Result<(), ProtocolError>
where
    R: BufRead,
    W: Write,
{
    let ctx = UnitContext::new(0, UnitPhase::WarmUp, CancelToken::new(), None);

    if let Err(err) = workload.run(size, &ctx) {
        tracing::debug!(workload = %workload.id(), error = %err, "Warm-up failed");
        return send(&mut output, &WorkerMessage::Failed(err));
    }
    send(&mut output, &WorkerMessage::Ready)?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(ProtocolError::Closed { expected: GO });
    }
    if line.trim() != GO {
        return Err(ProtocolError::Unexpected { line });
    }

    let reply = match workload.run(size, &ctx.measured()) {
        Ok(items) => WorkerMessage::Done(items),
        Err(err) => WorkerMessage::Failed(err),
    };
    send(&mut output, &reply)
}
