use std::io::{BufRead, Write};
use std::thread;

use pipelink_frame::FrameConfig;
use pipelink_session::{SessionConfig, SessionError, SessionSender};
use tracing::{debug, info, warn};

use crate::cmd::PeerArgs;
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: PeerArgs, format: OutputFormat) -> CliResult<i32> {
    if args.max_frame_size == 0 {
        return Err(CliError::new(USAGE, "--max-frame-size must be at least 1"));
    }

    let config = SessionConfig {
        frame: FrameConfig {
            max_frame_size: args.max_frame_size,
            ..FrameConfig::default()
        },
        await_first_frame: args.await_first_frame,
        label: args.label,
    };
    connect_and_run(args.input, args.output, config, args.count, format)
}

#[cfg(unix)]
fn connect_and_run(
    input: std::path::PathBuf,
    output: std::path::PathBuf,
    config: SessionConfig,
    count: Option<u64>,
    format: OutputFormat,
) -> CliResult<i32> {
    let session = pipelink_session::connect_fifo_with_config(&input, &output, config)
        .map_err(|err| session_error("connect failed", err))?;
    let label = session.label().to_string();
    let (mut receiver, sender) = session.split();

    // Not joined: once the peer is gone the process exits even if stdin is still open.
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || pump_stdin(sender, std::io::stdin().lock()))
        .map_err(|err| crate::exit::io_error("failed to start stdin reader", err))?;

    let mut received = 0u64;
    loop {
        if count.is_some_and(|limit| received >= limit) {
            info!(session = %label, received, "message count reached");
            return Ok(SUCCESS);
        }
        match receiver.receive() {
            Ok(message) => {
                print_message(message.as_ref(), &label, received, format);
                received += 1;
            }
            Err(SessionError::PeerClosed) => {
                info!(session = %label, received, "peer closed, exiting");
                return Ok(SUCCESS);
            }
            Err(err) => return Err(session_error("receive failed", err)),
        }
    }
}

#[cfg(not(unix))]
fn connect_and_run(
    _input: std::path::PathBuf,
    _output: std::path::PathBuf,
    _config: SessionConfig,
    _count: Option<u64>,
    _format: OutputFormat,
) -> CliResult<i32> {
    Err(CliError::new(
        USAGE,
        "fifo sessions are only supported on unix platforms",
    ))
}

/// Send each input line (without its terminator) as one message, then
/// half-close so the peer sees a clean end of stream.
fn pump_stdin<W: Write>(mut sender: SessionSender<W>, input: impl BufRead) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "stdin read failed");
                break;
            }
        };
        if let Err(err) = sender.wait_established() {
            warn!(error = %err, "session ended before it was established");
            return;
        }
        if let Err(err) = sender.send(line.as_bytes()) {
            warn!(error = %err, "send failed, no longer reading stdin");
            return;
        }
    }

    debug!("stdin closed, closing send direction");
    if let Err(err) = sender.close() {
        warn!(error = %err, "close failed");
    }
}
