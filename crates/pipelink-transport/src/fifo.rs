use std::fs::{File, OpenOptions};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{ChannelError, Result};
use crate::stream::ByteChannel;

/// A channel whose two directions are separate named pipes.
pub type FifoChannel = ByteChannel<File, File>;

/// Open an existing FIFO for reading and another for writing.
///
/// Opening a FIFO blocks until the other end is opened too. Two processes
/// given crossed paths (`A.input == B.output`, `A.output == B.input`) would
/// deadlock if both opened their input first, so the input is opened on a
/// helper thread while the output is opened on the calling thread.
///
/// Neither path is created here: both must already exist and be FIFOs.
pub fn open_fifo_pair(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<FifoChannel> {
    let input = input.as_ref().to_path_buf();
    let output = output.as_ref().to_path_buf();

    ensure_fifo(&input)?;
    ensure_fifo(&output)?;

    let reader_path = input.clone();
    let opener = thread::Builder::new()
        .name("pipelink-fifo-open".to_string())
        .spawn(move || open_end(&reader_path, Direction::Read))?;

    debug!(path = ?output, "opening output fifo");
    let writer = match open_end(&output, Direction::Write) {
        Ok(file) => file,
        Err(err) => {
            release_opener(&input, opener);
            return Err(err);
        }
    };

    let reader = opener.join().map_err(|_| {
        ChannelError::Io(std::io::Error::other("fifo opener thread panicked"))
    })??;

    info!(input = ?input, output = ?output, "fifo channel open");
    Ok(ByteChannel::new(reader, writer))
}

const RELEASE_ATTEMPTS: u32 = 50;
const RELEASE_RETRY: Duration = Duration::from_millis(2);

/// Wake an opener still parked in `open(2)` on `path` and reap it.
///
/// A non-blocking open for writing completes the reader's rendezvous without
/// waiting; it fails with `ENXIO` until the opener has reached `open(2)`, so
/// it is retried for a bounded time. Returns whether the thread was reaped.
fn release_opener(path: &Path, opener: JoinHandle<Result<File>>) -> bool {
    for _ in 0..RELEASE_ATTEMPTS {
        if opener.is_finished() {
            break;
        }
        let waker = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path);
        drop(waker);
        thread::sleep(RELEASE_RETRY);
    }

    if opener.is_finished() {
        // The reader it produced, if any, is dropped here.
        let _ = opener.join();
        debug!(?path, "fifo opener released");
        true
    } else {
        warn!(?path, "fifo opener still blocked, leaving it detached");
        false
    }
}

#[derive(Clone, Copy, Debug)]
enum Direction {
    Read,
    Write,
}

fn open_end(path: &Path, direction: Direction) -> Result<File> {
    let mut options = OpenOptions::new();
    match direction {
        Direction::Read => options.read(true),
        Direction::Write => options.write(true),
    };
    let file = options.open(path).map_err(|source| ChannelError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(?path, ?direction, "fifo end open");
    Ok(file)
}

fn ensure_fifo(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|source| ChannelError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.file_type().is_fifo() {
        return Err(ChannelError::NotAFifo {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
