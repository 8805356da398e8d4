//! Copy engine (`spec.md` §4.9): bidirectional stream pump. Grounded on
//! `examples/original_source/utils/netx/netx.go` (`timedCopy`) and the
//! teacher's `shadowsocks-service` tunnel server's `future::select_all`
//! join pattern (`local/tunnel/server.rs`).

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use futures::FutureExt;
use log::{error, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

const COPY_CHUNK_SIZE: usize = 16 * 1024;

/// Copy from `src` to `dst` in fixed-size chunks until EOF or error. A
/// short write is treated as an error, per `spec.md` §4.9.
pub async fn copy<R, W>(mut src: R, mut dst: W) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = src.read(&mut buf).await?;
        if n == 0 {
            dst.flush().await?;
            return Ok(total);
        }
        dst.write_all(&buf[..n]).await?;
        total += n as u64;
    }
}

/// Run `fut` inside `tokio::spawn`, catching panics so a misbehaving
/// plugin never tears down the process (`spec.md` §5 "Cancellation",
/// §7 "Panic (from untrusted plugin code)").
pub fn spawn_guarded<F>(fut: F) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = std::io::Result<u64>> + Send + 'static,
{
    tokio::spawn(async move {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(_bytes)) => {}
            Ok(Err(e)) => warn!("duplex copy task ended with error: {e}"),
            Err(_panic) => error!("duplex copy task panicked; recovered at task boundary"),
        }
    })
}

/// Boxed future returned by [`AsyncCopyRead`]/[`AsyncCopyWrite`] methods —
/// the hand-written equivalent of what an `async fn` in a trait desugars
/// to, since this workspace has no caller left for the `async-trait`
/// macro (see `DESIGN.md` Trim notes).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A readable half usable as one side of [`duplex_copy`]. Implemented
/// directly by any `AsyncRead` type and, separately, by types that only
/// expose an async-method API (e.g. `Decorator`'s `split_decorator`).
pub trait AsyncCopyRead: Send {
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> BoxFuture<'a, std::io::Result<usize>>;
}

/// A writable half usable as one side of [`duplex_copy`].
pub trait AsyncCopyWrite: Send {
    fn write_all<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, std::io::Result<()>>;
    fn flush<'a>(&'a mut self) -> BoxFuture<'a, std::io::Result<()>>;
}

impl<T: AsyncRead + Unpin + Send> AsyncCopyRead for T {
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> BoxFuture<'a, std::io::Result<usize>> {
        Box::pin(AsyncReadExt::read(self, buf))
    }
}

impl<T: AsyncWrite + Unpin + Send> AsyncCopyWrite for T {
    fn write_all<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, std::io::Result<()>> {
        Box::pin(AsyncWriteExt::write_all(self, buf))
    }

    fn flush<'a>(&'a mut self) -> BoxFuture<'a, std::io::Result<()>> {
        Box::pin(AsyncWriteExt::flush(self))
    }
}

/// Copy `src -> dst` until EOF, error, or `cancel` fires, in which case
/// the pending read is abandoned immediately rather than waited out —
/// the "immediate read deadline" `spec.md` §4.9 names.
async fn copy_cancelable<R, W>(mut src: R, mut dst: W, mut cancel: watch::Receiver<bool>) -> std::io::Result<u64>
where
    R: AsyncCopyRead,
    W: AsyncCopyWrite,
{
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        if *cancel.borrow() {
            dst.flush().await?;
            return Ok(total);
        }

        tokio::select! {
            biased;
            _ = cancel.changed() => {
                dst.flush().await?;
                return Ok(total);
            }
            result = src.read(&mut buf) => {
                let n = result?;
                if n == 0 {
                    dst.flush().await?;
                    return Ok(total);
                }
                dst.write_all(&buf[..n]).await?;
                total += n as u64;
            }
        }
    }
}

/// Run one direction of [`duplex_copy`] and arm the shared cancellation
/// signal once it ends, regardless of outcome, so the peer direction
/// never waits on a read that will never be satisfied.
async fn run_direction<R, W>(src: R, dst: W, cancel_rx: watch::Receiver<bool>, cancel_tx: watch::Sender<bool>) -> std::io::Result<u64>
where
    R: AsyncCopyRead,
    W: AsyncCopyWrite,
{
    let result = copy_cancelable(src, dst, cancel_rx).await;
    let _ = cancel_tx.send(true);
    result
}

/// Full-duplex pump over two already-split endpoints (`spec.md` §4.9):
/// spawns one background task to copy `right ← left` (reads
/// `left_read`, writes `right_write`) and runs `left ← right` on the
/// caller (reads `right_read`, writes `left_write`). On exit from
/// either direction — EOF, error, or the other direction's own exit —
/// an immediate read deadline is armed on both ends via a shared
/// cancellation signal, so neither side is left blocked on data that
/// will never arrive; the two tasks are then joined. Returns
/// `(left_to_right_bytes, right_to_left_bytes)`.
pub async fn duplex_copy<LR, LW, RR, RW>(left_read: LR, left_write: LW, right_read: RR, right_write: RW) -> std::io::Result<(u64, u64)>
where
    LR: AsyncCopyRead + Send + 'static,
    LW: AsyncCopyWrite + Send + 'static,
    RR: AsyncCopyRead + Send + 'static,
    RW: AsyncCopyWrite + Send + 'static,
{
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let background_tx = cancel_tx.clone();
    let background_rx = cancel_rx.clone();

    let background = tokio::spawn(run_direction(left_read, right_write, background_rx, background_tx));

    let right_to_left = run_direction(right_read, left_write, cancel_rx, cancel_tx).await;

    let left_to_right = background
        .await
        .unwrap_or_else(|join_err| Err(std::io::Error::new(std::io::ErrorKind::Other, join_err)));

    Ok((left_to_right?, right_to_left?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::duplex;

    #[tokio::test]
    async fn copy_moves_all_bytes_and_reports_total() {
        let (mut writer_side, reader_side) = duplex(64);
        let (read_half, write_half) = tokio::io::split(reader_side);

        let copy_task = tokio::spawn(copy(read_half, write_half));
        writer_side.write_all(b"payload").await.unwrap();
        drop(writer_side);

        let total = copy_task.await.unwrap().unwrap();
        assert_eq!(total, 7);
    }

    #[tokio::test]
    async fn spawn_guarded_survives_a_panicking_future() {
        let handle = spawn_guarded(async { panic!("simulated plugin panic") });
        // Must not propagate: the guard swallows it.
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn duplex_copy_forwards_both_directions_then_completes_on_close() {
        let (mut left_outer, left_inner) = duplex(64);
        let (mut right_outer, right_inner) = duplex(64);

        let (left_read, left_write) = tokio::io::split(left_inner);
        let (right_read, right_write) = tokio::io::split(right_inner);

        let handle = tokio::spawn(duplex_copy(left_read, left_write, right_read, right_write));

        left_outer.write_all(b"to-right").await.unwrap();
        let mut buf = [0u8; 8];
        right_outer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"to-right");

        right_outer.write_all(b"to-left!").await.unwrap();
        let mut buf2 = [0u8; 8];
        left_outer.read_exact(&mut buf2).await.unwrap();
        assert_eq!(&buf2, b"to-left!");

        drop(left_outer);
        drop(right_outer);

        let (left_to_right, right_to_left) = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("duplex_copy must finish once both sides close")
            .unwrap()
            .unwrap();
        assert_eq!(left_to_right, 8);
        assert_eq!(right_to_left, 8);
    }

    /// "Duplex shutdown" (`spec.md` §8): closing one end must cause the
    /// other direction to return promptly, not hang waiting for more
    /// data from a peer that is still open and willing to send.
    #[tokio::test]
    async fn duplex_shutdown_unblocks_the_other_direction_promptly() {
        let (left_outer, left_inner) = duplex(64);
        let (right_outer, right_inner) = duplex(64);

        let (left_read, left_write) = tokio::io::split(left_inner);
        let (right_read, right_write) = tokio::io::split(right_inner);

        let handle = tokio::spawn(duplex_copy(left_read, left_write, right_read, right_write));

        // Drop only the left side. right_outer stays open, so without the
        // shared cancellation signal the right_to_left direction would
        // block forever waiting for right_outer to send or close.
        drop(left_outer);

        let (left_to_right, right_to_left) = tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("duplex_copy must return promptly once one side closes, not leak the background task")
            .unwrap()
            .unwrap();

        assert_eq!(left_to_right, 0);
        assert_eq!(right_to_left, 0);
        drop(right_outer);
    }
}
