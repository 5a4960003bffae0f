use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Stops the ticker thread when stopped explicitly or dropped.
pub struct RefreshHandle {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

/// Starts a background ticker that sends `()` every `interval`.
///
/// The thread exits once the handle is stopped or dropped, or once the
/// receiving side hangs up.
pub fn spawn(interval: Duration) -> (RefreshHandle, Receiver<()>) {
    let (tick_tx, tick_rx) = mpsc::channel();
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let worker = thread::spawn(move || loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                if tick_tx.send(()).is_err() {
                    break;
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    });
    tracing::debug!(interval_ms = interval.as_millis() as u64, "refresh ticker started");
    (
        RefreshHandle {
            stop: Some(stop_tx),
            worker: Some(worker),
        },
        tick_rx,
    )
}

impl RefreshHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the worker's stop channel.
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("refresh ticker panicked");
            } else {
                tracing::debug!("refresh ticker stopped");
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_until_stopped() {
        let (handle, ticks) = spawn(Duration::from_millis(5));
        assert!(ticks.recv_timeout(Duration::from_secs(2)).is_ok());
        assert!(ticks.recv_timeout(Duration::from_secs(2)).is_ok());
        handle.stop();
        while ticks.try_recv().is_ok() {}
        assert_eq!(
            ticks.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn dropping_the_handle_stops_the_thread() {
        let (handle, ticks) = spawn(Duration::from_secs(3600));
        drop(handle);
        assert_eq!(
            ticks.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Disconnected)
        );
    }
}
