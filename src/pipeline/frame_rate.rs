use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{Sender, bounded, select, tick};

#[derive(Debug, Default)]
struct Counters {
    in_window: AtomicU32,
    published: AtomicU32,
}

/// Frames per fixed window. Cloning shares the counters.
#[derive(Clone, Debug)]
pub struct FrameRateMonitor {
    counters: Arc<Counters>,
    window: Duration,
}

impl FrameRateMonitor {
    pub fn new(window: Duration) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            window,
        }
    }

    pub fn record_frame(&self) {
        self.counters.in_window.fetch_add(1, Ordering::Relaxed);
    }

    /// Closes the current window: publishes its count and starts a new one at zero.
    pub fn tick(&self) -> u32 {
        let count = self.counters.in_window.swap(0, Ordering::AcqRel);
        self.counters.published.store(count, Ordering::Release);
        count
    }

    pub fn published(&self) -> u32 {
        self.counters.published.load(Ordering::Acquire)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn frames_per_second(&self) -> f64 {
        let secs = self.window.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.published() as f64 / secs
    }

    pub fn start_ticker(&self) -> FrameRateTicker {
        let monitor = self.clone();
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let handle = thread::spawn(move || {
            let ticks = tick(monitor.window);
            loop {
                select! {
                    recv(ticks) -> _ => {
                        let count = monitor.tick();
                        log::trace!("frame rate window closed with {count} frames");
                    }
                    recv(stop_rx) -> _ => break,
                }
            }
        });

        FrameRateTicker {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }
}

#[derive(Debug)]
pub struct FrameRateTicker {
    stop: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FrameRateTicker {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the stop channel and wakes the thread.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FrameRateTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
