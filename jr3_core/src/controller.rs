//! Threaded JR3 controller.
//!
//! Lifecycle: `initialize` parses the calibration (state READY), then
//! `start_sync` runs the decode thread and callers poll `acquire`, or
//! `start_async` adds a push thread handing samples to a callback at a fixed
//! period. Both threads share one mutex-protected record; nothing slow ever
//! runs under that lock.
//!
//! The frame source is owned by whoever currently reads it: the controller
//! while idle, the decode thread while running. Stopping joins the thread and
//! takes the source back.
use crate::calibration::{self, Calibration, CalibrationMatrix};
use crate::config::ControllerCfg;
use crate::error::{Jr3Error, Jr3Result};
use crate::filter::{AxisFilter, CutoffFrequency, smoothing_factor};
use crate::fixed_point::Fixed;
use crate::frame::Frame;
use crate::revolution::Revolution;
use crate::value::AxisValue;
use jr3_traits::FrameSource;
use jr3_traits::clock::{Clock, MonotonicClock};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

pub const DECODE_THREAD_NAME: &str = "jr3-decode";
pub const PUSH_THREAD_NAME: &str = "jr3-push";

/// Push period used until `start_async`/`set_push_period` supplies one.
pub const DEFAULT_PUSH_PERIOD: Duration = Duration::from_millis(1);

/// Latest reported values on the wire scale plus the revolution counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// fx, fy, fz, mx, my, mz
    pub values: [u16; 6],
    /// Revolutions decoded since the decode thread started.
    pub frame_counter: u32,
}

impl Sample {
    /// Classic 7-word record; the counter is truncated to 16 bits.
    pub fn to_wire(&self) -> [u16; 7] {
        let [fx, fy, fz, mx, my, mz] = self.values;
        [fx, fy, fz, mx, my, mz, self.frame_counter as u16]
    }

    pub fn signed(&self) -> [i16; 6] {
        self.values.map(|v| v as i16)
    }
}

pub type PushCallback = Box<dyn FnMut(&Sample) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Ready,
}

#[derive(Debug)]
struct Shared<V> {
    smoothing: f64,
    decode_stop: bool,
    push_stop: bool,
    zero_request: bool,
    sample: [V; 6],
    frame_counter: u32,
    push_period: Duration,
}

impl<V: AxisValue> Shared<V> {
    fn new() -> Self {
        Self {
            smoothing: 1.0,
            decode_stop: false,
            push_stop: false,
            zero_request: false,
            sample: [V::default(); 6],
            frame_counter: 0,
            push_period: DEFAULT_PUSH_PERIOD,
        }
    }
}

type SharedCell<V> = Arc<Mutex<Shared<V>>>;

// Every shared field is plain data valid in any state, so a panicked holder
// leaves nothing to repair.
fn lock<V>(shared: &Mutex<Shared<V>>) -> MutexGuard<'_, Shared<V>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn snapshot<V: AxisValue>(shared: &Mutex<Shared<V>>) -> Sample {
    let (values, frame_counter) = {
        let guard = lock(shared);
        (guard.sample, guard.frame_counter)
    };
    Sample {
        values: values.map(V::to_wire),
        frame_counter,
    }
}

pub struct SensorController<F, V = Fixed> {
    source: Option<F>,
    decode_thread: Option<JoinHandle<F>>,
    push_thread: Option<JoinHandle<()>>,
    shared: SharedCell<V>,
    calibration: Option<Calibration<V>>,
    state: ControllerState,
    cutoff: CutoffFrequency,
    cfg: ControllerCfg,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<F, V> SensorController<F, V>
where
    F: FrameSource + Send + 'static,
    V: AxisValue,
{
    pub fn new(source: F, cfg: ControllerCfg) -> Self {
        Self::with_clock(source, cfg, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(source: F, cfg: ControllerCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            source: Some(source),
            decode_thread: None,
            push_thread: None,
            shared: Arc::new(Mutex::new(Shared::new())),
            calibration: None,
            state: ControllerState::Uninitialized,
            cutoff: CutoffFrequency::UNFILTERED,
            cfg,
            clock,
        }
    }

    /// Stop any running threads, then block until the 256-byte calibration
    /// image has been received and parsed. Callable from any state.
    pub fn initialize(&mut self) -> Jr3Result<&Calibration<V>> {
        self.halt();
        self.state = ControllerState::Uninitialized;
        let source = self.source.as_mut().ok_or(Jr3Error::SourceLost)?;
        debug!(representation = V::NAME, "waiting for calibration image");
        let calibration = calibration::parse::<V, F>(source);
        info!(full_scales = ?calibration.full_scales.0, "jr3 initialization done");
        self.clear_sample();
        self.state = ControllerState::Ready;
        Ok(&*self.calibration.insert(calibration))
    }

    pub const fn state(&self) -> ControllerState {
        self.state
    }

    pub const fn calibration(&self) -> Option<&Calibration<V>> {
        self.calibration.as_ref()
    }

    pub const fn cutoff(&self) -> CutoffFrequency {
        self.cutoff
    }

    /// True while the decode thread is alive; a panicked thread counts as
    /// stopped even before it is joined.
    pub fn is_running(&self) -> bool {
        self.decode_thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn is_pushing(&self) -> bool {
        self.push_thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Set the low-pass cutoff; returns the smoothing factor now in effect.
    /// Takes effect on the next frame if the decode thread is running.
    pub fn set_filter(&mut self, cutoff: CutoffFrequency) -> Jr3Result<f64> {
        self.check_ready("set_filter")?;
        let alpha = smoothing_factor(cutoff, self.cfg.sampling_period_s);
        lock(&self.shared).smoothing = alpha;
        self.cutoff = cutoff;
        info!(%cutoff, alpha, "jr3 filter updated");
        Ok(alpha)
    }

    /// Request a zero offset at the next completed revolution.
    pub fn calibrate(&mut self) -> Jr3Result<()> {
        self.check_ready("calibrate")?;
        lock(&self.shared).zero_request = true;
        debug!("zero offset requested");
        Ok(())
    }

    pub fn get_full_scales(&self) -> Jr3Result<[u16; 6]> {
        self.check_ready("get_full_scales")?;
        self.calibration
            .as_ref()
            .map(|c| c.full_scales.0)
            .ok_or(Jr3Error::NotReady)
    }

    /// Decode thread only; an active push thread is stopped.
    pub fn start_sync(&mut self) -> Jr3Result<()> {
        self.check_ready("start_sync")?;
        self.stop_push_thread();
        self.start_decode_thread()?;
        info!("jr3 synchronous acquisition started");
        Ok(())
    }

    /// Decode thread plus a push thread calling `callback` every `period`.
    /// A running push thread (and with it the decode thread) is stopped first
    /// so the callback is replaced cleanly.
    pub fn start_async<C>(&mut self, callback: C, period: Duration) -> Jr3Result<()>
    where
        C: FnMut(&Sample) + Send + 'static,
    {
        self.check_ready("start_async")?;
        if self.push_thread.is_some() {
            self.halt();
        }
        lock(&self.shared).push_period = period;
        self.start_decode_thread()?;
        self.start_push_thread(Box::new(callback))?;
        info!(period_us = period.as_micros() as u64, "jr3 asynchronous acquisition started");
        Ok(())
    }

    pub fn set_push_period(&mut self, period: Duration) -> Jr3Result<()> {
        self.check_ready("set_push_period")?;
        lock(&self.shared).push_period = period;
        Ok(())
    }

    /// Stop both threads; the shared sample and counter return to zero.
    pub fn stop(&mut self) -> Jr3Result<()> {
        self.check_ready("stop")?;
        self.halt();
        info!("jr3 acquisition stopped");
        Ok(())
    }

    /// Latest sample; `None` unless READY with the decode thread running.
    pub fn acquire(&self) -> Option<Sample> {
        if self.state != ControllerState::Ready || !self.is_running() {
            return None;
        }
        Some(snapshot(&self.shared))
    }

    fn check_ready(&self, op: &'static str) -> Jr3Result<()> {
        if self.state == ControllerState::Ready {
            Ok(())
        } else {
            warn!(op, "jr3 controller not in ready state");
            Err(Jr3Error::NotReady)
        }
    }

    fn halt(&mut self) {
        self.stop_push_thread();
        self.stop_decode_thread();
    }

    fn clear_sample(&self) {
        let mut guard = lock(&self.shared);
        guard.sample = [V::default(); 6];
        guard.frame_counter = 0;
    }

    fn start_decode_thread(&mut self) -> Jr3Result<()> {
        if self.is_running() {
            return Ok(());
        }
        // reap a dead thread; a panic leaves no source to restart with
        self.stop_decode_thread();
        let matrix = self
            .calibration
            .as_ref()
            .map(|c| c.matrix)
            .ok_or(Jr3Error::NotReady)?;
        let source = self.source.take().ok_or(Jr3Error::SourceLost)?;
        lock(&self.shared).decode_stop = false;
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(DECODE_THREAD_NAME.into())
            .spawn(move || decode_loop(source, &matrix, &shared))
            .map_err(|e| Jr3Error::Thread(format!("spawn {DECODE_THREAD_NAME}: {e}")))?;
        self.decode_thread = Some(handle);
        Ok(())
    }

    fn stop_decode_thread(&mut self) {
        let Some(handle) = self.decode_thread.take() else {
            return;
        };
        lock(&self.shared).decode_stop = true;
        match handle.join() {
            Ok(source) => {
                self.source = Some(source);
                trace!("decode thread joined");
            }
            Err(e) => {
                warn!(?e, "decode thread panicked; frame source lost");
                self.state = ControllerState::Uninitialized;
            }
        }
        self.clear_sample();
    }

    fn start_push_thread(&mut self, callback: PushCallback) -> Jr3Result<()> {
        lock(&self.shared).push_stop = false;
        let shared = Arc::clone(&self.shared);
        let clock = Arc::clone(&self.clock);
        let priority = self.cfg.push_priority;
        let handle = thread::Builder::new()
            .name(PUSH_THREAD_NAME.into())
            .spawn(move || {
                apply_priority(priority);
                push_loop(callback, &shared, clock.as_ref());
            })
            .map_err(|e| Jr3Error::Thread(format!("spawn {PUSH_THREAD_NAME}: {e}")))?;
        self.push_thread = Some(handle);
        Ok(())
    }

    fn stop_push_thread(&mut self) {
        let Some(handle) = self.push_thread.take() else {
            return;
        };
        lock(&self.shared).push_stop = true;
        if let Err(e) = handle.join() {
            warn!(?e, "push thread panicked");
        } else {
            trace!("push thread joined");
        }
    }
}

impl<F, V> Drop for SensorController<F, V> {
    fn drop(&mut self) {
        if let Some(handle) = self.push_thread.take() {
            lock(&self.shared).push_stop = true;
            if let Err(e) = handle.join() {
                warn!(?e, "push thread panicked");
            }
        }
        if let Some(handle) = self.decode_thread.take() {
            lock(&self.shared).decode_stop = true;
            if let Err(e) = handle.join() {
                warn!(?e, "decode thread panicked; frame source lost");
            }
        }
    }
}

fn decode_loop<F, V>(mut source: F, matrix: &CalibrationMatrix<V>, shared: &Mutex<Shared<V>>) -> F
where
    F: FrameSource,
    V: AxisValue,
{
    debug!("starting jr3 decode thread");
    let mut revolution = Revolution::<V>::new();
    let mut filter = AxisFilter::<V>::new();
    let mut revolutions: u64 = 0;
    loop {
        let alpha = {
            let guard = lock(shared);
            if guard.decode_stop {
                break;
            }
            guard.smoothing
        };
        let frame = Frame::new(source.await_frame());
        let Some(raw) = revolution.push(frame) else {
            continue;
        };
        let decoupled = matrix.apply(&raw);
        filter.update(&decoupled, alpha);

        let mut guard = lock(shared);
        if guard.zero_request {
            filter.zero(&decoupled);
            guard.sample = [V::default(); 6];
            guard.zero_request = false;
        } else {
            guard.sample = filter.reported();
        }
        guard.frame_counter = guard.frame_counter.wrapping_add(1);
        drop(guard);
        revolutions += 1;
    }
    debug!(revolutions, discarded = revolution.discarded(), "quitting jr3 decode thread");
    source
}

fn push_loop<V: AxisValue>(mut callback: PushCallback, shared: &Mutex<Shared<V>>, clock: &dyn Clock) {
    debug!("starting jr3 push thread");
    let (mut stop, mut period) = {
        let guard = lock(shared);
        (guard.push_stop, guard.push_period)
    };
    let mut pushed: u64 = 0;
    while !stop {
        let sample = snapshot(shared);
        callback(&sample);
        pushed += 1;
        clock.wait_precise(period);
        let guard = lock(shared);
        stop = guard.push_stop;
        period = guard.push_period;
    }
    debug!(pushed, "quitting jr3 push thread");
}

#[cfg(all(feature = "rt", target_os = "linux"))]
fn apply_priority(priority: Option<i32>) {
    if let Some(prio) = priority {
        match crate::rt::set_current_thread_fifo(prio) {
            Ok(()) => debug!(prio, "push thread running SCHED_FIFO"),
            Err(e) => warn!(prio, error = %e, "could not raise push thread priority"),
        }
    }
}

#[cfg(not(all(feature = "rt", target_os = "linux")))]
fn apply_priority(priority: Option<i32>) {
    if priority.is_some() {
        debug!("push thread priority requested but rt support is not compiled in");
    }
}
