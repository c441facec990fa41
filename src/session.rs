//! # Printer Session
//!
//! One session owns one transport and drives the whole print pipeline: the
//! job cache, the frame codec, heartbeats, and the status/progress event
//! stream.
//!
//! ## Threading
//!
//! All device I/O happens on a dedicated worker thread, which is the only
//! writer of job state. Callers interact through bounded operations:
//! `submit` pushes into the shared cache (waiting for a slot only under
//! [`OverflowPolicy::Block`], and never past the job timeout), and
//! pause/resume/cancel are control signals the worker consumes between
//! frames. Observers receive [`SessionEvent`]s on channels handed out by
//! [`PrinterSession::subscribe`].
//!
//! ## Link loss
//!
//! The worker sends a heartbeat every `heartbeat_interval` and declares the
//! link lost when I/O fails or nothing arrives for `heartbeat_timeout`
//! after traffic was expected. On loss the active job fails with
//! [`DeviceError::Disconnected`] and the session transitions to
//! [`ConnectionState::Lost`].

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::{QueueError, RotuloError};
use crate::job::{CachePhase, JobCache, JobState, OverflowPolicy, PrintJob, ProgressTracker};
use crate::printer::PrinterConfig;
use crate::protocol::decode::{Decoder, DeviceEvent};
use crate::protocol::{encode, frame::kind};
use crate::status::{DeviceError, PaperInfo, StatusEvent};
use crate::transport::{
    BluetoothTransport, ConnectionState, Device, TcpTransport, Transport, TransportKind, bluetooth,
};

/// Frames streamed per worker iteration before control signals are polled
/// again.
const FRAMES_PER_TICK: usize = 8;

/// Worker idle poll interval.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

// ============================================================================
// OPTIONS & EVENTS
// ============================================================================

/// Tunable timeouts and queue behavior for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    pub discovery_timeout: Duration,
    /// Upper bound on any blocking submit and on job completion waits
    pub job_timeout: Duration,
    pub heartbeat_interval: Duration,
    /// Silence window after which the link is declared lost
    pub heartbeat_timeout: Duration,
    pub cache_enabled: bool,
    pub overflow_policy: OverflowPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            discovery_timeout: Duration::from_secs(8),
            job_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(2),
            heartbeat_timeout: Duration::from_secs(5),
            cache_enabled: true,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

/// Everything a session reports to its observers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Telemetry change (cover, battery, paper, ribbon, signal)
    Status(StatusEvent),
    /// Device error from the fixed taxonomy
    DeviceError(DeviceError),
    /// Cumulative progress for the active job
    Progress {
        job: Uuid,
        total_count: u32,
        expected_total: u32,
        page_no: u32,
    },
    /// Will/did phase notification around a state change
    Phase { job: Uuid, phase: CachePhase },
    /// Job state machine transition
    JobState { job: Uuid, state: JobState },
    /// Installed paper geometry report
    PaperInfo(PaperInfo),
    /// The transport dropped underneath the session
    LinkLost,
}

/// Control signals consumed by the worker at frame boundaries.
enum Control {
    Pause,
    Resume,
    Cancel,
    QueryStatus,
    QueryPaper,
    Disconnect,
}

// ============================================================================
// SHARED STATE
// ============================================================================

struct Shared {
    cache: Mutex<JobCache>,
    /// Signaled whenever a cache slot frees up
    slot_freed: Condvar,
    connection: Mutex<ConnectionState>,
    /// Terminal states of jobs that have left the cache
    finished: Mutex<HashMap<Uuid, JobState>>,
    subscribers: Mutex<Vec<Sender<SessionEvent>>>,
}

impl Shared {
    fn emit(&self, event: SessionEvent) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_connection(&self, state: ConnectionState) {
        *self.connection.lock().unwrap() = state;
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// Handle to a connected printer. See the [module docs](self).
pub struct PrinterSession {
    config: PrinterConfig,
    options: SessionOptions,
    shared: Arc<Shared>,
    control: Sender<Control>,
    worker: Option<JoinHandle<()>>,
    printer_name: String,
    kind: TransportKind,
}

impl PrinterSession {
    /// Connect to a discovered device over its native transport.
    pub fn connect(
        config: PrinterConfig,
        device: &Device,
        options: SessionOptions,
    ) -> Result<Self, RotuloError> {
        let transport: Box<dyn Transport> = match device.kind {
            TransportKind::Bluetooth => {
                // Accept a MAC (bound to an RFCOMM device on demand) or a
                // ready /dev/rfcommN path
                let path = if bluetooth::is_valid_mac(&device.address) {
                    match bluetooth::find_rfcomm_for_mac(&device.address)? {
                        Some(path) => path,
                        None => bluetooth::setup_rfcomm(&device.address, 1)?,
                    }
                } else {
                    device.address.clone()
                };
                Box::new(BluetoothTransport::open(path)?)
            }
            TransportKind::Wifi => Box::new(TcpTransport::connect(
                &device.address,
                options.connect_timeout,
            )?),
        };
        Ok(Self::connect_with(
            config,
            transport,
            device.name.clone(),
            options,
        ))
    }

    /// Run a session over an already-open transport.
    ///
    /// This is the seam the tests use with a scripted transport; `connect`
    /// goes through here too.
    pub fn connect_with(
        config: PrinterConfig,
        transport: Box<dyn Transport>,
        printer_name: String,
        options: SessionOptions,
    ) -> Self {
        let kind = transport.kind();
        let shared = Arc::new(Shared {
            cache: Mutex::new(JobCache::new(options.cache_enabled)),
            slot_freed: Condvar::new(),
            connection: Mutex::new(ConnectionState::Connected),
            finished: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
        });
        let (control_tx, control_rx) = mpsc::channel();

        let worker_shared = shared.clone();
        let worker_options = options.clone();
        let worker = thread::Builder::new()
            .name("rotulo-session".to_string())
            .spawn(move || {
                Worker::new(transport, worker_shared, worker_options, control_rx).run();
            })
            .expect("failed to spawn session worker thread");

        info!("session: connected to {} over {:?}", printer_name, kind);
        Self {
            config,
            options,
            shared,
            control: control_tx,
            worker: Some(worker),
            printer_name,
            kind,
        }
    }

    /// Subscribe to session events. Every subscriber sees every event.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.shared.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Submit a job to the print queue.
    ///
    /// Density is clamped to the printer's range. Under
    /// [`OverflowPolicy::Reject`] a full cache fails immediately with
    /// [`QueueError::CacheFull`]; under `Block` the call waits for a slot,
    /// bounded by the job timeout.
    pub fn submit(&self, mut job: PrintJob) -> Result<Uuid, RotuloError> {
        if !self.is_connected() {
            return Err(QueueError::NotConnected.into());
        }
        job.density = self.config.clamp_density(job.density);
        let id = job.id;

        let mut cache = self.shared.cache.lock().unwrap();
        let deadline = Instant::now() + self.options.job_timeout;
        while cache.is_full() {
            if self.options.overflow_policy == OverflowPolicy::Reject {
                return Err(QueueError::CacheFull.into());
            }
            let wait = deadline.saturating_duration_since(Instant::now());
            if wait.is_zero() {
                return Err(RotuloError::Timeout(
                    "cache slot did not free within the job timeout".to_string(),
                ));
            }
            let (guard, _) = self
                .shared
                .slot_freed
                .wait_timeout_while(cache, wait, |c| c.is_full())
                .unwrap();
            cache = guard;
        }
        cache.push(job)?;
        debug!("session: queued job {} ({} pending)", id, cache.len());
        Ok(id)
    }

    /// Pause the active job at the next frame boundary.
    pub fn pause(&self) -> Result<(), RotuloError> {
        self.signal(Control::Pause)
    }

    /// Resume a paused job.
    pub fn resume(&self) -> Result<(), RotuloError> {
        self.signal(Control::Resume)
    }

    /// Cancel the active job. Frames already streamed are not retracted;
    /// the device is told to abandon the rest.
    pub fn cancel(&self) -> Result<(), RotuloError> {
        self.signal(Control::Cancel)
    }

    /// Ask the device for a full telemetry report (answers arrive as
    /// [`SessionEvent::Status`]).
    pub fn query_status(&self) -> Result<(), RotuloError> {
        self.signal(Control::QueryStatus)
    }

    /// Ask the device for installed paper geometry (answer arrives as
    /// [`SessionEvent::PaperInfo`]).
    pub fn query_paper(&self) -> Result<(), RotuloError> {
        self.signal(Control::QueryPaper)
    }

    fn signal(&self, control: Control) -> Result<(), RotuloError> {
        self.control
            .send(control)
            .map_err(|_| RotuloError::Transport("session worker stopped".to_string()))
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.connection.lock().unwrap()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Transport kind of the live connection, if any.
    pub fn is_connected_kind(&self) -> Option<TransportKind> {
        self.is_connected().then_some(self.kind)
    }

    pub fn connected_printer_name(&self) -> Option<&str> {
        self.is_connected().then_some(self.printer_name.as_str())
    }

    /// Whether the connected printer model can write RFID labels.
    pub fn supports_rfid(&self) -> bool {
        self.config.supports_rfid
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Current state of a job, in the queue or already finished.
    pub fn job_state(&self, id: Uuid) -> Option<JobState> {
        if let Some(job) = self.shared.cache.lock().unwrap().iter().find(|j| j.id == id) {
            return Some(job.state().clone());
        }
        self.shared.finished.lock().unwrap().get(&id).cloned()
    }

    /// Number of jobs waiting in the cache (including the active one).
    pub fn pending_jobs(&self) -> usize {
        self.shared.cache.lock().unwrap().len()
    }

    /// Tear the session down: stop the worker and close the transport.
    pub fn disconnect(&mut self) {
        let _ = self.control.send(Control::Disconnect);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.shared.set_connection(ConnectionState::Disconnected);
    }
}

impl Drop for PrinterSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ============================================================================
// WORKER
// ============================================================================

/// Per-job streaming state held while frames are on the wire.
struct ActiveJob {
    id: Uuid,
    /// Remaining encoded frames, with page boundaries already expanded
    outbox: std::collections::VecDeque<Vec<u8>>,
    tracker: ProgressTracker,
    /// All frames streamed and `end_job` sent
    fully_streamed: bool,
    end_acked: bool,
}

struct Worker {
    transport: Box<dyn Transport>,
    shared: Arc<Shared>,
    options: SessionOptions,
    control: Receiver<Control>,
    decoder: Decoder,
    active: Option<ActiveJob>,
    paused: bool,
    lost: bool,
    last_sent: Instant,
    /// Time of the oldest heartbeat probe still waiting for any inbound
    /// traffic
    unanswered_probe: Option<Instant>,
}

impl Worker {
    fn new(
        transport: Box<dyn Transport>,
        shared: Arc<Shared>,
        options: SessionOptions,
        control: Receiver<Control>,
    ) -> Self {
        let now = Instant::now();
        Self {
            transport,
            shared,
            options,
            control,
            decoder: Decoder::new(),
            active: None,
            paused: false,
            lost: false,
            last_sent: now,
            unanswered_probe: None,
        }
    }

    fn run(mut self) {
        loop {
            match self.control.try_recv() {
                Ok(Control::Disconnect) => break,
                Ok(control) => self.handle_control(control),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => break,
            }

            if !self.pump_inbound() || !self.heartbeat() {
                self.declare_link_lost();
                return;
            }

            let worked = self.advance_jobs();
            if self.lost {
                return;
            }
            if !worked {
                thread::sleep(POLL_INTERVAL);
            }
        }
        self.transport.close();
        self.shared.set_connection(ConnectionState::Disconnected);
    }

    fn handle_control(&mut self, control: Control) {
        match control {
            Control::Pause => {
                if self.paused {
                    return;
                }
                self.paused = true;
                if let Some((id, streaming)) =
                    self.active.as_ref().map(|a| (a.id, !a.fully_streamed))
                {
                    self.emit_phase(id, CachePhase::WillPause);
                    // A fully streamed job keeps printing from the device
                    // buffer; pausing stops frame flow and queue promotion.
                    if streaming {
                        self.set_active_state(JobState::Paused);
                    }
                    self.emit_phase(id, CachePhase::Paused);
                }
            }
            Control::Resume => {
                if !self.paused {
                    return;
                }
                self.paused = false;
                if let Some((id, streaming)) =
                    self.active.as_ref().map(|a| (a.id, !a.fully_streamed))
                {
                    self.emit_phase(id, CachePhase::WillResume);
                    if streaming {
                        self.set_active_state(JobState::Sending);
                    }
                    self.emit_phase(id, CachePhase::Resumed);
                }
            }
            Control::Cancel => self.cancel_active(),
            Control::QueryStatus => {
                let _ = self.send(&encode::query_status());
            }
            Control::QueryPaper => {
                let _ = self.send(&encode::query_paper());
            }
            Control::Disconnect => unreachable!("handled in run loop"),
        }
    }

    /// Drain inbound bytes through the decoder. Returns false on link death.
    fn pump_inbound(&mut self) -> bool {
        loop {
            match self.transport.try_recv() {
                Ok(Some(bytes)) => {
                    self.unanswered_probe = None;
                    for event in self.decoder.push(&bytes) {
                        self.handle_device_event(event);
                    }
                }
                Ok(None) => return true,
                Err(e) => {
                    warn!("session: receive failed: {}", e);
                    return false;
                }
            }
        }
    }

    fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Ack { kind: k } => {
                if k == kind::END_JOB {
                    if let Some(active) = &mut self.active {
                        active.end_acked = true;
                    }
                }
            }
            DeviceEvent::HeartbeatReply => {}
            DeviceEvent::Progress(progress) => {
                if let Some(active) = &mut self.active {
                    active.tracker.observe(&progress);
                    let event = SessionEvent::Progress {
                        job: active.id,
                        total_count: active.tracker.total_count,
                        expected_total: active.tracker.expected_total,
                        page_no: active.tracker.page_no,
                    };
                    self.shared.emit(event);
                }
            }
            DeviceEvent::Status(status) => self.shared.emit(SessionEvent::Status(status)),
            DeviceEvent::UnknownStatus { key, value } => {
                debug!("session: unknown telemetry key {} = {}", key, value);
            }
            DeviceEvent::Error(err) => {
                self.shared.emit(SessionEvent::DeviceError(err));
                if err.is_fatal() {
                    self.fail_active(err);
                }
            }
            DeviceEvent::UnknownDeviceStatus { code } => {
                debug!("session: unknown device status code {}", code);
            }
            DeviceEvent::PaperInfo(info) => self.shared.emit(SessionEvent::PaperInfo(info)),
        }
    }

    /// Send a heartbeat when the link has been quiet. Returns false on link
    /// death.
    fn heartbeat(&mut self) -> bool {
        if !self.transport.is_open() {
            return false;
        }
        if self.last_sent.elapsed() >= self.options.heartbeat_interval {
            if self.send(&encode::heartbeat()).is_err() {
                return false;
            }
            self.unanswered_probe.get_or_insert(Instant::now());
        }
        // A probe left unanswered past the timeout means the device is gone
        // even if the OS keeps the socket alive.
        if let Some(since) = self.unanswered_probe {
            if since.elapsed() >= self.options.heartbeat_timeout {
                warn!(
                    "session: heartbeat unanswered for {:?}",
                    self.options.heartbeat_timeout
                );
                return false;
            }
        }
        true
    }

    /// Promote, stream and complete jobs. Returns true if any work was done.
    fn advance_jobs(&mut self) -> bool {
        if self.paused {
            return false;
        }

        // Promote the next queued job
        if self.active.is_none() {
            let promoted = {
                let mut cache = self.shared.cache.lock().unwrap();
                match cache.front_mut() {
                    Some(job) if *job.state() == JobState::Queued => {
                        let frames = match job_frames(job) {
                            Ok(frames) => Some(frames),
                            Err(e) => {
                                warn!("session: job {} cannot be encoded: {}", job.id, e);
                                None
                            }
                        };
                        Some((job.id, ProgressTracker::for_job(job), frames))
                    }
                    _ => None,
                }
            };
            if let Some((id, tracker, frames)) = promoted {
                let Some(outbox) = frames else {
                    // Unencodable job: fail it and move on
                    self.active = Some(ActiveJob {
                        id,
                        outbox: Default::default(),
                        tracker,
                        fully_streamed: false,
                        end_acked: false,
                    });
                    self.set_active_state(JobState::Sending);
                    self.fail_active(DeviceError::DataError);
                    return true;
                };
                self.emit_phase(id, CachePhase::WillPrint);
                self.active = Some(ActiveJob {
                    id,
                    outbox,
                    tracker,
                    fully_streamed: false,
                    end_acked: false,
                });
                self.set_active_state(JobState::Sending);
                return true;
            }
        }

        let Some((id, fully_streamed, outbox_empty, done)) = self.active.as_ref().map(|a| {
            (
                a.id,
                a.fully_streamed,
                a.outbox.is_empty(),
                a.tracker.is_complete() || a.end_acked,
            )
        }) else {
            return false;
        };

        // Stream a bounded burst of frames, then yield to control handling
        if !fully_streamed {
            if outbox_empty {
                if self.send(&encode::end_job()).is_err() {
                    self.declare_link_lost();
                    return true;
                }
                if let Some(active) = &mut self.active {
                    active.fully_streamed = true;
                }
                self.set_active_state(JobState::Printing);
                self.emit_phase(id, CachePhase::Printing);
                return true;
            }
            for _ in 0..FRAMES_PER_TICK {
                let Some(frame) = self.active.as_mut().and_then(|a| a.outbox.pop_front()) else {
                    break;
                };
                if self.send(&frame).is_err() {
                    self.declare_link_lost();
                    return true;
                }
            }
            return true;
        }

        // Completion
        if done {
            self.emit_phase(id, CachePhase::WillDone);
            self.set_active_state(JobState::Completed);
            self.finish_active();
            self.emit_phase(id, CachePhase::Done);
            return true;
        }

        false
    }

    fn cancel_active(&mut self) {
        let Some(id) = self.active.as_mut().map(|a| {
            a.outbox.clear();
            a.id
        }) else {
            // Nothing streaming; drop a queued head job if present
            let mut cache = self.shared.cache.lock().unwrap();
            if let Some(job) = cache.front_mut() {
                if job.set_state(JobState::Canceled).is_ok() {
                    let id = job.id;
                    let state = job.state().clone();
                    drop(cache);
                    self.shared.emit(SessionEvent::JobState { job: id, state });
                    self.finish_active_by_id(id);
                }
            }
            return;
        };

        self.emit_phase(id, CachePhase::WillCancel);
        // Tell the device to abandon buffered pages
        let _ = self.send(&encode::cancel());
        self.set_active_state(JobState::Canceled);
        self.finish_active();
        self.emit_phase(id, CachePhase::Canceled);
    }

    fn fail_active(&mut self, err: DeviceError) {
        if self.active.is_some() {
            self.set_active_state(JobState::Failed(err));
            self.finish_active();
        }
    }

    /// Move the active job's state and broadcast the transition.
    fn set_active_state(&mut self, state: JobState) {
        let Some(active) = &self.active else { return };
        let id = active.id;
        let mut cache = self.shared.cache.lock().unwrap();
        if let Some(job) = cache.get_mut(id) {
            match job.set_state(state.clone()) {
                Ok(()) => {
                    drop(cache);
                    self.shared.emit(SessionEvent::JobState { job: id, state });
                }
                Err(e) => {
                    drop(cache);
                    debug!("session: ignored transition for {}: {}", id, e);
                }
            }
        }
    }

    /// Pop the finished active job out of the cache and wake blocked
    /// submitters.
    fn finish_active(&mut self) {
        if let Some(active) = self.active.take() {
            self.finish_active_by_id(active.id);
        }
    }

    fn finish_active_by_id(&mut self, id: Uuid) {
        let mut cache = self.shared.cache.lock().unwrap();
        if cache.front().map(|j| j.id) == Some(id) {
            if let Some(job) = cache.pop() {
                self.shared
                    .finished
                    .lock()
                    .unwrap()
                    .insert(id, job.state().clone());
            }
        }
        drop(cache);
        self.shared.slot_freed.notify_all();
    }

    fn declare_link_lost(&mut self) {
        if self.lost {
            return;
        }
        self.lost = true;
        warn!("session: link lost");
        if self.active.is_some() {
            self.fail_active(DeviceError::Disconnected);
        }
        // Queued jobs behind the active one fail too; nothing can print them
        loop {
            let id = {
                let cache = self.shared.cache.lock().unwrap();
                cache.front().map(|j| j.id)
            };
            let Some(id) = id else { break };
            {
                let mut cache = self.shared.cache.lock().unwrap();
                if let Some(job) = cache.get_mut(id) {
                    let _ = job.set_state(JobState::Failed(DeviceError::Disconnected));
                }
            }
            self.shared.emit(SessionEvent::JobState {
                job: id,
                state: JobState::Failed(DeviceError::Disconnected),
            });
            self.finish_active_by_id(id);
        }
        self.transport.close();
        self.shared.set_connection(ConnectionState::Lost);
        self.shared.emit(SessionEvent::LinkLost);
    }

    fn emit_phase(&self, job: Uuid, phase: CachePhase) {
        self.shared.emit(SessionEvent::Phase { job, phase });
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), RotuloError> {
        self.transport.send(bytes)?;
        self.last_sent = Instant::now();
        Ok(())
    }
}

/// Expand a job into its full frame sequence: job header, optional RFID
/// write, then per page the geometry, quantity and raster rows.
fn job_frames(job: &PrintJob) -> Result<std::collections::VecDeque<Vec<u8>>, RotuloError> {
    let mut frames = std::collections::VecDeque::new();
    frames.push_back(encode::start_job(job.density, job.paper));
    if let Some(epc) = &job.epc {
        frames.push_back(encode::write_rfid(epc)?);
    }
    for page in &job.pages {
        frames.push_back(encode::page_size(
            page.raster.width as u16,
            page.raster.height as u16,
        ));
        frames.push_back(encode::set_quantity(page.copies as u16));
        for frame in encode::raster_frames(&page.raster)? {
            frames.push_back(frame);
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Page;
    use crate::printer::PaperStyle;
    use crate::render::RasterBuffer;
    use crate::transport::MockTransport;

    fn job(copies: &[u32]) -> PrintJob {
        PrintJob::new(
            copies
                .iter()
                .map(|&c| Page {
                    raster: RasterBuffer::new(64, 16),
                    copies: c,
                })
                .collect(),
            3,
            PaperStyle::Gap,
        )
        .unwrap()
    }

    fn session() -> (PrinterSession, crate::transport::MockHandle) {
        let (transport, handle) = MockTransport::new();
        let session = PrinterSession::connect_with(
            PrinterConfig::B21,
            Box::new(transport),
            "B21-TEST".to_string(),
            SessionOptions::default(),
        );
        (session, handle)
    }

    #[test]
    fn test_connected_identity() {
        let (session, _handle) = session();
        assert!(session.is_connected());
        assert_eq!(session.is_connected_kind(), Some(TransportKind::Bluetooth));
        assert_eq!(session.connected_printer_name(), Some("B21-TEST"));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut session, handle) = session();
        session.disconnect();
        session.disconnect();
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert!(!handle.is_open());
    }

    #[test]
    fn test_submit_clamps_density() {
        let (session, _handle) = session();
        let mut j = job(&[1]);
        j.density = 99;
        let id = session.submit(j).unwrap();
        // State is visible while the job moves through the queue
        assert!(session.job_state(id).is_some());
    }

    #[test]
    fn test_job_frames_layout() {
        let j = job(&[2]).with_epc("EPC0001");
        let frames = job_frames(&j).unwrap();
        // start_job, write_rfid, page_size, set_quantity, raster...
        assert!(frames.len() >= 5);
        let kinds: Vec<u8> = frames.iter().map(|f| f[2]).collect();
        assert_eq!(kinds[0], kind::START_JOB);
        assert_eq!(kinds[1], kind::WRITE_RFID);
        assert_eq!(kinds[2], kind::PAGE_SIZE);
        assert_eq!(kinds[3], kind::SET_QUANTITY);
        assert!(kinds[4..].iter().all(|&k| k == kind::RASTER_ROWS));
    }

    #[test]
    fn test_submit_after_disconnect_rejected() {
        let (mut session, _handle) = session();
        session.disconnect();
        assert!(matches!(
            session.submit(job(&[1])),
            Err(RotuloError::Queue(QueueError::NotConnected))
        ));
    }
}
