//! End-to-end session tests over the scripted mock transport.
//!
//! Each test drives a real session worker: jobs are encoded to wire frames,
//! the mock records everything sent, and scripted device frames (acks,
//! progress, errors) are pushed back through the live decoder.

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use rotulo::job::{JobState, Page, PrintJob};
use rotulo::printer::{PaperStyle, PrinterConfig};
use rotulo::protocol::frame::{Frame, kind};
use rotulo::render::RasterBuffer;
use rotulo::session::{PrinterSession, SessionEvent, SessionOptions};
use rotulo::status::DeviceError;
use rotulo::transport::{ConnectionState, MockHandle, MockTransport};

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// HELPERS
// ============================================================================

fn quiet_options() -> SessionOptions {
    // Long heartbeat windows so silence never fails a test
    SessionOptions {
        heartbeat_interval: Duration::from_secs(60),
        heartbeat_timeout: Duration::from_secs(120),
        job_timeout: Duration::from_secs(5),
        ..SessionOptions::default()
    }
}

fn session_with(options: SessionOptions) -> (PrinterSession, MockHandle) {
    let (transport, handle) = MockTransport::new();
    let session = PrinterSession::connect_with(
        PrinterConfig::B21,
        Box::new(transport),
        "B21-TEST".to_string(),
        options,
    );
    (session, handle)
}

fn session() -> (PrinterSession, MockHandle) {
    session_with(quiet_options())
}

fn job(copies: &[u32]) -> PrintJob {
    PrintJob::new(
        copies
            .iter()
            .map(|&c| Page {
                raster: RasterBuffer::new(96, 24),
                copies: c,
            })
            .collect(),
        3,
        PaperStyle::Gap,
    )
    .unwrap()
}

/// Device-side progress report with cumulative totals.
fn progress_frame(total: u16, page_no: u16, page_count: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&total.to_le_bytes());
    payload.extend_from_slice(&page_no.to_le_bytes());
    payload.extend_from_slice(&page_count.to_le_bytes());
    Frame::new(kind::PROGRESS, payload).encode()
}

fn error_frame(code: u8) -> Vec<u8> {
    Frame::new(kind::ERROR, vec![code]).encode()
}

fn end_ack_frame() -> Vec<u8> {
    Frame::new(kind::END_JOB | kind::ACK_FLAG, vec![]).encode()
}

/// Block until an event matching the predicate arrives or the window closes.
fn wait_for<F>(rx: &std::sync::mpsc::Receiver<SessionEvent>, mut pred: F) -> Option<SessionEvent>
where
    F: FnMut(&SessionEvent) -> bool,
{
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(20)) {
            Ok(event) if pred(&event) => return Some(event),
            Ok(_) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => return None,
        }
    }
    None
}

/// Frame kinds the session has sent, in order.
fn sent_kinds(handle: &MockHandle) -> Vec<u8> {
    handle.sent().iter().map(|f| f[2]).collect()
}

fn wait_until_streamed(rx: &std::sync::mpsc::Receiver<SessionEvent>, id: uuid::Uuid) {
    assert!(
        wait_for(rx, |e| matches!(
            e,
            SessionEvent::JobState {
                job,
                state: JobState::Printing
            } if *job == id
        ))
        .is_some(),
        "job never reached Printing"
    );
}

// ============================================================================
// STREAMING
// ============================================================================

#[test]
fn test_job_streams_full_frame_sequence() {
    let (session, handle) = session();
    let events = session.subscribe();
    let id = session.submit(job(&[2])).unwrap();

    wait_until_streamed(&events, id);

    let kinds = sent_kinds(&handle);
    assert_eq!(kinds[0], kind::START_JOB);
    assert_eq!(kinds[1], kind::PAGE_SIZE);
    assert_eq!(kinds[2], kind::SET_QUANTITY);
    assert!(kinds[3..kinds.len() - 1]
        .iter()
        .all(|&k| k == kind::RASTER_ROWS));
    assert_eq!(*kinds.last().unwrap(), kind::END_JOB);
}

#[test]
fn test_completion_on_end_job_ack() {
    let (session, handle) = session();
    let events = session.subscribe();
    let id = session.submit(job(&[1])).unwrap();
    wait_until_streamed(&events, id);

    handle.push_inbound(end_ack_frame());

    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::JobState {
            job,
            state: JobState::Completed
        } if *job == id
    ))
    .is_some());
    assert_eq!(session.job_state(id), Some(JobState::Completed));
}

// ============================================================================
// CACHE OVERFLOW
// ============================================================================

#[test]
fn test_cache_overflow_rejects_deterministically() {
    let (session, _handle) = session();

    // No acks ever arrive, so the first job stays active and the cache
    // cannot drain. Capacity 5 including the active job.
    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(session.submit(job(&[1])).unwrap());
    }
    let err = session.submit(job(&[1])).unwrap_err();
    assert!(matches!(
        err,
        rotulo::RotuloError::Queue(rotulo::error::QueueError::CacheFull)
    ));

    // Earlier submissions are untouched by the rejected one
    for id in ids {
        assert!(session.job_state(id).is_some());
    }
}

// ============================================================================
// CANCEL LIVENESS
// ============================================================================

#[test]
fn test_cancel_resolves_without_device_acks() {
    let (session, handle) = session();
    let events = session.subscribe();
    let id = session.submit(job(&[10])).unwrap();
    wait_until_streamed(&events, id);

    // Device never acknowledges anything; cancel must still resolve
    session.cancel().unwrap();

    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::JobState {
            job,
            state: JobState::Canceled
        } if *job == id
    ))
    .is_some());
    assert_eq!(session.job_state(id), Some(JobState::Canceled));
    // The device was told to abandon its buffer
    assert!(sent_kinds(&handle).contains(&kind::CANCEL));
}

// ============================================================================
// PROGRESS ACCOUNTING (pages [3, 2] -> cumulative 5)
// ============================================================================

#[test]
fn test_per_page_progress_sums_and_page_no_monotone() {
    let (session, handle) = session();
    let events = session.subscribe();
    let id = session.submit(job(&[3, 2])).unwrap();
    wait_until_streamed(&events, id);

    for (total, page) in [(1u16, 1u16), (2, 1), (3, 1), (4, 2), (5, 2)] {
        handle.push_inbound(progress_frame(total, page, 2));
    }

    let mut last_total = 0;
    let mut last_page = 0;
    let deadline = Instant::now() + WAIT;
    while last_total < 5 && Instant::now() < deadline {
        if let Ok(SessionEvent::Progress {
            total_count,
            page_no,
            expected_total,
            ..
        }) = events.recv_timeout(Duration::from_millis(20))
        {
            assert!(total_count >= last_total, "progress went backwards");
            assert!(page_no >= last_page, "page number went backwards");
            assert_eq!(expected_total, 5);
            last_total = total_count;
            last_page = page_no;
        }
    }
    assert_eq!(last_total, 5);
    assert_eq!(last_page, 2);

    // Reaching the expected total completes the job
    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::JobState {
            job,
            state: JobState::Completed
        } if *job == id
    ))
    .is_some());
}

#[test]
fn test_lost_progress_acks_never_double_count() {
    let (session, handle) = session();
    let events = session.subscribe();
    let id = session.submit(job(&[3, 2])).unwrap();
    wait_until_streamed(&events, id);

    // Acks for 2, 3 and 4 copies are lost; the final cumulative report
    // still lands on exactly 5.
    handle.push_inbound(progress_frame(1, 1, 2));
    handle.push_inbound(progress_frame(5, 2, 2));

    let done = wait_for(&events, |e| matches!(
        e,
        SessionEvent::JobState {
            job,
            state: JobState::Completed
        } if *job == id
    ));
    assert!(done.is_some());
}

// ============================================================================
// DEVICE ERRORS
// ============================================================================

#[test]
fn test_fatal_error_fails_active_job_keeps_connection() {
    let (session, handle) = session();
    let events = session.subscribe();
    let id = session.submit(job(&[1])).unwrap();
    wait_until_streamed(&events, id);

    handle.push_inbound(error_frame(DeviceError::OutOfPaper.code()));

    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::JobState {
            job,
            state: JobState::Failed(DeviceError::OutOfPaper)
        } if *job == id
    ))
    .is_some());
    // Paper-out does not drop the link
    assert!(session.is_connected());
}

#[test]
fn test_non_fatal_error_reported_job_continues() {
    let (session, handle) = session();
    let events = session.subscribe();
    let id = session.submit(job(&[1])).unwrap();
    wait_until_streamed(&events, id);

    handle.push_inbound(error_frame(DeviceError::DensitySetFailed.code()));
    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::DeviceError(DeviceError::DensitySetFailed)
    ))
    .is_some());

    // The job is still alive and completes on its ack
    handle.push_inbound(end_ack_frame());
    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::JobState {
            job,
            state: JobState::Completed
        } if *job == id
    ))
    .is_some());
}

#[test]
fn test_corrupt_frame_does_not_lose_following_error() {
    let (session, handle) = session();
    let events = session.subscribe();

    // Corrupt a valid frame, then follow with an intact one in the same
    // burst; the decoder must resynchronize inside the session.
    let mut corrupt = error_frame(DeviceError::CoverOpen.code());
    corrupt[4] ^= 0xFF;
    let mut burst = corrupt;
    burst.extend(error_frame(DeviceError::LowBattery.code()));
    handle.push_inbound(burst);

    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::DeviceError(DeviceError::LowBattery)
    ))
    .is_some());
}

// ============================================================================
// PAUSE / RESUME
// ============================================================================

#[test]
fn test_pause_resume_emit_phase_pairs() {
    use rotulo::job::CachePhase;

    let (session, handle) = session();
    let events = session.subscribe();
    let id = session.submit(job(&[4])).unwrap();

    // Pause as soon as the job starts
    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::Phase {
            job,
            phase: CachePhase::WillPrint
        } if *job == id
    ))
    .is_some());
    session.pause().unwrap();
    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::Phase {
            phase: CachePhase::WillPause,
            ..
        }
    ))
    .is_some());
    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::Phase {
            phase: CachePhase::Paused,
            ..
        }
    ))
    .is_some());

    session.resume().unwrap();
    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::Phase {
            phase: CachePhase::Resumed,
            ..
        }
    ))
    .is_some());

    // The job still runs to completion after the resume
    handle.push_inbound(end_ack_frame());
    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::JobState {
            job,
            state: JobState::Completed
        } if *job == id
    ))
    .is_some());
}

// ============================================================================
// LINK LOSS
// ============================================================================

#[test]
fn test_link_loss_fails_active_job_with_disconnected() {
    let (session, handle) = session();
    let events = session.subscribe();
    let id = session.submit(job(&[10])).unwrap();
    wait_until_streamed(&events, id);

    handle.drop_link();

    assert!(wait_for(&events, |e| matches!(e, SessionEvent::LinkLost)).is_some());
    assert_eq!(
        session.job_state(id),
        Some(JobState::Failed(DeviceError::Disconnected))
    );
    assert_eq!(session.connection_state(), ConnectionState::Lost);
    assert!(session.is_connected_kind().is_none());
    assert!(session.connected_printer_name().is_none());
}

#[test]
fn test_link_loss_fails_queued_jobs_too() {
    let (session, handle) = session();
    let events = session.subscribe();
    let active = session.submit(job(&[5])).unwrap();
    let queued = session.submit(job(&[1])).unwrap();
    wait_until_streamed(&events, active);

    handle.drop_link();
    assert!(wait_for(&events, |e| matches!(e, SessionEvent::LinkLost)).is_some());

    assert_eq!(
        session.job_state(queued),
        Some(JobState::Failed(DeviceError::Disconnected))
    );
}

#[test]
fn test_heartbeat_silence_declares_loss() {
    let (session, _handle) = session_with(SessionOptions {
        heartbeat_interval: Duration::from_millis(20),
        heartbeat_timeout: Duration::from_millis(100),
        ..SessionOptions::default()
    });
    let events = session.subscribe();

    // The mock never answers probes, so the silence window must trip
    assert!(wait_for(&events, |e| matches!(e, SessionEvent::LinkLost)).is_some());
    assert_eq!(session.connection_state(), ConnectionState::Lost);
}

#[test]
fn test_heartbeat_probes_are_sent() {
    let (session, handle) = session_with(SessionOptions {
        heartbeat_interval: Duration::from_millis(20),
        heartbeat_timeout: Duration::from_secs(60),
        ..SessionOptions::default()
    });
    let _events = session.subscribe();

    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if sent_kinds(&handle)
            .iter()
            .filter(|&&k| k == kind::HEARTBEAT)
            .count()
            >= 2
        {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("heartbeat probes were not sent");
}

// ============================================================================
// STATUS / PAPER QUERIES
// ============================================================================

#[test]
fn test_status_and_paper_queries_round_trip() {
    use rotulo::status::StatusEvent;

    let (session, handle) = session();
    let events = session.subscribe();

    session.query_status().unwrap();
    session.query_paper().unwrap();

    // Device answers with a cover report and paper geometry
    handle.push_inbound(Frame::new(kind::STATUS, vec![1, 0]).encode());
    let mut paper = vec![PaperStyle::Gap.code()];
    paper.extend_from_slice(&384u16.to_le_bytes());
    paper.extend_from_slice(&240u16.to_le_bytes());
    paper.extend_from_slice(&16u16.to_le_bytes());
    handle.push_inbound(Frame::new(kind::PAPER_INFO, paper).encode());

    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::Status(StatusEvent::Cover { closed: false })
    ))
    .is_some());
    assert!(wait_for(&events, |e| matches!(
        e,
        SessionEvent::PaperInfo(p) if p.width_px == 384 && p.gap_px == 16
    ))
    .is_some());

    let kinds = sent_kinds(&handle);
    assert!(kinds.contains(&kind::QUERY_STATUS));
    assert!(kinds.contains(&kind::QUERY_PAPER));
}

// ============================================================================
// RFID
// ============================================================================

#[test]
fn test_rfid_job_writes_epc_before_pages() {
    let (transport, handle) = MockTransport::new();
    let session = PrinterSession::connect_with(
        PrinterConfig::B32R,
        Box::new(transport),
        "B32R-TEST".to_string(),
        quiet_options(),
    );
    assert!(session.supports_rfid());

    let events = session.subscribe();
    let id = session.submit(job(&[1]).with_epc("E28011700000021")).unwrap();
    wait_until_streamed(&events, id);

    let kinds = sent_kinds(&handle);
    let rfid_pos = kinds.iter().position(|&k| k == kind::WRITE_RFID);
    let page_pos = kinds.iter().position(|&k| k == kind::PAGE_SIZE);
    assert!(rfid_pos.is_some());
    assert!(rfid_pos < page_pos);
}
