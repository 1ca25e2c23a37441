use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tandem_engine::device::{FatalError, GpuContext, HeadlessContext};
use tandem_engine::handoff::{NoopWaker, Role};
use tandem_engine::logging::{init_logging, LoggingConfig};
use tandem_engine::render::{FailStage, HeadlessBackend};
use tandem_engine::widget::{GlWidget, HeadlessHarness, WidgetConfig};

const TIMEOUT: Duration = Duration::from_secs(5);

fn quiet_config() -> (WidgetConfig, Arc<AtomicUsize>) {
    init_logging(LoggingConfig {
        env_filter: Some("warn".to_string()),
        ..LoggingConfig::default()
    });

    let fatal_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fatal_calls);
    let config = WidgetConfig {
        resize_settle: Duration::ZERO,
        ..WidgetConfig::default()
    }
    .with_fatal_handler(Arc::new(move |_: &FatalError| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    (config, fatal_calls)
}

fn overlaps(a: (Instant, Instant), b: (Instant, Instant)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

// ── steady state ──────────────────────────────────────────────────────────

#[test]
fn ten_vsync_cycles_rotate_ten_degrees() {
    let (config, fatal_calls) = quiet_config();
    let mut h = HeadlessHarness::new(config, Duration::from_millis(2)).unwrap();
    h.run_cycles(10, TIMEOUT).unwrap();

    let stats = h.widget().stats();
    assert_eq!(stats.frames_drawn, 10);
    assert_eq!(stats.angle, 10.0);
    assert!(stats.fatal.is_none());

    let context = Arc::clone(h.context());
    let owner = thread::current().id();
    let report = h.finish();

    assert_eq!(fatal_calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.draws, 10);
    assert_eq!(report.violations, 0);
    assert_eq!(context.current_thread(), None);
    assert_eq!(context.thread(), owner);
}

#[test]
fn draws_happen_on_render_thread_only() {
    let (config, _) = quiet_config();
    let mut h = HeadlessHarness::new(config, Duration::from_millis(1)).unwrap();
    h.run_cycles(4, TIMEOUT).unwrap();

    let worker = h.widget().coordinator().worker_thread().unwrap();
    let log = h.draw_log().lock();
    assert!(log.draws.iter().all(|d| d.thread == worker));
    assert_eq!(log.initializations, 1);
}

#[test]
fn composition_never_overlaps_drawing() {
    let (config, _) = quiet_config();
    let mut h = HeadlessHarness::with_backend(config, Duration::from_millis(3), |ctx| {
        HeadlessBackend::new(ctx).draw_time(Duration::from_millis(3))
    })
    .unwrap();
    h.run_cycles(8, TIMEOUT).unwrap();

    let log = h.draw_log().lock();
    for draw in &log.draws {
        for &composition in h.compositions() {
            assert!(
                !overlaps((draw.started, draw.ended), composition),
                "frame {} overlapped a composition",
                draw.frame_index
            );
        }
    }
}

// ── shutdown ──────────────────────────────────────────────────────────────

#[test]
fn exit_while_render_thread_waits_for_context() {
    let (config, _) = quiet_config();
    let mut widget = GlWidget::new(config, Arc::new(NoopWaker)).unwrap();
    let context = Arc::new(HeadlessContext::for_current_thread());
    let backend = HeadlessBackend::new(context.clone());
    let log = backend.log();
    widget.initialize_gl(context.clone(), Box::new(backend)).unwrap();

    // Never answered: the render thread blocks in its context request.
    widget.request_render();
    thread::sleep(Duration::from_millis(30));

    let started = Instant::now();
    widget.shutdown();
    assert!(started.elapsed() < TIMEOUT);

    assert!(!widget.is_running());
    assert_eq!(log.lock().draw_count(), 0);
    assert_eq!(context.thread(), thread::current().id());
    assert_eq!(widget.coordinator().render_lock_holder(), None);
    assert!(widget.stats().aborted <= 1);
}

#[test]
fn no_draw_after_exit_requested() {
    let (config, _) = quiet_config();
    let mut h = HeadlessHarness::new(config, Duration::from_millis(1)).unwrap();
    h.run_cycles(2, TIMEOUT).unwrap();

    h.widget().coordinator().prepare_exit();
    h.compose().unwrap();
    // Whatever the render thread does now must not reach the backend.
    assert!(h.widget().wait_event(Duration::from_millis(50)).is_none());

    let report = h.finish();
    assert_eq!(report.draws, 2);
}

#[test]
fn dropping_widget_joins_render_thread() {
    let (config, _) = quiet_config();
    let mut h = HeadlessHarness::new(config, Duration::from_millis(1)).unwrap();
    h.run_cycles(1, TIMEOUT).unwrap();
    let coordinator = Arc::clone(h.widget().coordinator());
    drop(h);

    assert!(coordinator.is_exiting());
    assert!(coordinator.context().is_none());
}

// ── resize ────────────────────────────────────────────────────────────────

#[test]
fn resize_during_pending_request_does_not_deadlock() {
    let (config, _) = quiet_config();
    let mut h = HeadlessHarness::new(config, Duration::from_millis(1)).unwrap();
    h.run_cycles(1, TIMEOUT).unwrap();

    // Frame 2 is requested but its context request is left pending.
    h.widget().request_render();
    thread::sleep(Duration::from_millis(20));

    let widget = h.widget_mut();
    widget.on_about_to_resize();
    assert_eq!(widget.coordinator().render_lock_holder(), Some(Role::Owner));
    widget.set_size(800, 600);
    widget.on_resized();
    assert_eq!(widget.coordinator().render_lock_holder(), None);

    // Granting afterwards lets the frame through.
    let deadline = Instant::now() + TIMEOUT;
    while h.widget().stats().frames_drawn < 2 {
        assert!(Instant::now() < deadline, "frame after resize never arrived");
        h.widget().wait_event(Duration::from_millis(20));
    }
    assert_eq!(h.finish().violations, 0);
}

// ── fatal paths ───────────────────────────────────────────────────────────

#[test]
fn fatal_draw_error_is_reported_once_and_context_returns() {
    let (config, fatal_calls) = quiet_config();
    let mut h = HeadlessHarness::with_backend(config, Duration::from_millis(1), |ctx| {
        HeadlessBackend::new(ctx).fail_at(FailStage::ProgramBind)
    })
    .unwrap();

    assert!(h.run_cycles(3, TIMEOUT).is_err());
    assert!(matches!(h.widget().stats().fatal, Some(FatalError::ProgramBind(_))));

    let context = Arc::clone(h.context());
    let report = h.finish();

    assert_eq!(fatal_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.draws, 0);
    assert_eq!(context.thread(), thread::current().id());
    assert_eq!(context.current_thread(), None);
}

#[test]
fn buffer_too_large_is_fatal() {
    let (config, fatal_calls) = quiet_config();
    let mut h = HeadlessHarness::with_backend(config, Duration::from_millis(1), |ctx| {
        HeadlessBackend::new(ctx).fail_at(FailStage::BufferBind)
    })
    .unwrap();

    assert!(h.run_cycles(1, TIMEOUT).is_err());
    h.finish();
    assert_eq!(fatal_calls.load(Ordering::SeqCst), 1);
}

// ── shared compiler ───────────────────────────────────────────────────────

#[test]
fn shader_compiles_are_serialized_across_widgets() {
    let spawn_owner = || {
        thread::spawn(|| {
            let (config, _) = quiet_config();
            let mut h = HeadlessHarness::with_backend(config, Duration::from_millis(1), |ctx| {
                HeadlessBackend::new(ctx).compile_time(Duration::from_millis(25))
            })
            .unwrap();
            h.run_cycles(1, TIMEOUT).unwrap();
            let intervals = h.draw_log().lock().compile_intervals.clone();
            h.finish();
            intervals
        })
    };

    let a = spawn_owner();
    let b = spawn_owner();
    let a = a.join().unwrap();
    let b = b.join().unwrap();

    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert!(!overlaps(a[0], b[0]));
}
