//! End-to-end behaviour of animated scalars driven by real and manual hosts

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use feather_animation::{
    AnimatedScalar, Algorithm, BackgroundHost, FeatherConfig, ManualHost, MotionParams,
    MotionState,
};

#[derive(Clone, Copy, Debug, PartialEq)]
enum Event {
    Value(f64),
    Notify,
}

type EventLog = Arc<Mutex<Vec<Event>>>;

fn recorded(host: &Arc<ManualHost>, config: FeatherConfig) -> (AnimatedScalar, EventLog) {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let values = events.clone();
    let notifies = events.clone();

    let scalar = AnimatedScalar::builder(host.clone())
        .config(config)
        .on_value(move |v| values.lock().unwrap().push(Event::Value(v)))
        .on_notify(move || notifies.lock().unwrap().push(Event::Notify))
        .build();

    (scalar, events)
}

/// Values delivered by frames, each paired with whether a notify followed it
fn frames(events: &EventLog) -> Vec<(f64, bool)> {
    let events = events.lock().unwrap();
    let mut frames = Vec::new();
    for (i, event) in events.iter().enumerate() {
        if let Event::Value(v) = event {
            let notified = matches!(events.get(i + 1), Some(Event::Notify));
            frames.push((*v, notified));
        }
    }
    frames
}

#[test]
fn spring_comes_to_rest_without_touching_target() {
    let host = Arc::new(ManualHost::new());
    let (scalar, events) = recorded(&host, FeatherConfig::new(0.0).with_threshold(-1.0));

    scalar.attach();
    scalar.set_target(500.0);
    events.lock().unwrap().clear();

    let presented = host.run_until_idle(16.0, 500);

    assert!(presented < 500, "spring did not settle in 500 frames");
    assert!(scalar.is_at_rest());
    assert!(!scalar.is_running());
    assert_eq!(scalar.target(), 500.0);
    assert!((scalar.value() - 500.0).abs() < 0.1);

    // One value per frame, and the only notify is the final rest
    let frames = frames(&events);
    assert_eq!(frames.len(), presented);
    assert_eq!(frames.iter().filter(|(_, notified)| *notified).count(), 1);
    assert!(frames.last().unwrap().1);
}

#[test]
fn first_frame_matches_hand_computed_step() {
    let host = Arc::new(ManualHost::new());
    let scalar = AnimatedScalar::new(host.clone(), FeatherConfig::new(0.0));

    scalar.set_target(-500.0);
    host.frame(16.0);

    assert_eq!(scalar.velocity(), -1360.0);
    assert_eq!(scalar.value(), -21.76);
}

#[test]
fn decay_rises_monotonically_without_overshoot() {
    let host = Arc::new(ManualHost::new());
    let config = FeatherConfig::new(0.0)
        .with_algorithm(Algorithm::Decay)
        .with_decay(1.0);
    let (scalar, events) = recorded(&host, config);

    scalar.set_target(100.0);
    for _ in 0..300 {
        host.step_frame(16.0);
    }

    let values: Vec<f64> = frames(&events).into_iter().map(|(v, _)| v).collect();
    assert_eq!(values.len(), 300);
    assert!(values.windows(2).all(|pair| pair[1] > pair[0]));
    assert!(values.iter().all(|v| *v < 100.0));
}

#[test]
fn threshold_crossing_notifies_exactly_once() {
    let host = Arc::new(ManualHost::new());
    let config = FeatherConfig::new(90.0)
        .with_algorithm(Algorithm::Decay)
        .with_decay(4.0)
        .with_threshold(100.0);
    let (scalar, events) = recorded(&host, config);

    scalar.set_target(110.0);
    assert_eq!(*events.lock().unwrap(), vec![Event::Notify]);
    events.lock().unwrap().clear();

    host.run_until_idle(16.0, 1000);
    assert!(scalar.is_at_rest());

    let frames = frames(&events);
    let mut previous = 90.0;
    let mut crossings = 0;
    for (i, (value, notified)) in frames.iter().enumerate() {
        let crossed = (previous > 100.0) != (*value > 100.0);
        let last = i == frames.len() - 1;
        assert_eq!(*notified, crossed || last, "frame {i} value {value}");
        if crossed {
            crossings += 1;
        }
        previous = *value;
    }
    assert_eq!(crossings, 1);
}

#[test]
fn threshold_crossing_downward_also_notifies() {
    let host = Arc::new(ManualHost::new());
    let config = FeatherConfig::new(110.0)
        .with_algorithm(Algorithm::Decay)
        .with_decay(4.0)
        .with_threshold(100.0);
    let (scalar, events) = recorded(&host, config);

    assert!(scalar.is_above_threshold());
    scalar.set_target(90.0);
    events.lock().unwrap().clear();
    host.run_until_idle(16.0, 1000);

    assert!(!scalar.is_above_threshold());
    let notifies = frames(&events).iter().filter(|(_, n)| *n).count();
    // Crossing plus rest
    assert_eq!(notifies, 2);
}

#[test]
fn retargeting_to_same_value_is_silent() {
    let host = Arc::new(ManualHost::new());
    let (scalar, events) = recorded(&host, FeatherConfig::new(0.0));

    scalar.set_target(250.0);
    host.step_frame(16.0);
    host.step_frame(16.0);
    let velocity = scalar.velocity();
    let before = events.lock().unwrap().len();

    scalar.set_target(250.0);

    assert_eq!(events.lock().unwrap().len(), before);
    assert_eq!(scalar.velocity(), velocity);
}

#[test]
fn later_delayed_target_replaces_earlier_one() {
    let host = Arc::new(ManualHost::new());
    let (scalar, _events) = recorded(&host, FeatherConfig::new(0.0));
    let targets = Arc::new(Mutex::new(Vec::new()));

    let handle = scalar.handle();
    let seen = targets.clone();
    scalar.set_consumer(move |_| {
        if let Some(target) = handle.target() {
            seen.lock().unwrap().push(target);
        }
    });

    scalar.set_target_delayed(100.0, Duration::from_millis(50));
    scalar.set_target_delayed(200.0, Duration::from_millis(50));

    host.run_until_idle(16.0, 10);
    assert_eq!(scalar.target(), 0.0);

    host.advance(60.0);
    assert_eq!(scalar.target(), 200.0);
    host.run_until_idle(16.0, 1000);

    let targets = targets.lock().unwrap();
    assert!(!targets.is_empty());
    assert!(targets.iter().all(|t| *t == 200.0));
}

#[test]
fn at_most_one_frame_is_ever_pending() {
    let host = Arc::new(ManualHost::new());
    let scalar = AnimatedScalar::new(host.clone(), FeatherConfig::new(0.0));

    for i in 1..=20 {
        scalar.set_target(f64::from(i) * 10.0);
        assert!(host.pending_frames() <= 1);
        if i % 3 == 0 {
            host.step_frame(16.0);
            assert!(host.pending_frames() <= 1);
        }
    }

    scalar.stop();
    assert_eq!(host.pending_frames(), 0);
    assert_eq!(host.step_frame(16.0), 0);
}

#[test]
fn stalled_host_steps_at_most_40ms() {
    let host = Arc::new(ManualHost::new());
    let scalar = AnimatedScalar::new(host.clone(), FeatherConfig::new(0.0));

    scalar.set_target(100.0);
    host.frame(5000.0);

    let expected = MotionState {
        value: 0.0,
        velocity: 0.0,
        target: 100.0,
    }
    .step(&MotionParams::default(), 0.040);
    assert_eq!(scalar.value(), expected.value);
    assert!((scalar.value() - 27.2).abs() < 1e-9);
    assert!((scalar.velocity() - 680.0).abs() < 1e-9);
}

#[test]
fn many_scalars_share_one_host() {
    let host = Arc::new(ManualHost::new());
    let near = AnimatedScalar::new(host.clone(), FeatherConfig::new(0.0));
    let far = AnimatedScalar::new(host.clone(), FeatherConfig::new(0.0));

    near.set_target(10.0);
    far.set_target(1000.0);
    assert_eq!(host.pending_frames(), 2);

    host.run_until_idle(16.0, 1000);
    assert!(near.is_at_rest());
    assert!(far.is_at_rest());
}

#[test]
fn switching_algorithm_mid_flight() {
    let host = Arc::new(ManualHost::new());
    let scalar = AnimatedScalar::new(host.clone(), FeatherConfig::new(0.0));

    scalar.set_target(100.0);
    host.step_frame(16.0);
    scalar.set_algorithm(Algorithm::Decay);
    let before = scalar.value();
    host.step_frame(16.0);

    // Decay velocity depends only on the remaining distance
    let expected_velocity = 1.0 * (100.0 - before);
    assert!((scalar.velocity() - expected_velocity).abs() < 1e-9);
}

#[test]
fn headless_host_keeps_targets_but_never_moves() {
    let host = Arc::new(ManualHost::headless());
    let (scalar, events) = recorded(&host, FeatherConfig::new(0.0));

    scalar.set_target(100.0);
    host.frame(16.0);

    assert_eq!(scalar.value(), 0.0);
    assert_eq!(scalar.target(), 100.0);
    assert!(!scalar.is_running());
    assert_eq!(*events.lock().unwrap(), vec![Event::Notify]);
}

#[test]
fn background_host_animates_in_real_time() {
    let host = Arc::new(BackgroundHost::new());
    host.start();

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let scalar = AnimatedScalar::builder(host.clone())
        .config(FeatherConfig::new(0.0).with_threshold(-1.0))
        .on_notify(move || {
            let _ = tx.lock().unwrap().send(());
        })
        .build();

    scalar.set_target(100.0);
    // The target change itself
    rx.recv_timeout(Duration::from_secs(1)).unwrap();
    // Coming to rest
    rx.recv_timeout(Duration::from_secs(10)).unwrap();

    assert!(scalar.is_at_rest());
    assert!(!scalar.is_running());
    assert!((scalar.value() - 100.0).abs() < 0.1);

    let handle = scalar.handle();
    drop(scalar);
    assert!(!handle.is_alive());
    host.stop();
}

#[test]
fn stop_waits_for_callbacks_on_the_frame_thread() {
    let host = Arc::new(BackgroundHost::new());
    host.start();

    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();
    let notified = delivered.clone();
    let scalar = AnimatedScalar::builder(host.clone())
        .config(FeatherConfig::new(0.0).with_epsilon(0.0))
        .on_value(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            // Widen the window in which stop can land mid-dispatch
            thread::sleep(Duration::from_millis(2));
        })
        .on_notify(move || {
            notified.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    scalar.set_target(1000.0);
    let deadline = Instant::now() + Duration::from_secs(5);
    while delivered.load(Ordering::SeqCst) < 5 {
        assert!(Instant::now() < deadline, "frames never ran");
        thread::sleep(Duration::from_millis(1));
    }

    scalar.stop();
    let at_stop = delivered.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));

    assert_eq!(delivered.load(Ordering::SeqCst), at_stop);
    host.stop();
}

#[test]
fn huge_delay_on_background_host_is_accepted() {
    let host = Arc::new(BackgroundHost::new());
    host.start();
    let scalar = AnimatedScalar::new(host.clone(), FeatherConfig::new(0.0));

    scalar.set_target_delayed(10.0, Duration::MAX);
    assert!(scalar.has_pending_target());

    thread::sleep(Duration::from_millis(30));
    assert_eq!(scalar.target(), 0.0);

    // An immediate target still cancels it
    scalar.set_target(5.0);
    assert!(!scalar.has_pending_target());
    host.stop();
}
