use emberglow::audio_engine::{crackle_queue, EngineControls};
use emberglow::fire_components::BurstState;
use emberglow::{
    CrackleEvent, EngineOptions, FireEngine, FireRenderer, FireTuning, OfflineSink,
};
use proptest::prelude::*;
use std::f32::consts::TAU;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const SR: u32 = 44_100;

fn renderer(tuning: &FireTuning, volume: f32, seed: u64) -> FireRenderer {
    let (_tx, rx) = crackle_queue();
    FireRenderer::new(
        SR as f32,
        tuning,
        Arc::new(EngineControls::new(volume)),
        rx,
        Some(seed),
    )
}

fn crackly_engine(channels: u16, volume: f32, seed: u64) -> FireEngine<OfflineSink> {
    let mut tuning = FireTuning::default();
    // Short gaps so a test run goes through plenty of crackles.
    tuning.crackle.delay_seconds = [0.01, 0.05];
    FireEngine::new(
        OfflineSink::new(SR, channels),
        EngineOptions {
            tuning,
            master_volume: Some(volume),
            seed: Some(seed),
            ..EngineOptions::default()
        },
    )
}

#[test]
fn five_seconds_at_half_volume_is_finite() {
    let mut engine = crackly_engine(1, 0.5, 11);
    engine.start().unwrap();

    let mut output = Vec::with_capacity(220_500);
    for _ in 0..50 {
        output.extend(engine.sink_mut().render_frames(4_410, 441));
        // Wall-clock time for the scheduler to queue triggers between blocks.
        thread::sleep(Duration::from_millis(5));
    }
    engine.stop();

    assert_eq!(output.len(), 220_500);
    assert!(output.iter().all(|s| s.is_finite()));
    assert!(output.iter().all(|s| s.abs() < 0.5));
    assert!(engine.crackle_triggers_sent() > 0, "no crackle was scheduled");
}

#[test]
fn scheduled_crackle_reaches_the_renderer() {
    let mut engine = crackly_engine(2, 1.0, 12);
    engine.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut burst_seen = false;
    while !burst_seen && Instant::now() < deadline {
        engine.sink_mut().render_frames(64, 64);
        burst_seen = engine
            .sink()
            .renderer()
            .map_or(false, |r| r.crackle().state() == BurstState::Bursting);
        thread::sleep(Duration::from_millis(1));
    }
    assert!(burst_seen, "no scheduled crackle started a burst within 5 s");
    assert!(engine.crackle_triggers_sent() > 0);
}

#[test]
fn phases_stay_wrapped_for_ten_minutes() {
    let mut r = renderer(&FireTuning::default(), 1.0, 1);
    let mut buf = vec![0.0; 1024];
    let total = 10 * 60 * SR as usize;
    let mut rendered = 0;
    while rendered < total {
        let n = buf.len().min(total - rendered);
        r.process_buffer(&mut buf[..n], 1);
        rendered += n;
        for p in r.phases() {
            assert!((0.0..TAU).contains(&p), "phase {p} after {rendered} samples");
        }
    }
}

#[test]
fn queued_crackle_changes_output_then_ends() {
    let mut tuning = FireTuning::default();
    tuning.fade_in_seconds = 0.0;
    let mut with_burst = renderer(&tuning, 1.0, 8);
    let mut without = renderer(&tuning, 1.0, 8);

    with_burst.trigger_crackle(CrackleEvent {
        delay_seconds: 0.0,
        burst_duration_frames: 300,
        peak_amplitude: 0.02,
    });
    assert_eq!(with_burst.crackle().state(), BurstState::Bursting);
    let mut differing = 0;
    for _ in 0..300 {
        if with_burst.next_sample(1.0) != without.next_sample(1.0) {
            differing += 1;
        }
    }
    assert!(differing > 0);
    assert_eq!(with_burst.crackle().state(), BurstState::Idle);
    assert_eq!(with_burst.crackle().frames_remaining(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn output_is_bounded_by_volume_after_fade_in(volume in 0.0f32..=1.0, seed in any::<u64>()) {
        let mut tuning = FireTuning::default();
        tuning.fade_in_seconds = 0.01;
        let mut r = renderer(&tuning, volume, seed);
        // Oversized bursts lean on the soft clipper.
        r.trigger_crackle(CrackleEvent { delay_seconds: 0.0, burst_duration_frames: 2_000, peak_amplitude: 50.0 });
        let mut buf = vec![0.0; 512];
        for i in 0..40 {
            r.process_buffer(&mut buf, 1);
            if i > 0 {
                for &s in &buf {
                    prop_assert!(s.is_finite());
                    prop_assert!(s.abs() <= volume, "{} > {}", s, volume);
                }
            }
        }
    }
}
