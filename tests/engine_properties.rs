//! Engine property tests
//!
//! Invariants of the shard/layer engine checked over many seeds and long
//! renders, using in-memory collaborators only.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use shatter::config::ShatterConfig;
use shatter::engine::{
    generate_test_tone, AudioBuffer, Engine, EngineSettings, EngineState, MemorySink,
};
use shatter::granular::{CrossingIndex, Shard, ShardBounds, SplitMode};
use shatter::ShatterError;

fn tone(secs: f32) -> AudioBuffer {
    generate_test_tone(220.0, secs, 48000).unwrap()
}

fn settings_for(config: &ShatterConfig, buffer: &AudioBuffer) -> EngineSettings {
    config
        .engine_settings(buffer.sample_rate(), buffer.len())
        .unwrap()
}

#[test]
fn test_shards_always_within_bounds() {
    let buffer = tone(1.0);
    let index = CrossingIndex::build_full(&buffer, SplitMode::NearZero(0.05));
    let bounds = ShardBounds::new(2976, 23760).unwrap();

    for seed in 0..500 {
        let mut rng = StdRng::seed_from_u64(seed);
        let shard = Shard::select(&index, bounds, &mut rng).unwrap();
        assert!(shard.start() < shard.end());
        assert!(shard.len() >= bounds.min && shard.len() <= bounds.max);
        assert!(shard.end() < buffer.len());
    }
}

#[test]
fn test_absurd_shard_lengths_are_degenerate() {
    let buffer = tone(1.0);
    let config = ShatterConfig::new(1.0, 2)
        .with_split_mode(SplitMode::Unrestricted)
        .with_shard_ms(1e300, 1e300);
    assert!(config.validate().is_ok());

    let settings = settings_for(&config, &buffer);
    assert_eq!(settings.bounds.min, usize::MAX);

    let result = Engine::with_seed(buffer, settings, Some(1));
    assert!(matches!(result, Err(ShatterError::DegenerateInput { .. })));
}

#[test]
fn test_crossing_index_ascending_with_guard() {
    let buffer = tone(1.0);
    for mode in [
        SplitMode::ExactZero,
        SplitMode::NearZero(0.1),
        SplitMode::Unrestricted,
    ] {
        let index = CrossingIndex::build(&buffer, 1000, 30000, mode);
        assert!(index.points().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*index.points().last().unwrap(), 30000);
        assert!(index.points().iter().all(|&p| p >= 1000));
    }
}

#[test]
fn test_cursor_never_leaves_buffer() {
    let buffer = tone(0.1);
    let len = buffer.len();
    let config = ShatterConfig::new(1.0, 3)
        .with_split_mode(SplitMode::Unrestricted)
        .with_shard_ms(5.0, 40.0)
        .with_bias(0.5);
    let mut settings = settings_for(&config, &buffer);
    settings.length = 10 * len;
    settings.block_size = 1;

    let mut engine = Engine::with_seed(buffer, settings, Some(99)).unwrap();
    let mut block = Vec::new();
    let mut ticks = 0;
    while engine.state() != EngineState::Done {
        engine.process_block(&mut block).unwrap();
        ticks += block.len();
        for layer in engine.layers() {
            assert!(layer.cursor() < len, "cursor {} out of range", layer.cursor());
        }
    }
    assert!(ticks >= 10 * len);
}

#[test]
fn test_tail_disabled_exact_length() {
    for (secs, seed) in [(0.0, 1), (0.01, 2), (0.5, 3), (1.2345, 4)] {
        let buffer = tone(0.5);
        let config = ShatterConfig::new(secs, 3)
            .with_split_mode(SplitMode::NearZero(0.05))
            .with_shard_ms(10.0, 200.0)
            .with_tail(false);
        let settings = settings_for(&config, &buffer);
        let requested = settings.length;

        let mut engine = Engine::with_seed(buffer, settings, Some(seed)).unwrap();
        let mut sink = MemorySink::new();
        let summary = engine.run(&mut sink, None).unwrap();

        assert_eq!(summary.written, requested);
        assert_eq!(sink.samples().len(), requested);
    }
}

#[test]
fn test_tail_enabled_terminates_past_length() {
    for seed in 0..20 {
        let buffer = tone(0.25);
        let len = buffer.len();
        let config = ShatterConfig::new(0.6, 5)
            .with_split_mode(SplitMode::NearZero(0.05))
            .with_shard_ms(10.0, 100.0)
            .with_bias(0.9);
        let settings = settings_for(&config, &buffer);
        let requested = settings.length;

        let mut engine = Engine::with_seed(buffer, settings, Some(seed)).unwrap();
        let mut sink = MemorySink::new();
        let summary = engine.run(&mut sink, None).unwrap();

        assert!(summary.written >= requested);
        assert!(summary.written <= requested + len);
        assert!(engine.layers().iter().all(|l| !l.is_active()));
    }
}

#[test]
fn test_amplitude_invariant() {
    let buffer = tone(0.5);
    let config = ShatterConfig::new(1.0, 4)
        .with_split_mode(SplitMode::NearZero(0.05))
        .with_shard_ms(10.0, 50.0);
    let mut settings = settings_for(&config, &buffer);
    settings.block_size = 1;

    let mut engine = Engine::with_seed(buffer, settings, Some(5)).unwrap();
    let mut block = Vec::new();
    let mut saw_tail = false;

    loop {
        for layer in engine.layers() {
            if layer.shard().is_looping() {
                assert_eq!(layer.amplitude(), layer.loop_gain());
            } else {
                assert_eq!(layer.amplitude(), layer.flat_gain());
            }
        }
        if engine.state() == EngineState::Done {
            break;
        }
        saw_tail |= engine.state() == EngineState::Tail;
        engine.process_block(&mut block).unwrap();
    }

    assert!(saw_tail);
    let layer = &engine.layers()[0];
    assert_relative_eq!(layer.loop_gain(), 0.5);
    assert_relative_eq!(layer.flat_gain(), 0.25);
}

#[test]
fn test_seeded_scenario_is_reproducible() {
    // 1 s at 48 kHz, 3 layers, 2 s requested, 62..495 ms shards, bias 0.75
    let run = |seed: u64| {
        let buffer = tone(1.0);
        let mut config = ShatterConfig::new(2.0, 3)
            .with_split_mode(SplitMode::NearZero(0.05))
            .with_shard_ms(62.0, 495.0)
            .with_bias(0.75)
            .with_seed(seed);
        config.diagnostics = true;
        let settings = settings_for(&config, &buffer);

        let mut engine = Engine::with_seed(buffer, settings, config.seed).unwrap();
        let mut sink = MemorySink::new();
        let summary = engine.run(&mut sink, None).unwrap();
        (summary, sink.into_samples())
    };

    let (first, first_out) = run(2024);
    let (second, second_out) = run(2024);
    let (other, _) = run(2025);

    assert_eq!(first.shards, second.shards);
    assert_eq!(first_out, second_out);
    assert_ne!(first.shards, other.shards);

    for event in &first.shards {
        assert!(event.end - event.start >= 2976);
        assert!(event.end - event.start <= 23760);
    }
}
