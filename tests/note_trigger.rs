mod common;

use common::{Call, RecordingBackend};
use tonebridge::audio::{Addressing, OscillatorBackend, Pitch, RampEnvelope, Render, Wave};
use tonebridge::{NoteName, NoteTrigger, PitchError};

fn recording() -> NoteTrigger<RecordingBackend> {
    NoteTrigger::new(RecordingBackend::new(Addressing::Frequency))
}

fn note(name: &str) -> NoteName {
    name.parse().unwrap()
}

#[test]
fn unlock_is_issued_once() {
    let mut trigger = recording();
    assert!(!trigger.is_unlocked());

    trigger.play("C4").unwrap();
    trigger.play("E4").unwrap();
    trigger.stop("C4");
    trigger.play("G4").unwrap();

    assert!(trigger.is_unlocked());
    assert_eq!(trigger.backend().count(|c| *c == Call::Unlock), 1);
    assert_eq!(trigger.backend().calls[0], Call::Unlock);
}

#[test]
fn duplicate_play_starts_one_voice() {
    let mut trigger = recording();

    assert_eq!(trigger.play("C4"), Ok(true));
    assert_eq!(trigger.play("C4"), Ok(false));

    assert_eq!(trigger.active_notes(), vec![note("C4")]);
    assert_eq!(
        trigger.backend().count(|c| matches!(c, Call::Attack(..))),
        1
    );
}

#[test]
fn double_stop_releases_once() {
    let mut trigger = recording();
    trigger.play("C4").unwrap();

    assert!(trigger.stop("C4"));
    assert!(!trigger.stop("C4"));

    assert!(!trigger.is_active("C4"));
    assert_eq!(
        trigger.backend().count(|c| matches!(c, Call::Release(..))),
        1
    );
}

#[test]
fn play_then_stop_reaches_backend_in_order() {
    let mut trigger = recording();
    trigger.backend_mut().now = 1.5;

    trigger.play("E4").unwrap();
    trigger.stop("E4");

    let calls = &trigger.backend().calls;
    assert_eq!(
        calls.as_slice(),
        &[
            Call::Unlock,
            Call::Attack(Pitch::Frequency(note("E4").frequency()), 1.5),
            Call::Release(1, 1.5),
        ]
    );
}

#[test]
fn release_uses_the_clock_at_stop_time() {
    let mut trigger = recording();
    trigger.play("A4").unwrap();
    trigger.backend_mut().now = 0.75;
    trigger.stop("A4");

    assert_eq!(trigger.backend().calls.last(), Some(&Call::Release(1, 0.75)));
}

#[test]
fn stop_without_play_is_ignored() {
    let mut trigger = recording();

    assert!(!trigger.stop("D4"));
    assert!(!trigger.stop("H4"));
    assert!(trigger.backend().calls.is_empty());
}

#[test]
fn unknown_note_is_a_lookup_error() {
    let mut trigger = recording();

    assert_eq!(
        trigger.play("H4"),
        Err(PitchError::UnknownPitch("H4".to_string()))
    );
    assert!(trigger.active_notes().is_empty());
    assert_eq!(
        trigger.backend().count(|c| matches!(c, Call::Attack(..))),
        0
    );
}

#[test]
fn release_all_clears_everything_in_one_call() {
    let mut trigger = recording();
    for name in ["C4", "E4", "G4"] {
        trigger.play(name).unwrap();
    }
    trigger.backend_mut().now = 2.0;

    let mut released = trigger.release_all();
    released.sort_by_key(|n| n.midi());

    assert_eq!(released, vec![note("C4"), note("E4"), note("G4")]);
    assert!(trigger.active_notes().is_empty());
    assert_eq!(
        trigger.backend().count(|c| matches!(c, Call::ReleaseAll(_))),
        1
    );
    assert_eq!(trigger.backend().calls.last(), Some(&Call::ReleaseAll(2.0)));

    // Held set is empty, so stop has nothing left to release.
    assert!(!trigger.stop("C4"));
}

#[test]
fn note_addressed_backend_gets_the_note_name() {
    let mut trigger = NoteTrigger::new(RecordingBackend::new(Addressing::Note));
    trigger.play("F#3").unwrap();

    assert_eq!(
        trigger.backend().calls[1],
        Call::Attack(Pitch::Note(note("F#3")), 0.0)
    );
}

#[test]
fn replay_after_stop_starts_a_new_voice() {
    let mut trigger = recording();
    trigger.play("C4").unwrap();
    trigger.stop("C4");

    assert_eq!(trigger.play("C4"), Ok(true));
    assert!(trigger.is_active("C4"));
    assert_eq!(
        trigger.backend().count(|c| matches!(c, Call::Attack(..))),
        2
    );
}

const SAMPLE_RATE: f32 = 1000.0;

fn square_trigger() -> NoteTrigger<OscillatorBackend> {
    NoteTrigger::new(OscillatorBackend::new(
        SAMPLE_RATE,
        Wave::Square,
        RampEnvelope::default(),
    ))
}

fn render(trigger: &mut NoteTrigger<OscillatorBackend>, frames: usize) -> Vec<f32> {
    let mut out = vec![0.0; frames];
    trigger.backend_mut().render(&mut out);
    out
}

#[test]
fn release_mid_attack_starts_from_current_level() {
    let mut trigger = square_trigger();
    trigger.play("C4").unwrap();

    // Half way through the 10 ms attack.
    let attack = render(&mut trigger, 5);
    let last_attack = attack[4].abs();
    assert!((last_attack - 0.2).abs() < 1e-4);

    trigger.stop("C4");
    let release = render(&mut trigger, 50);

    assert!((release[0].abs() - 0.25).abs() < 1e-4);
    assert!(release[0].abs() < 0.5);
    for pair in release.windows(2) {
        assert!(pair[1].abs() <= pair[0].abs());
    }
    // 49 ms into a 100 ms ramp down from 0.25.
    assert!((release[49].abs() - 0.1275).abs() < 1e-3);
}

#[test]
fn released_oscillator_is_removed_after_the_ramp() {
    let mut trigger = square_trigger();
    trigger.play("A4").unwrap();
    render(&mut trigger, 20);
    assert_eq!(trigger.backend().oscillator_count(), 1);

    trigger.stop("A4");
    render(&mut trigger, 50);
    assert_eq!(trigger.backend().oscillator_count(), 1);

    render(&mut trigger, 100);
    assert_eq!(trigger.backend().oscillator_count(), 0);
    assert!(render(&mut trigger, 10).iter().all(|s| *s == 0.0));
}

#[test]
fn release_all_silences_the_oscillator_backend() {
    let mut trigger = square_trigger();
    trigger.play("C4").unwrap();
    trigger.play("G4").unwrap();
    render(&mut trigger, 20);

    trigger.release_all();
    render(&mut trigger, 200);

    assert_eq!(trigger.backend().oscillator_count(), 0);
    assert!(trigger.active_notes().is_empty());
}

#[test]
fn every_attack_is_held_until_stopped() {
    let mut trigger = recording();
    for name in ["C4", "C#4", "C4", "D4", "C#4", "D#4"] {
        trigger.play(name).unwrap();
    }

    let attacks = trigger.backend().count(|c| matches!(c, Call::Attack(..)));
    assert_eq!(attacks, 4);
    assert_eq!(trigger.active_notes().len(), attacks);

    for name in ["C4", "C#4", "D4", "D#4"] {
        assert!(trigger.stop(name));
    }
    assert_eq!(
        trigger.backend().count(|c| matches!(c, Call::Release(..))),
        attacks
    );
}
