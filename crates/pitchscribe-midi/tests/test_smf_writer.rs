//! Reads pitchscribe MIDI output back with an independent SMF parser.

use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use pitchscribe_midi::{convert_to_midi, NoteSynthesizer, SynthesisOptions, TimingMode};
use pitchscribe_track::PitchTrack;
use pretty_assertions::assert_eq;

/// (absolute tick, key, is_note_on) for every channel event.
fn note_events(smf: &Smf) -> Vec<(u32, u8, bool)> {
    let mut tick = 0u32;
    let mut out = Vec::new();
    for event in &smf.tracks[0] {
        tick += event.delta.as_int();
        if let TrackEventKind::Midi { message, .. } = event.kind {
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    out.push((tick, key.as_int(), true))
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    out.push((tick, key.as_int(), false))
                }
                _ => {}
            }
        }
    }
    out
}

#[test]
fn test_reference_scenario_parses() {
    let bytes = convert_to_midi(&[440.0, 0.0, 880.0], &[0.9, 0.9, 0.4], &[0.0, 0.25, 0.5]).unwrap();
    let smf = Smf::parse(&bytes).expect("output must be a valid SMF");

    assert_eq!(smf.header.format, Format::SingleTrack);
    assert_eq!(smf.header.timing, Timing::Metrical(960.into()));
    assert_eq!(smf.tracks.len(), 1);

    let track = &smf.tracks[0];
    assert_eq!(
        track[0].kind,
        TrackEventKind::Meta(MetaMessage::TrackName(b"Voice Track"))
    );
    assert_eq!(
        track[1].kind,
        TrackEventKind::Meta(MetaMessage::Tempo(500_000.into()))
    );
    assert_eq!(
        track.last().map(|e| e.kind),
        Some(TrackEventKind::Meta(MetaMessage::EndOfTrack))
    );

    assert_eq!(note_events(&smf), vec![(0, 69, true), (240, 69, false)]);
}

#[test]
fn test_empty_input_parses_with_no_notes() {
    let bytes = convert_to_midi(&[], &[], &[]).unwrap();
    let smf = Smf::parse(&bytes).expect("output must be a valid SMF");
    assert_eq!(smf.tracks.len(), 1);
    assert!(note_events(&smf).is_empty());
    assert_eq!(smf.tracks[0].len(), 3);
}

#[test]
fn test_dense_track_pairs_every_note() {
    // A held A4 sampled every 10 ms, then a step down to E4
    let frames = 200;
    let times: Vec<f64> = (0..frames).map(|i| i as f64 * 0.01).collect();
    let frequencies: Vec<f64> = (0..frames)
        .map(|i| if i < 120 { 440.0 } else { 329.63 })
        .collect();
    let confidence = vec![0.95; frames];
    let track = PitchTrack::new(times, frequencies, confidence).unwrap();

    let rendered = NoteSynthesizer::default().render(&track).unwrap();
    assert_eq!(rendered.notes.len(), frames);

    let smf = Smf::parse(&rendered.bytes).expect("output must be a valid SMF");
    let events = note_events(&smf);

    let ons = events.iter().filter(|(_, _, on)| *on).count();
    let offs = events.len() - ons;
    assert_eq!(ons, offs);

    let mut sounding = [false; 128];
    for (_, key, on) in events {
        let key = key as usize;
        if on {
            assert!(!sounding[key], "key {} retriggered while sounding", key);
        } else {
            assert!(sounding[key], "key {} released while silent", key);
        }
        sounding[key] = on;
    }
    assert!(sounding.iter().all(|s| !s));
}

#[test]
fn test_wall_clock_timing_doubles_ticks_at_120_bpm() {
    let track = PitchTrack::from_slices(&[1.0], &[440.0], &[0.9]).unwrap();
    let synth = NoteSynthesizer::new(SynthesisOptions {
        timing: TimingMode::WallClock,
        ..Default::default()
    });
    let rendered = synth.render(&track).unwrap();
    let smf = Smf::parse(&rendered.bytes).unwrap();

    assert_eq!(note_events(&smf), vec![(1920, 69, true), (2400, 69, false)]);
}
