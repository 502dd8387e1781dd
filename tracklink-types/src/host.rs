//! Host control surface.
//!
//! `HostControl` is the slice of the host application that remote actions and
//! evaluated expressions may touch: transport, tempo, edit settings, tracks and
//! note triggering. The dispatch core only calls into it; hosts implement it.

use std::ops::RangeInclusive;

/// Beats per minute accepted by the host.
pub const BPM_RANGE: RangeInclusive<f64> = 32.0..=999.0;
/// Lines per beat accepted by the host.
pub const LPB_RANGE: RangeInclusive<u32> = 1..=255;
pub const OCTAVE_RANGE: RangeInclusive<u8> = 0..=8;
pub const EDIT_STEP_RANGE: RangeInclusive<u8> = 0..=64;
/// Linear post-fx track volume (0 dB = 1.0, max +3 dB).
pub const TRACK_VOLUME_RANGE: RangeInclusive<f64> = 0.0..=1.4125;
pub const TRACK_PANNING_RANGE: RangeInclusive<f64> = -1.0..=1.0;
pub const NOTE_RANGE: RangeInclusive<u8> = 0..=119;
pub const VELOCITY_RANGE: RangeInclusive<u8> = 0..=127;

/// Semantic-level host operations.
///
/// Track and instrument indices are 0-based and already bounds-checked by the
/// caller; numeric setters receive values inside the documented ranges above.
pub trait HostControl: Send {
    // Transport
    fn start_playing(&mut self);
    fn stop_playing(&mut self);
    fn continue_playing(&mut self);
    /// Stop playback and silence all voices.
    fn panic(&mut self);
    fn is_playing(&self) -> bool;
    fn loop_pattern(&self) -> bool;
    fn set_loop_pattern(&mut self, enabled: bool);

    // Tempo
    fn bpm(&self) -> f64;
    fn set_bpm(&mut self, bpm: f64);
    fn lpb(&self) -> u32;
    fn set_lpb(&mut self, lpb: u32);

    // Editing
    fn set_edit_mode(&mut self, enabled: bool);
    fn set_octave(&mut self, octave: u8);
    fn set_edit_step(&mut self, step: u8);
    fn set_metronome(&mut self, enabled: bool);

    // Tracks
    fn track_count(&self) -> usize;
    fn selected_track(&self) -> usize;
    fn track_name(&self, track: usize) -> String;
    fn set_track_mute(&mut self, track: usize, muted: bool);
    fn solo_track(&mut self, track: usize);
    fn track_volume(&self, track: usize) -> f64;
    fn set_track_volume(&mut self, track: usize, volume: f64);
    fn set_track_panning(&mut self, track: usize, panning: f64);

    // Instruments
    fn instrument_count(&self) -> usize;
    fn selected_instrument(&self) -> usize;
    fn note_on(&mut self, instrument: usize, track: usize, note: u8, velocity: u8);
    fn note_off(&mut self, instrument: usize, track: usize, note: u8);
}

/// Resolve a remote (1-based) index against a collection of `count` items.
///
/// `-1` and `0` address the currently selected item. Returns `None` when the
/// index is out of range.
pub fn resolve_index(raw: i64, count: usize, selected: usize) -> Option<usize> {
    match raw {
        -1 | 0 => (selected < count).then_some(selected),
        n if n >= 1 && (n as u64) <= count as u64 => Some(n as usize - 1),
        _ => None,
    }
}
