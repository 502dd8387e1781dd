//! In-memory host.
//!
//! `MemoryHost` keeps just enough song state to stand in for a real host:
//! the server binary drives it when no host application is attached, and the
//! tests assert against its fields.

use log::debug;

use tracklink_types::HostControl;

const DEFAULT_TRACK_COUNT: usize = 8;
const DEFAULT_INSTRUMENT_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackState {
    pub name: String,
    pub muted: bool,
    pub solo: bool,
    pub volume: f64,
    pub panning: f64,
}

impl TrackState {
    fn new(name: String) -> Self {
        Self {
            name,
            muted: false,
            solo: false,
            volume: 1.0,
            panning: 0.0,
        }
    }
}

/// A triggered note, recorded in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    On {
        instrument: usize,
        track: usize,
        note: u8,
        velocity: u8,
    },
    Off {
        instrument: usize,
        track: usize,
        note: u8,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryHost {
    pub playing: bool,
    pub loop_pattern: bool,
    pub bpm: f64,
    pub lpb: u32,
    pub edit_mode: bool,
    pub octave: u8,
    pub edit_step: u8,
    pub metronome: bool,
    pub tracks: Vec<TrackState>,
    pub selected_track: usize,
    pub instrument_count: usize,
    pub selected_instrument: usize,
    pub notes: Vec<NoteEvent>,
    pub panic_count: usize,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::with_tracks(DEFAULT_TRACK_COUNT)
    }

    pub fn with_tracks(count: usize) -> Self {
        Self {
            playing: false,
            loop_pattern: false,
            bpm: 120.0,
            lpb: 4,
            edit_mode: false,
            octave: 4,
            edit_step: 1,
            metronome: false,
            tracks: (1..=count)
                .map(|i| TrackState::new(format!("Track {:02}", i)))
                .collect(),
            selected_track: 0,
            instrument_count: DEFAULT_INSTRUMENT_COUNT,
            selected_instrument: 0,
            notes: Vec::new(),
            panic_count: 0,
        }
    }

    fn track_mut(&mut self, track: usize) -> Option<&mut TrackState> {
        let t = self.tracks.get_mut(track);
        if t.is_none() {
            debug!(target: "host", "ignoring access to missing track {}", track);
        }
        t
    }
}

impl HostControl for MemoryHost {
    fn start_playing(&mut self) {
        debug!(target: "host", "start");
        self.playing = true;
    }

    fn stop_playing(&mut self) {
        debug!(target: "host", "stop");
        self.playing = false;
    }

    fn continue_playing(&mut self) {
        self.playing = true;
    }

    fn panic(&mut self) {
        debug!(target: "host", "panic");
        self.playing = false;
        self.panic_count += 1;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn loop_pattern(&self) -> bool {
        self.loop_pattern
    }

    fn set_loop_pattern(&mut self, enabled: bool) {
        self.loop_pattern = enabled;
    }

    fn bpm(&self) -> f64 {
        self.bpm
    }

    fn set_bpm(&mut self, bpm: f64) {
        debug!(target: "host", "bpm {} -> {}", self.bpm, bpm);
        self.bpm = bpm;
    }

    fn lpb(&self) -> u32 {
        self.lpb
    }

    fn set_lpb(&mut self, lpb: u32) {
        self.lpb = lpb;
    }

    fn set_edit_mode(&mut self, enabled: bool) {
        self.edit_mode = enabled;
    }

    fn set_octave(&mut self, octave: u8) {
        self.octave = octave;
    }

    fn set_edit_step(&mut self, step: u8) {
        self.edit_step = step;
    }

    fn set_metronome(&mut self, enabled: bool) {
        self.metronome = enabled;
    }

    fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn selected_track(&self) -> usize {
        self.selected_track
    }

    fn track_name(&self, track: usize) -> String {
        self.tracks
            .get(track)
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }

    fn set_track_mute(&mut self, track: usize, muted: bool) {
        if let Some(t) = self.track_mut(track) {
            t.muted = muted;
        }
    }

    fn solo_track(&mut self, track: usize) {
        if track >= self.tracks.len() {
            return;
        }
        for (i, t) in self.tracks.iter_mut().enumerate() {
            t.solo = i == track;
        }
    }

    fn track_volume(&self, track: usize) -> f64 {
        self.tracks.get(track).map(|t| t.volume).unwrap_or(0.0)
    }

    fn set_track_volume(&mut self, track: usize, volume: f64) {
        if let Some(t) = self.track_mut(track) {
            t.volume = volume;
        }
    }

    fn set_track_panning(&mut self, track: usize, panning: f64) {
        if let Some(t) = self.track_mut(track) {
            t.panning = panning;
        }
    }

    fn instrument_count(&self) -> usize {
        self.instrument_count
    }

    fn selected_instrument(&self) -> usize {
        self.selected_instrument
    }

    fn note_on(&mut self, instrument: usize, track: usize, note: u8, velocity: u8) {
        self.notes.push(NoteEvent::On {
            instrument,
            track,
            note,
            velocity,
        });
    }

    fn note_off(&mut self, instrument: usize, track: usize, note: u8) {
        self.notes.push(NoteEvent::Off {
            instrument,
            track,
            note,
        });
    }
}
