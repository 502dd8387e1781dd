//! Sandboxed expression evaluation.
//!
//! Every call builds a fresh Lua VM loaded with only the math, string and
//! table libraries. The chunk runs against an explicit environment table
//! holding a fixed set of primitives plus `transport`, `song` and `edit`
//! tables bound to the host for the duration of the call. The VM globals are
//! never reachable from the chunk, and nothing survives between evaluations.
//! Indices and counts passed from Lua must be whole numbers.

use std::cell::RefCell;
use std::fmt::Display;
use std::ops::RangeInclusive;

use log::info;
use mlua::{Function, Lua, LuaOptions, MultiValue, StdLib, Table};

use tracklink_types::{
    resolve_index, HostControl, Value, BPM_RANGE, EDIT_STEP_RANGE, LPB_RANGE, NOTE_RANGE,
    OCTAVE_RANGE, TRACK_PANNING_RANGE, TRACK_VOLUME_RANGE, VELOCITY_RANGE,
};

const CHUNK_NAME: &str = "=evaluate";

/// Allocation ceiling for one evaluation's VM.
pub const MEMORY_LIMIT: usize = 16 * 1024 * 1024;

/// Base-library functions copied into the environment.
const BASE_FUNCTIONS: &[&str] = &[
    "assert", "error", "ipairs", "pairs", "next", "select", "tonumber", "tostring", "type",
];

const LIBRARIES: &[&str] = &["math", "string", "table"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("compile error: {0}")]
    Compile(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("sandbox setup failed: {0}")]
    Setup(String),
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// First returned value, `None` when the chunk returned nothing or nil.
    Success(Option<Value>),
    Failure(EvalError),
}

impl Evaluation {
    pub fn is_success(&self) -> bool {
        matches!(self, Evaluation::Success(_))
    }
}

/// Stateless evaluator; all VM state lives inside a single `evaluate` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Compile and run `expression` against the host.
    ///
    /// The text is first tried as an expression (`return <text>`), then as a
    /// statement chunk. Nothing runs unless one of the two compiles.
    pub fn evaluate(&self, host: &mut dyn HostControl, expression: &str) -> Evaluation {
        let lua = match Lua::new_with(
            StdLib::MATH | StdLib::STRING | StdLib::TABLE,
            LuaOptions::new(),
        ) {
            Ok(lua) => lua,
            Err(e) => return Evaluation::Failure(EvalError::Setup(describe(&e))),
        };
        if let Err(e) = lua.set_memory_limit(MEMORY_LIMIT) {
            return Evaluation::Failure(EvalError::Setup(describe(&e)));
        }

        let cell = RefCell::new(host);
        let host = &cell;

        let outcome = lua.scope(|scope| {
            let env = base_environment(&lua)?;

            let transport = lua.create_table()?;
            transport.set(
                "start",
                scope.create_function(move |_, ()| {
                    host.borrow_mut().start_playing();
                    Ok(())
                })?,
            )?;
            transport.set(
                "stop",
                scope.create_function(move |_, ()| {
                    host.borrow_mut().stop_playing();
                    Ok(())
                })?,
            )?;
            transport.set(
                "continue",
                scope.create_function(move |_, ()| {
                    host.borrow_mut().continue_playing();
                    Ok(())
                })?,
            )?;
            transport.set(
                "panic",
                scope.create_function(move |_, ()| {
                    host.borrow_mut().panic();
                    Ok(())
                })?,
            )?;
            transport.set(
                "playing",
                scope.create_function(move |_, ()| Ok(host.borrow().is_playing()))?,
            )?;
            transport.set(
                "bpm",
                scope.create_function(move |_, ()| Ok(host.borrow().bpm()))?,
            )?;
            transport.set(
                "set_bpm",
                scope.create_function(move |_, bpm: f64| {
                    if !BPM_RANGE.contains(&bpm) {
                        return Err(range_error("bpm", bpm, &BPM_RANGE));
                    }
                    host.borrow_mut().set_bpm(bpm);
                    Ok(())
                })?,
            )?;
            transport.set(
                "lpb",
                scope.create_function(move |_, ()| Ok(host.borrow().lpb()))?,
            )?;
            transport.set(
                "set_lpb",
                scope.create_function(move |_, lpb: f64| {
                    let lpb = integral("lpb", lpb)?;
                    let lpb = u32::try_from(lpb)
                        .ok()
                        .filter(|l| LPB_RANGE.contains(l))
                        .ok_or_else(|| range_error("lpb", lpb, &LPB_RANGE))?;
                    host.borrow_mut().set_lpb(lpb);
                    Ok(())
                })?,
            )?;
            transport.set(
                "loop_pattern",
                scope.create_function(move |_, ()| Ok(host.borrow().loop_pattern()))?,
            )?;
            transport.set(
                "set_loop_pattern",
                scope.create_function(move |_, enabled: bool| {
                    host.borrow_mut().set_loop_pattern(enabled);
                    Ok(())
                })?,
            )?;
            env.set("transport", transport)?;

            let song = lua.create_table()?;
            song.set(
                "track_count",
                scope.create_function(move |_, ()| Ok(host.borrow().track_count()))?,
            )?;
            song.set(
                "selected_track",
                scope.create_function(move |_, ()| Ok(host.borrow().selected_track() + 1))?,
            )?;
            song.set(
                "track_name",
                scope.create_function(move |_, index: f64| {
                    let h = host.borrow();
                    let track = track_index(&**h, integral("track", index)?)?;
                    Ok(h.track_name(track))
                })?,
            )?;
            song.set(
                "mute_track",
                scope.create_function(move |_, index: f64| {
                    let mut h = host.borrow_mut();
                    let track = track_index(&**h, integral("track", index)?)?;
                    h.set_track_mute(track, true);
                    Ok(())
                })?,
            )?;
            song.set(
                "unmute_track",
                scope.create_function(move |_, index: f64| {
                    let mut h = host.borrow_mut();
                    let track = track_index(&**h, integral("track", index)?)?;
                    h.set_track_mute(track, false);
                    Ok(())
                })?,
            )?;
            song.set(
                "solo_track",
                scope.create_function(move |_, index: f64| {
                    let mut h = host.borrow_mut();
                    let track = track_index(&**h, integral("track", index)?)?;
                    h.solo_track(track);
                    Ok(())
                })?,
            )?;
            song.set(
                "track_volume",
                scope.create_function(move |_, index: f64| {
                    let h = host.borrow();
                    let track = track_index(&**h, integral("track", index)?)?;
                    Ok(h.track_volume(track))
                })?,
            )?;
            song.set(
                "set_track_volume",
                scope.create_function(move |_, (index, volume): (f64, f64)| {
                    if !TRACK_VOLUME_RANGE.contains(&volume) {
                        return Err(range_error("track volume", volume, &TRACK_VOLUME_RANGE));
                    }
                    let mut h = host.borrow_mut();
                    let track = track_index(&**h, integral("track", index)?)?;
                    h.set_track_volume(track, volume);
                    Ok(())
                })?,
            )?;
            song.set(
                "set_track_panning",
                scope.create_function(move |_, (index, panning): (f64, f64)| {
                    if !TRACK_PANNING_RANGE.contains(&panning) {
                        return Err(range_error("track panning", panning, &TRACK_PANNING_RANGE));
                    }
                    let mut h = host.borrow_mut();
                    let track = track_index(&**h, integral("track", index)?)?;
                    h.set_track_panning(track, panning);
                    Ok(())
                })?,
            )?;
            song.set(
                "selected_instrument",
                scope.create_function(move |_, ()| Ok(host.borrow().selected_instrument() + 1))?,
            )?;
            song.set(
                "instrument_count",
                scope.create_function(move |_, ()| Ok(host.borrow().instrument_count()))?,
            )?;
            song.set(
                "note_on",
                scope.create_function(
                    move |_, (instrument, track, note, velocity): (f64, f64, f64, f64)| {
                        let note = checked_u8("note", note, &NOTE_RANGE)?;
                        let velocity = checked_u8("velocity", velocity, &VELOCITY_RANGE)?;
                        let instrument = integral("instrument", instrument)?;
                        let track = integral("track", track)?;
                        let mut h = host.borrow_mut();
                        let instrument = instrument_index(&**h, instrument)?;
                        let track = track_index(&**h, track)?;
                        h.note_on(instrument, track, note, velocity);
                        Ok(())
                    },
                )?,
            )?;
            song.set(
                "note_off",
                scope.create_function(move |_, (instrument, track, note): (f64, f64, f64)| {
                    let note = checked_u8("note", note, &NOTE_RANGE)?;
                    let instrument = integral("instrument", instrument)?;
                    let track = integral("track", track)?;
                    let mut h = host.borrow_mut();
                    let instrument = instrument_index(&**h, instrument)?;
                    let track = track_index(&**h, track)?;
                    h.note_off(instrument, track, note);
                    Ok(())
                })?,
            )?;
            env.set("song", song)?;

            let edit = lua.create_table()?;
            edit.set(
                "mode",
                scope.create_function(move |_, enabled: bool| {
                    host.borrow_mut().set_edit_mode(enabled);
                    Ok(())
                })?,
            )?;
            edit.set(
                "octave",
                scope.create_function(move |_, octave: f64| {
                    let octave = checked_u8("octave", octave, &OCTAVE_RANGE)?;
                    host.borrow_mut().set_octave(octave);
                    Ok(())
                })?,
            )?;
            edit.set(
                "step",
                scope.create_function(move |_, step: f64| {
                    let step = checked_u8("edit step", step, &EDIT_STEP_RANGE)?;
                    host.borrow_mut().set_edit_step(step);
                    Ok(())
                })?,
            )?;
            edit.set(
                "metronome",
                scope.create_function(move |_, enabled: bool| {
                    host.borrow_mut().set_metronome(enabled);
                    Ok(())
                })?,
            )?;
            env.set("edit", edit)?;

            let chunk = match compile(&lua, &env, expression) {
                Ok(chunk) => chunk,
                Err(msg) => return Ok(Evaluation::Failure(EvalError::Compile(msg))),
            };

            Ok(match chunk.call::<MultiValue>(()) {
                Ok(values) => Evaluation::Success(first_value(values)),
                Err(e) => Evaluation::Failure(EvalError::Runtime(describe(&e))),
            })
        });

        outcome.unwrap_or_else(|e| Evaluation::Failure(EvalError::Setup(describe(&e))))
    }
}

/// Environment table with the general-purpose primitives and libraries.
fn base_environment(lua: &Lua) -> mlua::Result<Table> {
    let globals = lua.globals();
    let env = lua.create_table()?;

    for name in BASE_FUNCTIONS {
        env.set(*name, globals.get::<mlua::Value>(*name)?)?;
    }
    for name in LIBRARIES {
        env.set(*name, globals.get::<Table>(*name)?)?;
    }

    let string: Table = globals.get("string")?;
    string.set("dump", mlua::Value::Nil)?;

    let table: Table = globals.get("table")?;
    env.set("unpack", table.get::<mlua::Value>("unpack")?)?;

    env.set(
        "print",
        lua.create_function(|_, args: MultiValue| {
            let line: Vec<String> = args.iter().map(render).collect();
            info!(target: "evaluate", "{}", line.join("\t"));
            Ok(())
        })?,
    )?;

    Ok(env)
}

fn compile(lua: &Lua, env: &Table, expression: &str) -> Result<Function, String> {
    let as_expression = format!("return {}", expression);
    match lua
        .load(as_expression.as_str())
        .set_name(CHUNK_NAME)
        .set_environment(env.clone())
        .into_function()
    {
        Ok(chunk) => return Ok(chunk),
        Err(mlua::Error::SyntaxError { .. }) => {}
        Err(e) => return Err(describe(&e)),
    }

    lua.load(expression)
        .set_name(CHUNK_NAME)
        .set_environment(env.clone())
        .into_function()
        .map_err(|e| describe(&e))
}

fn first_value(values: MultiValue) -> Option<Value> {
    match values.into_iter().next()? {
        mlua::Value::Nil => None,
        mlua::Value::Boolean(b) => Some(Value::Boolean(b)),
        mlua::Value::Integer(i) => Some(Value::Number(i as f64)),
        mlua::Value::Number(n) => Some(Value::Number(n)),
        mlua::Value::String(s) => Some(Value::String(s.to_string_lossy().to_string())),
        other => Some(Value::String(format!("<{}>", other.type_name()))),
    }
}

fn render(value: &mlua::Value) -> String {
    match value {
        mlua::Value::Nil => "nil".to_string(),
        mlua::Value::Boolean(b) => b.to_string(),
        mlua::Value::Integer(i) => i.to_string(),
        mlua::Value::Number(n) => n.to_string(),
        mlua::Value::String(s) => s.to_string_lossy().to_string(),
        other => format!("<{}>", other.type_name()),
    }
}

/// Root-cause message of an mlua error, without traceback.
fn describe(err: &mlua::Error) -> String {
    match err {
        mlua::Error::CallbackError { cause, .. } => describe(cause),
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::RuntimeError(msg) => msg.lines().next().unwrap_or_default().to_string(),
        other => other.to_string(),
    }
}

fn range_error<T: Display>(
    what: &str,
    value: T,
    range: &RangeInclusive<impl Display>,
) -> mlua::Error {
    mlua::Error::RuntimeError(format!(
        "{} {} out of range [{}, {}]",
        what,
        value,
        range.start(),
        range.end()
    ))
}

/// Lua numbers arrive as floats; indices and counts must be whole.
fn integral(what: &str, value: f64) -> mlua::Result<i64> {
    if value.is_finite() && value.fract() == 0.0 {
        Ok(value as i64)
    } else {
        Err(mlua::Error::RuntimeError(format!(
            "{} must be an integer, got {}",
            what, value
        )))
    }
}

fn checked_u8(what: &str, value: f64, range: &RangeInclusive<u8>) -> mlua::Result<u8> {
    let value = integral(what, value)?;
    u8::try_from(value)
        .ok()
        .filter(|v| range.contains(v))
        .ok_or_else(|| range_error(what, value, range))
}

fn track_index(host: &dyn HostControl, raw: i64) -> mlua::Result<usize> {
    resolve_index(raw, host.track_count(), host.selected_track()).ok_or_else(|| {
        mlua::Error::RuntimeError(format!(
            "track index {} out of range (have {})",
            raw,
            host.track_count()
        ))
    })
}

fn instrument_index(host: &dyn HostControl, raw: i64) -> mlua::Result<usize> {
    resolve_index(raw, host.instrument_count(), host.selected_instrument()).ok_or_else(|| {
        mlua::Error::RuntimeError(format!(
            "instrument index {} out of range (have {})",
            raw,
            host.instrument_count()
        ))
    })
}
