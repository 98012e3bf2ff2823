// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Playback synth definitions and their binary encoding.
//!
//! The engine knows nothing about our samples until it has received a synth
//! definition describing how to play a buffer. This module provides:
//! - The two fixed buffer-playback definitions (mono and stereo)
//! - The binary synthdef file encoding (SCgf version 2) the engine accepts
//! - A registry that owns both definitions and publishes them at startup

use tracing::debug;

use crate::engine::{error::EngineError, Connection};

/// The definition that plays single-channel samples.
pub const MONO_DEF_NAME: &str = "sampler_simple_mono";
/// The definition that plays two-channel samples.
pub const STEREO_DEF_NAME: &str = "sampler_simple_stereo";

/// Magic bytes at the start of a binary synthdef file.
const SCGF_MAGIC: &[u8; 4] = b"SCgf";
/// Synthdef file format version.
const SCGF_VERSION: i32 = 2;

/// Control rate calculation.
const RATE_CONTROL: u8 = 1;
/// Audio rate calculation.
const RATE_AUDIO: u8 = 2;

/// Done action that frees the enclosing synth once the buffer has played
/// through, so one-shot samples clean themselves up.
const DONE_ACTION_FREE_SYNTH: f32 = 2.0;

/// An immutable buffer-playback definition at a fixed channel arity.
///
/// Each definition reads one control, `bufnum` (default 0), plays that buffer
/// at audio rate, frees its own synth when playback completes, and writes to
/// the stereo output bus starting at channel 0. A mono source is duplicated
/// to both output channels; a stereo source maps directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthDef {
    /// The name the engine registers the definition under.
    name: &'static str,
    /// The number of channels the definition plays.
    num_channels: u16,
}

/// A reference to one UGen input: either another UGen's output or an entry in
/// the constants table.
enum Input {
    Ugen { ugen: i32, output: i32 },
    Constant(i32),
}

/// One unit generator in a synthdef graph.
struct Ugen {
    class_name: &'static str,
    rate: u8,
    special_index: i16,
    inputs: Vec<Input>,
    output_rates: Vec<u8>,
}

impl SynthDef {
    fn new(name: &'static str, num_channels: u16) -> SynthDef {
        SynthDef { name, num_channels }
    }

    /// Returns the name the engine knows this definition by.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the number of channels this definition plays.
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Encodes this definition as a binary synthdef file holding one graph:
    /// a control reading `bufnum`, a buffer player, and an output writer.
    pub fn encode(&self) -> Vec<u8> {
        let mut constants: Vec<f32> = Vec::new();
        let playback_rate = constant_index(&mut constants, 1.0);
        let trigger = constant_index(&mut constants, 1.0);
        let start_pos = constant_index(&mut constants, 0.0);
        let no_loop = constant_index(&mut constants, 0.0);
        let done_action = constant_index(&mut constants, DONE_ACTION_FREE_SYNTH);
        let out_bus = constant_index(&mut constants, 0.0);

        let control = Ugen {
            class_name: "Control",
            rate: RATE_CONTROL,
            special_index: 0,
            inputs: Vec::new(),
            output_rates: vec![RATE_CONTROL],
        };

        // PlayBuf inputs: bufnum, rate, trigger, start position, loop, done
        // action. The channel count is the number of outputs, not an input.
        let play_buf = Ugen {
            class_name: "PlayBuf",
            rate: RATE_AUDIO,
            special_index: 0,
            inputs: vec![
                Input::Ugen { ugen: 0, output: 0 },
                Input::Constant(playback_rate),
                Input::Constant(trigger),
                Input::Constant(start_pos),
                Input::Constant(no_loop),
                Input::Constant(done_action),
            ],
            output_rates: vec![RATE_AUDIO; self.num_channels as usize],
        };

        // A mono signal feeds both channels of the output bus.
        let mut out_inputs = vec![Input::Constant(out_bus)];
        if self.num_channels == 1 {
            out_inputs.push(Input::Ugen { ugen: 1, output: 0 });
            out_inputs.push(Input::Ugen { ugen: 1, output: 0 });
        } else {
            for output in 0..i32::from(self.num_channels) {
                out_inputs.push(Input::Ugen { ugen: 1, output });
            }
        }
        let out = Ugen {
            class_name: "Out",
            rate: RATE_AUDIO,
            special_index: 0,
            inputs: out_inputs,
            output_rates: Vec::new(),
        };

        encode_file(
            self.name,
            &constants,
            &[("bufnum", 0.0)],
            &[control, play_buf, out],
        )
    }
}

/// The fixed pair of playback definitions, created once per sampler and
/// published to the engine exactly once during bootstrap.
pub struct SynthDefRegistry {
    /// Plays single-channel samples.
    mono: SynthDef,
    /// Plays two-channel samples.
    stereo: SynthDef,
}

impl SynthDefRegistry {
    /// Creates the registry holding the mono and stereo definitions.
    pub fn new() -> SynthDefRegistry {
        // TODO: add definitions for other playback styles, e.g. granular.
        SynthDefRegistry {
            mono: SynthDef::new(MONO_DEF_NAME, 1),
            stereo: SynthDef::new(STEREO_DEF_NAME, 2),
        }
    }

    /// Returns the mono playback definition.
    pub fn mono(&self) -> &SynthDef {
        &self.mono
    }

    /// Returns the stereo playback definition.
    pub fn stereo(&self) -> &SynthDef {
        &self.stereo
    }

    /// Returns the definition that plays a sample with the given channel
    /// count. Callers are expected to have validated the count at admission,
    /// so anything other than 1 maps to the stereo definition.
    pub fn def_for_channels(&self, num_channels: u16) -> &SynthDef {
        if num_channels == 1 {
            &self.mono
        } else {
            &self.stereo
        }
    }

    /// Sends both definitions to the engine, waiting for the acknowledgment
    /// of each in turn. Fails the whole bootstrap if any acknowledgment does
    /// not arrive in time.
    pub async fn publish(&self, conn: &Connection) -> Result<(), EngineError> {
        for def in [&self.mono, &self.stereo] {
            conn.send_def(def.name(), def.encode()).await?;
            debug!(def = def.name(), "Published synth definition");
        }
        Ok(())
    }
}

impl Default for SynthDefRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the index of the given value in the constants table, appending it
/// if it has not been used yet.
fn constant_index(constants: &mut Vec<f32>, value: f32) -> i32 {
    match constants.iter().position(|&constant| constant == value) {
        Some(index) => index as i32,
        None => {
            constants.push(value);
            (constants.len() - 1) as i32
        }
    }
}

/// Encodes a synthdef file containing a single definition. All integers are
/// big-endian; strings are length-prefixed with a single byte.
fn encode_file(name: &str, constants: &[f32], params: &[(&str, f32)], ugens: &[Ugen]) -> Vec<u8> {
    let mut buf: Vec<u8> = Vec::new();
    buf.extend_from_slice(SCGF_MAGIC);
    buf.extend_from_slice(&SCGF_VERSION.to_be_bytes());
    buf.extend_from_slice(&1i16.to_be_bytes());

    push_pstring(&mut buf, name);

    buf.extend_from_slice(&(constants.len() as i32).to_be_bytes());
    for constant in constants {
        buf.extend_from_slice(&constant.to_be_bytes());
    }

    buf.extend_from_slice(&(params.len() as i32).to_be_bytes());
    for (_, default) in params {
        buf.extend_from_slice(&default.to_be_bytes());
    }
    buf.extend_from_slice(&(params.len() as i32).to_be_bytes());
    for (index, (param_name, _)) in params.iter().enumerate() {
        push_pstring(&mut buf, param_name);
        buf.extend_from_slice(&(index as i32).to_be_bytes());
    }

    buf.extend_from_slice(&(ugens.len() as i32).to_be_bytes());
    for ugen in ugens {
        push_pstring(&mut buf, ugen.class_name);
        buf.push(ugen.rate);
        buf.extend_from_slice(&(ugen.inputs.len() as i32).to_be_bytes());
        buf.extend_from_slice(&(ugen.output_rates.len() as i32).to_be_bytes());
        buf.extend_from_slice(&ugen.special_index.to_be_bytes());
        for input in &ugen.inputs {
            match input {
                Input::Ugen { ugen, output } => {
                    buf.extend_from_slice(&ugen.to_be_bytes());
                    buf.extend_from_slice(&output.to_be_bytes());
                }
                Input::Constant(index) => {
                    buf.extend_from_slice(&(-1i32).to_be_bytes());
                    buf.extend_from_slice(&index.to_be_bytes());
                }
            }
        }
        for rate in &ugen.output_rates {
            buf.push(*rate);
        }
    }

    // No variants.
    buf.extend_from_slice(&0i16.to_be_bytes());
    buf
}

fn push_pstring(buf: &mut Vec<u8>, s: &str) {
    buf.push(s.len() as u8);
    buf.extend_from_slice(s.as_bytes());
}
