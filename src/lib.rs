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
//! A slot based sampler frontend for the SuperCollider audio engine.
//!
//! Audio files are registered into one of 128 slots; triggering a slot
//! starts one engine synth per registered sample. The engine does all of the
//! decoding and playback. This crate owns the slot registry, the playback
//! synth definitions, and the OSC dispatch.

pub mod config;
pub mod engine;
pub mod sampler;
pub mod synthdef;

mod testutil;
