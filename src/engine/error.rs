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
use std::time::Duration;

/// Typed errors for the engine session so callers can tell a missed
/// acknowledgment from a transport failure.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine never acknowledged a synth definition. Fatal to bootstrap;
    /// the sampler is not usable.
    #[error("Engine did not acknowledge synthdef {def} within {timeout:?}")]
    HandshakeTimeout { def: String, timeout: Duration },

    /// A synth batch could not be handed to the transport. The batch is
    /// dropped; the connection stays usable.
    #[error("Failed to send synth batch to the engine: {0}")]
    DispatchFailed(#[source] std::io::Error),

    #[error("OSC error: {0}")]
    Osc(#[from] rosc::OscError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
