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
//! Slot based sample triggering against an external synthesis engine.
//!
//! The sampler owns a table of 128 slots. Audio files are probed for their
//! channel count and admitted to a slot; triggering a slot starts one engine
//! synth per admitted sample, all in a single batch. The engine decodes and
//! plays the audio; this process never touches the sample data itself.

pub mod error;
pub mod probe;
pub mod slots;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::Kit;
use crate::engine::{AddAction, Connection, Group, SynthRequest, DEFAULT_HANDSHAKE_TIMEOUT};
use crate::synthdef::SynthDefRegistry;

use self::error::SamplerError;
pub use self::slots::Sample;
use self::slots::SlotTable;

/// A sampler that triggers playback of registered samples on an external
/// synthesis engine.
pub struct Sampler {
    /// The session with the engine.
    conn: Arc<Connection>,
    /// The engine group that receives every playback synth.
    group: Group,
    /// The playback definitions, published during construction.
    defs: SynthDefRegistry,
    /// The slot table. Admission writes, triggers read.
    slots: RwLock<SlotTable>,
}

impl Sampler {
    /// Connects to the engine at the given address, creates the default
    /// group, and publishes the playback definitions.
    pub async fn new(addr: &str) -> Result<Sampler, SamplerError> {
        Sampler::with_handshake_timeout(addr, DEFAULT_HANDSHAKE_TIMEOUT).await
    }

    /// Same as [`Sampler::new`] with a custom handshake timeout for the
    /// definition publishing step. Bootstrap fails as a whole if any step
    /// fails; there is no partially usable sampler.
    pub async fn with_handshake_timeout(
        addr: &str,
        handshake_timeout: Duration,
    ) -> Result<Sampler, SamplerError> {
        let conn = Connection::connect_with_timeout(addr, handshake_timeout).await?;
        let group = conn.clone().add_default_group().await?;
        let defs = SynthDefRegistry::new();
        defs.publish(&conn).await?;
        info!(addr, "Sampler ready");

        Ok(Sampler {
            conn,
            group,
            defs,
            slots: RwLock::new(SlotTable::new()),
        })
    }

    /// Probes the audio file for its channel count and registers it at the
    /// given slot. Samples admitted to the same slot are triggered together,
    /// in admission order.
    pub fn add<P: AsRef<Path>>(&self, path: P, slot: usize) -> Result<(), SamplerError> {
        let path = path.as_ref();
        let num_channels = probe::num_channels(path)?;
        self.slots.write().admit(slot, num_channels)?;
        debug!(slot, num_channels, file = %path.display(), "Added sample");
        Ok(())
    }

    /// Registers every sample in the kit, resolving relative paths against
    /// the given base directory. The load is all or nothing: if any entry
    /// fails to probe or admit, the table is left untouched.
    pub fn load_kit(&self, kit: &Kit, base_path: &Path) -> Result<(), SamplerError> {
        // Probe every file before touching the table.
        let mut entries = Vec::with_capacity(kit.samples().len());
        for sample in kit.samples() {
            let file = sample.resolve_file(base_path);
            let num_channels = probe::num_channels(&file)?;
            debug!(slot = sample.slot(), num_channels, file = %file.display(), "Probed sample");
            entries.push((sample.slot(), num_channels));
        }

        let mut slots = self.slots.write();
        let mut staged = slots.clone();
        for (slot, num_channels) in entries {
            staged.admit(slot, num_channels)?;
        }
        *slots = staged;

        info!(samples = kit.samples().len(), "Kit loaded");
        Ok(())
    }

    /// Returns the samples registered at the slot, in admission order.
    ///
    /// Like the underlying table, this does not validate the index; an out
    /// of range slot is a programming error and panics.
    pub fn samples_at(&self, slot: usize) -> Vec<Sample> {
        self.slots.read().samples_at(slot).to_vec()
    }

    /// Triggers every sample registered at the slot. One synth per sample is
    /// started in the default group, appended at the tail, all of them in a
    /// single batch. The send is fire and forget: nothing waits for the
    /// engine and nothing is retried.
    ///
    /// Control values are accepted for forward compatibility but are not
    /// applied; the playback definitions only read `bufnum`.
    pub async fn play(&self, slot: usize, ctls: &HashMap<String, f32>) -> Result<(), SamplerError> {
        if !ctls.is_empty() {
            warn!(
                slot,
                controls = ctls.len(),
                "Dropping control values; the playback definitions do not take controls yet"
            );
        }

        let requests: Vec<SynthRequest> = {
            let slots = self.slots.read();
            slots
                .samples_at(slot)
                .iter()
                .map(|sample| {
                    SynthRequest::new(
                        self.defs.def_for_channels(sample.num_channels()).name(),
                        self.conn.next_synth_id(),
                        AddAction::Tail,
                        HashMap::new(),
                    )
                })
                .collect()
        };

        self.group.synths(&requests).await?;
        debug!(slot, synths = requests.len(), "Triggered slot");
        Ok(())
    }
}
