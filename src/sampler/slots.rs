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
use super::error::SamplerError;

/// The number of addressable slots.
pub const NUM_SLOTS: usize = 128;

/// One playable unit registered to a slot. The engine does all the decoding,
/// so a sample carries only the attribute dispatch needs: its channel count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    /// The number of audio channels in the file.
    num_channels: u16,
}

impl Sample {
    /// Returns the number of audio channels.
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }
}

/// A fixed table of 128 slots, each holding the samples admitted to it in
/// admission order. The table is append only; samples are never removed or
/// reordered.
#[derive(Clone)]
pub struct SlotTable {
    /// The registered samples, indexed by slot.
    slots: [Vec<Sample>; NUM_SLOTS],
}

impl SlotTable {
    /// Creates an empty table.
    pub fn new() -> SlotTable {
        SlotTable {
            slots: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Appends a sample with the given channel count to the slot. On failure
    /// the table is left unchanged.
    pub fn admit(&mut self, slot: usize, num_channels: u16) -> Result<(), SamplerError> {
        if slot >= NUM_SLOTS {
            return Err(SamplerError::InvalidSlot(slot));
        }
        if num_channels != 1 && num_channels != 2 {
            return Err(SamplerError::UnsupportedChannelLayout(num_channels));
        }
        self.slots[slot].push(Sample { num_channels });
        Ok(())
    }

    /// Returns the samples registered at the slot, in admission order.
    ///
    /// The index is not validated here: triggers are expected to come from a
    /// bounded source such as a 128-pad controller. An out of range index is
    /// a programming error and panics.
    pub fn samples_at(&self, slot: usize) -> &[Sample] {
        &self.slots[slot]
    }
}

impl Default for SlotTable {
    fn default() -> SlotTable {
        SlotTable::new()
    }
}
