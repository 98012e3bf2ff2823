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
use crate::engine::error::EngineError;

/// Errors from sample admission and playback dispatch.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// The slot index is outside the table.
    #[error("Slot ({0}) must be between 0 and 127")]
    InvalidSlot(usize),

    /// The audio file has a channel layout none of the playback definitions
    /// can play.
    #[error("Expected 1 or 2 channels, got {0}")]
    UnsupportedChannelLayout(u16),

    /// The file contains no decodable audio track.
    #[error("No audio track found in {0}")]
    NoAudioTrack(String),

    /// The container does not declare a channel count.
    #[error("Channel count not specified in {0}")]
    UnknownChannelCount(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Audio file error: {0}")]
    AudioFile(#[from] symphonia::core::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
