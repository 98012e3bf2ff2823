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
use std::fs::File;
use std::path::Path;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;

use super::error::SamplerError;

/// Returns the channel count of the audio file at the given path. Only the
/// container metadata is read; the engine does the actual decoding later.
pub fn num_channels<P: AsRef<Path>>(path: P) -> Result<u16, SamplerError> {
    let path = path.as_ref();

    // Open the file, including the path in the error so the user sees which
    // file failed.
    let file = File::open(path)
        .map_err(|e| std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // A hint helps the format registry guess the format.
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;

    // Find the first audio track.
    let track = probed
        .format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SamplerError::NoAudioTrack(path.display().to_string()))?;

    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| SamplerError::UnknownChannelCount(path.display().to_string()))?;
    Ok(channels.count() as u16)
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use tempfile::tempdir;

    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_num_channels_mono_and_stereo() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;

        let mono = dir.path().join("mono.wav");
        write_wav(mono.clone(), vec![vec![0.5_f32; 64]], 44100)?;
        assert_eq!(1, num_channels(&mono)?);

        let stereo = dir.path().join("stereo.wav");
        write_wav(
            stereo.clone(),
            vec![vec![0.5_f32; 64], vec![0.25_f32; 64]],
            44100,
        )?;
        assert_eq!(2, num_channels(&stereo)?);

        Ok(())
    }

    #[test]
    fn test_num_channels_multichannel() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;

        let quad = dir.path().join("quad.wav");
        write_wav(quad.clone(), vec![vec![0.1_f32; 64]; 4], 44100)?;
        assert_eq!(4, num_channels(&quad)?);

        Ok(())
    }

    #[test]
    fn test_num_channels_missing_file() {
        match num_channels("/nonexistent/missing.wav") {
            Err(SamplerError::Io(e)) => assert!(e.to_string().contains("missing.wav")),
            other => panic!("expected IO error, got {:?}", other),
        }
    }
}
