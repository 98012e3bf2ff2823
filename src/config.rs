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
//! Kit configuration.
//!
//! A kit file describes everything needed to go from an empty process to a
//! loaded sampler: the engine address, an optional handshake timeout, and
//! the samples to register by slot.

pub mod error;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use crate::engine::DEFAULT_HANDSHAKE_TIMEOUT;

use self::error::ConfigError;

/// A YAML representation of a sampler kit.
#[derive(Deserialize, Clone)]
pub struct Kit {
    /// The address of the synthesis engine, e.g. `127.0.0.1:57110`.
    engine_address: String,

    /// Controls how long to wait for the engine to acknowledge each synth
    /// definition during bootstrap.
    handshake_timeout: Option<String>,

    /// The samples to register, by slot.
    #[serde(default)]
    samples: Vec<KitSample>,
}

/// One sample entry in a kit.
#[derive(Deserialize, Clone)]
pub struct KitSample {
    /// The slot to register the sample in.
    slot: usize,

    /// The path to the audio file. Relative paths resolve against the
    /// directory containing the kit file.
    file: PathBuf,
}

impl Kit {
    /// Creates a new kit configuration.
    pub fn new(engine_address: &str, samples: Vec<KitSample>) -> Kit {
        Kit {
            engine_address: engine_address.to_string(),
            handshake_timeout: None,
            samples,
        }
    }

    /// Parse a kit from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Kit, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Kit>()?)
    }

    /// Returns the engine address from the configuration.
    pub fn engine_address(&self) -> &str {
        &self.engine_address
    }

    /// Returns the handshake timeout from the configuration.
    pub fn handshake_timeout(&self) -> Result<Duration, Box<dyn Error>> {
        match &self.handshake_timeout {
            Some(timeout) => Ok(DurationString::from_string(timeout.clone())?.into()),
            None => Ok(DEFAULT_HANDSHAKE_TIMEOUT),
        }
    }

    /// Returns the samples in this kit.
    pub fn samples(&self) -> &[KitSample] {
        &self.samples
    }
}

impl KitSample {
    /// Creates a new kit sample entry.
    pub fn new(slot: usize, file: &Path) -> KitSample {
        KitSample {
            slot,
            file: file.to_path_buf(),
        }
    }

    /// Returns the slot this sample registers into.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Returns the configured file path.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Returns the file path, resolving a relative one against the given
    /// base directory.
    pub fn resolve_file(&self, base_path: &Path) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            base_path.join(&self.file)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_deserialize_kit() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("kit.yaml");
        fs::write(
            &path,
            r#"
engine_address: 127.0.0.1:57110
handshake_timeout: 250ms
samples:
  - slot: 0
    file: samples/kick.wav
  - slot: 1
    file: /somewhere/else/snare.wav
"#,
        )?;

        let kit = Kit::deserialize(&path)?;
        assert_eq!("127.0.0.1:57110", kit.engine_address());
        assert_eq!(Duration::from_millis(250), kit.handshake_timeout()?);
        assert_eq!(2, kit.samples().len());

        assert_eq!(0, kit.samples()[0].slot());
        assert_eq!(Path::new("samples/kick.wav"), kit.samples()[0].file());
        assert_eq!(
            PathBuf::from("/kits/samples/kick.wav"),
            kit.samples()[0].resolve_file(Path::new("/kits"))
        );

        assert_eq!(1, kit.samples()[1].slot());
        assert_eq!(
            PathBuf::from("/somewhere/else/snare.wav"),
            kit.samples()[1].resolve_file(Path::new("/kits"))
        );

        Ok(())
    }

    #[test]
    fn test_deserialize_kit_defaults() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("kit.yaml");
        fs::write(&path, "engine_address: 127.0.0.1:57110\n")?;

        let kit = Kit::deserialize(&path)?;
        assert_eq!(DEFAULT_HANDSHAKE_TIMEOUT, kit.handshake_timeout()?);
        assert!(kit.samples().is_empty());

        Ok(())
    }

    #[test]
    fn test_invalid_handshake_timeout() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("kit.yaml");
        fs::write(
            &path,
            "engine_address: 127.0.0.1:57110\nhandshake_timeout: soon\n",
        )?;

        let kit = Kit::deserialize(&path)?;
        assert!(kit.handshake_timeout().is_err());

        Ok(())
    }

    #[test]
    fn test_missing_engine_address() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("kit.yaml");
        fs::write(&path, "samples: []\n")?;

        match Kit::deserialize(&path) {
            Err(ConfigError::Load(_)) => {}
            Ok(_) => panic!("expected the kit to fail to parse"),
        }

        Ok(())
    }
}
