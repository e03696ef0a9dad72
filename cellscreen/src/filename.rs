//! Image file naming convention of the screening microscope.
//!
//! Grammar (fields separated by `--`):
//!
//! ```text
//! {WellID}--W{well number}--P{position}--Z{z}--T{t}--{channel}.{ext}
//! ```
//!
//! Numeric fields are written zero-padded to five digits and parsed as
//! plain decimal; well number and position are 1-based.

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};
use crate::well::WellId;

const SEPARATOR: &str = "--";
const FIELD_WIDTH: usize = 5;

/// Identity of one imaged field of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WellPositionKey {
    pub well_number: u32,
    pub position: u32,
    pub well_id: WellId,
}

impl WellPositionKey {
    /// Parses the key out of an image path's file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(ImageFileName::from_path(path)?.key())
    }
}

impl fmt::Display for WellPositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.well_id, self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFileName {
    pub well_id: WellId,
    pub well_number: u32,
    pub position: u32,
    pub z: u32,
    pub t: u32,
    pub channel: String,
    pub extension: String,
}

impl ImageFileName {
    /// File name for the first z-slice and time point.
    pub fn new(key: WellPositionKey, channel: &str, extension: &str) -> Self {
        Self {
            well_id: key.well_id,
            well_number: key.well_number,
            position: key.position,
            z: 0,
            t: 0,
            channel: channel.to_string(),
            extension: extension.to_string(),
        }
    }

    pub fn key(&self) -> WellPositionKey {
        WellPositionKey {
            well_number: self.well_number,
            position: self.position,
            well_id: self.well_id,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::MalformedFilename {
                name: path.display().to_string(),
                reason: "no UTF-8 file name".into(),
            })?;
        Self::parse(name)
    }

    pub fn parse(name: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedFilename {
            name: name.to_string(),
            reason,
        };

        let fields: Vec<&str> = name.split(SEPARATOR).collect();
        let [well, w, p, z, t, tail] = fields.as_slice() else {
            return Err(malformed(format!(
                "expected 6 '{SEPARATOR}'-separated fields, found {}",
                fields.len()
            )));
        };

        let well_id: WellId = well
            .parse()
            .map_err(|_| malformed(format!("bad well ID '{well}'")))?;
        let well_number = prefixed_number(w, 'W').map_err(&malformed)?;
        let position = prefixed_number(p, 'P').map_err(&malformed)?;
        let z = prefixed_number(z, 'Z').map_err(&malformed)?;
        let t = prefixed_number(t, 'T').map_err(&malformed)?;

        if well_number == 0 || position == 0 {
            return Err(malformed("well number and position are 1-based".into()));
        }

        let (channel, extension) = tail
            .rsplit_once('.')
            .filter(|(c, e)| !c.is_empty() && !e.is_empty())
            .ok_or_else(|| malformed(format!("bad channel/extension '{tail}'")))?;

        Ok(Self {
            well_id,
            well_number,
            position,
            z,
            t,
            channel: channel.to_string(),
            extension: extension.to_string(),
        })
    }
}

impl fmt::Display for ImageFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{well}{s}W{w:0width$}{s}P{p:0width$}{s}Z{z:0width$}{s}T{t:0width$}{s}{channel}.{ext}",
            well = self.well_id,
            w = self.well_number,
            p = self.position,
            z = self.z,
            t = self.t,
            channel = self.channel,
            ext = self.extension,
            s = SEPARATOR,
            width = FIELD_WIDTH,
        )
    }
}

fn prefixed_number(field: &str, prefix: char) -> std::result::Result<u32, String> {
    let digits = field
        .strip_prefix(prefix)
        .ok_or_else(|| format!("field '{field}' lacks '{prefix}' prefix"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("field '{field}' is not numeric"));
    }
    digits
        .parse()
        .map_err(|_| format!("field '{field}' is out of range"))
}
