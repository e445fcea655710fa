//! Export format selection.

use crate::ExportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Binary glTF 2.0.
    Glb,
    /// Binary STL.
    Stl,
    /// ASCII STL.
    StlAscii,
}

impl ExportFormat {
    /// All formats, in display order.
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Glb, ExportFormat::Stl, ExportFormat::StlAscii];

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Glb => "glb",
            ExportFormat::Stl | ExportFormat::StlAscii => "stl",
        }
    }

    /// MIME type for serving the artifact.
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Glb => "model/gltf-binary",
            ExportFormat::Stl | ExportFormat::StlAscii => "model/stl",
        }
    }

    /// Canonical name, the inverse of [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Glb => "glb",
            ExportFormat::Stl => "stl",
            ExportFormat::StlAscii => "stl-ascii",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "glb" => Ok(ExportFormat::Glb),
            "stl" => Ok(ExportFormat::Stl),
            "stl-ascii" | "stl_ascii" => Ok(ExportFormat::StlAscii),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("GLB".parse::<ExportFormat>().unwrap(), ExportFormat::Glb);
        assert_eq!("Stl".parse::<ExportFormat>().unwrap(), ExportFormat::Stl);
        assert_eq!("stl-ascii".parse::<ExportFormat>().unwrap(), ExportFormat::StlAscii);
    }

    #[test]
    fn test_unknown_format() {
        for name in ["obj", "ply", ""] {
            assert!(matches!(
                name.parse::<ExportFormat>(),
                Err(ExportError::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn test_name_roundtrip() {
        for format in ExportFormat::ALL {
            assert_eq!(format.name().parse::<ExportFormat>().unwrap(), format);
        }
        assert_eq!(ExportFormat::StlAscii.extension(), "stl");
    }
}
