//! Durable view files ("parameters").
//!
//! A parameter is the full-precision state of a view: center, scale,
//! iteration cap and optional palette. On disk it is a gzip stream wrapping a
//! versioned JSON document. Coordinates are stored as exact binary
//! significand/exponent pairs, so a save/load round trip reproduces every bit.

use std::io::{Read, Write};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};

use crate::viewport::{validate_center, validate_max_iterations, validate_scale};
use crate::{DeepComplex, FloatExp, FormatError, Palette, Viewport};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const SHARE_PREFIX: &str = "v1:";

/// Full-precision snapshot of a view.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub center: DeepComplex,
    pub scale: FloatExp,
    pub max_iterations: u32,
    pub palette: Option<Palette>,
}

/// On-disk document.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParameterFile {
    /// Schema version for future migrations
    version: u32,
    center: DeepComplex,
    scale: FloatExp,
    max_iterations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    palette: Option<Palette>,
}

/// Read first so that a newer document is reported as a version mismatch
/// rather than as a field error.
#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

impl Parameter {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn from_viewport(viewport: &Viewport, palette: Option<Palette>) -> Self {
        Self {
            center: viewport.center.clone(),
            scale: viewport.scale,
            max_iterations: viewport.max_iterations,
            palette,
        }
    }

    /// Serialize and compress.
    pub fn save(&self) -> Result<Vec<u8>, FormatError> {
        let mut bytes = Vec::new();
        self.save_to(&mut bytes)?;
        Ok(bytes)
    }

    pub fn save_to<W: Write>(&self, writer: W) -> Result<(), FormatError> {
        let file = ParameterFile {
            version: Self::CURRENT_VERSION,
            center: self.center.clone(),
            scale: self.scale,
            max_iterations: self.max_iterations,
            palette: self.palette.clone(),
        };
        let mut encoder = GzEncoder::new(writer, Compression::best());
        serde_json::to_writer(&mut encoder, &file)?;
        encoder.finish()?;
        Ok(())
    }

    /// Decompress and deserialize, rejecting anything that is not a complete,
    /// current-version parameter document.
    pub fn load(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < GZIP_MAGIC.len() || bytes[..2] != GZIP_MAGIC {
            return Err(FormatError::Compression(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "missing gzip header",
            )));
        }
        Self::load_from(bytes)
    }

    pub fn load_from<R: Read>(reader: R) -> Result<Self, FormatError> {
        let mut json = Vec::new();
        GzDecoder::new(reader).read_to_end(&mut json)?;

        let header: VersionHeader = serde_json::from_slice(&json)?;
        if header.version != Self::CURRENT_VERSION {
            log::warn!(
                "Rejecting parameter with version {} (current: {})",
                header.version,
                Self::CURRENT_VERSION
            );
            return Err(FormatError::UnsupportedVersion {
                found: header.version,
                supported: Self::CURRENT_VERSION,
            });
        }

        let file: ParameterFile = serde_json::from_slice(&json)?;
        validate_center(&file.center).map_err(|e| FormatError::InvalidValue(e.to_string()))?;
        validate_scale(&file.scale).map_err(|e| FormatError::InvalidValue(e.to_string()))?;
        validate_max_iterations(file.max_iterations)
            .map_err(|e| FormatError::InvalidValue(e.to_string()))?;
        if let Some(palette) = &file.palette {
            palette.validate().map_err(FormatError::InvalidValue)?;
        }

        Ok(Self {
            center: DeepComplex::new(file.center.re, file.center.im),
            scale: file.scale,
            max_iterations: file.max_iterations,
            palette: file.palette,
        })
    }

    /// Compressed parameter as URL-safe text, for sharing a view.
    pub fn to_share_string(&self) -> Result<String, FormatError> {
        let compressed = self.save()?;
        Ok(format!("{SHARE_PREFIX}{}", URL_SAFE_NO_PAD.encode(compressed)))
    }

    pub fn from_share_string(encoded: &str) -> Result<Self, FormatError> {
        let data = encoded
            .trim()
            .strip_prefix(SHARE_PREFIX)
            .ok_or_else(|| FormatError::ShareString(format!("missing {SHARE_PREFIX:?} prefix")))?;
        let compressed = URL_SAFE_NO_PAD
            .decode(data)
            .map_err(|e| FormatError::ShareString(e.to_string()))?;
        Self::load(&compressed)
    }
}

/// Serialize a view (and optional palette) to a compressed byte stream.
pub fn save(viewport: &Viewport, palette: Option<&Palette>) -> Result<Vec<u8>, FormatError> {
    Parameter::from_viewport(viewport, palette.cloned()).save()
}

/// Restore a parameter snapshot from a compressed byte stream.
pub fn load(bytes: &[u8]) -> Result<Parameter, FormatError> {
    Parameter::load(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Parameter {
        Parameter {
            center: DeepComplex::from_f64_pair(-0.75, 0.1, 64),
            scale: FloatExp::from_f64(0.001),
            max_iterations: 1024,
            palette: None,
        }
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn roundtrip_native_precision() {
        let original = sample();
        let restored = Parameter::load(&original.save().unwrap()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn output_is_gzip() {
        let bytes = sample().save().unwrap();
        assert_eq!(bytes[..2], GZIP_MAGIC);
    }

    #[test]
    fn uncompressed_json_is_rejected() {
        let err = Parameter::load(br#"{"version":1}"#).unwrap_err();
        assert!(matches!(err, FormatError::Compression(_)));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            Parameter::load(&[]),
            Err(FormatError::Compression(_))
        ));
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let bytes = sample().save().unwrap();
        let cut = &bytes[..bytes.len() / 2];
        assert!(Parameter::load(cut).is_err());
    }

    #[test]
    fn future_version_is_rejected() {
        let bytes = gzip(br#"{"version":2,"center":null,"extra":true}"#);
        match Parameter::load(&bytes) {
            Err(FormatError::UnsupportedVersion { found, supported }) => {
                assert_eq!(found, 2);
                assert_eq!(supported, 1);
            }
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_are_rejected() {
        let bytes = gzip(br#"{"version":1,"max_iterations":10}"#);
        assert!(matches!(Parameter::load(&bytes), Err(FormatError::Json(_))));
    }

    #[test]
    fn zero_iterations_are_rejected() {
        let mut p = sample();
        p.max_iterations = 0;
        let bytes = p.save().unwrap();
        assert!(matches!(
            Parameter::load(&bytes),
            Err(FormatError::InvalidValue(_))
        ));
    }

    #[test]
    fn negative_scale_is_rejected() {
        let mut p = sample();
        p.scale = FloatExp::from_f64(-1.0);
        let bytes = p.save().unwrap();
        assert!(matches!(
            Parameter::load(&bytes),
            Err(FormatError::InvalidValue(_))
        ));
    }

    #[test]
    fn unbounded_precision_is_rejected() {
        let bytes = gzip(
            br#"{"version":1,
                "center":{
                    "re":{"significand":"3","exponent":-2,"precision_bits":1099511627776},
                    "im":{"significand":"0","exponent":0,"precision_bits":1099511627776}},
                "scale":{"mantissa":0.5,"exp":3},
                "max_iterations":256}"#,
        );
        assert!(matches!(
            Parameter::load(&bytes),
            Err(FormatError::InvalidValue(_))
        ));
    }

    #[test]
    fn palette_survives_roundtrip() {
        let mut p = sample();
        p.palette = Some(Palette::fire());
        let restored = Parameter::load(&p.save().unwrap()).unwrap();
        assert_eq!(restored.palette, Some(Palette::fire()));
    }

    #[test]
    fn share_string_roundtrip() {
        let original = sample();
        let text = original.to_share_string().unwrap();
        assert!(text.starts_with("v1:"));
        assert_eq!(Parameter::from_share_string(&text).unwrap(), original);
    }

    #[test]
    fn share_string_without_prefix_is_rejected() {
        assert!(matches!(
            Parameter::from_share_string("abc"),
            Err(FormatError::ShareString(_))
        ));
    }
}
