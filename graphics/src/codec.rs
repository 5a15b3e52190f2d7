//! Material persistence codec.
//!
//! Materials persist as a sequence of tagged records. Each record is a tag,
//! a field separator, and the tag's fields joined by the same separator;
//! records are terminated by a tab. Three tags exist:
//!
//! - `s`: a stage source, holding the native stage enum value and the
//!   source name.
//! - `c`: the compile marker, emitted once after all stage records.
//! - `u`: a declared uniform name. When instance values are included a
//!   trailing empty field follows the name.
//!
//! The common uniform names are always appended after the instance-declared
//! names, so every decoded material resolves them regardless of what was
//! explicitly declared. On disk the text is UTF-16LE; only names and paths
//! are embedded, never binary content.
//!
//! Decoding replays the records against a freshly constructed program:
//! `s` opens the stage source, `c` compiles, `u` declares the name against
//! the now-compiled program, and the uniform table is locked at the end.
//! Records without a field separator are skipped. Unknown tags are ignored
//! under [`DecodeMode::Lenient`] (a forward-compatibility stance that also
//! masks damaged files); [`DecodeMode::Strict`] rejects them along with
//! malformed records and mis-encoded text.

use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;

use silene_core::paths::AssetPaths;

use crate::device::RenderDevice;
use crate::error::RenderResult;
use crate::program::{ShaderProgram, ShaderStage};
use crate::uniform::{LockPolicy, UniformTable};

/// Separator between records.
pub const RECORD_SEPARATOR: char = '\t';

/// Separator between fields within a record.
pub const FIELD_SEPARATOR: char = '\u{00A6}'; // ¦

const TAG_STAGE: &str = "s";
const TAG_COMPILE: &str = "c";
const TAG_UNIFORM: &str = "u";

/// How strictly a persisted payload is validated while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Skip separator-less records and unknown tags, decode text lossily.
    #[default]
    Lenient,
    /// Reject unknown tags, malformed records, and mis-encoded text.
    Strict,
}

/// Errors produced while decoding a persisted material payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload is not valid UTF-16LE text.
    #[error("payload is not valid UTF-16 text")]
    InvalidText,
    /// A record carried a tag this version does not know.
    #[error("unknown record tag {0:?}")]
    UnknownTag(String),
    /// A record was missing fields or carried an unparsable field.
    #[error("malformed record {0:?}")]
    MalformedRecord(String),
    /// A stage record named a stage enum value this version does not know.
    #[error("unknown shader stage code {0:?}")]
    UnknownStage(String),
}

/// Serialize program references and uniform names to the persisted text
/// encoding.
pub(crate) fn encode<'a>(
    program: &ShaderProgram,
    declared: impl Iterator<Item = &'a str>,
    common: impl Iterator<Item = &'a str>,
    include_instance_values: bool,
) -> Vec<u8> {
    let mut text = String::new();

    for (stage, name) in program.stage_names() {
        let _ = write!(
            text,
            "{TAG_STAGE}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{name}{RECORD_SEPARATOR}",
            stage.wire_code()
        );
    }
    let _ = write!(text, "{TAG_COMPILE}{FIELD_SEPARATOR}{RECORD_SEPARATOR}");

    for name in declared {
        if include_instance_values {
            let _ = write!(
                text,
                "{TAG_UNIFORM}{FIELD_SEPARATOR}{name}{FIELD_SEPARATOR}{RECORD_SEPARATOR}"
            );
        } else {
            let _ = write!(text, "{TAG_UNIFORM}{FIELD_SEPARATOR}{name}{RECORD_SEPARATOR}");
        }
    }

    for name in common {
        let _ = write!(text, "{TAG_UNIFORM}{FIELD_SEPARATOR}{name}{RECORD_SEPARATOR}");
    }

    encode_utf16_le(&text)
}

/// Replay a persisted payload into a fresh program and uniform table.
///
/// The returned table is locked. Shader sources named by stage records are
/// resolved against `paths`.
pub(crate) fn decode(
    device: &Arc<RenderDevice>,
    bytes: &[u8],
    paths: &AssetPaths,
    mode: DecodeMode,
    policy: LockPolicy,
) -> RenderResult<(ShaderProgram, UniformTable)> {
    let text = decode_utf16_le(bytes, mode)?;

    let mut program = ShaderProgram::new(device);
    let mut table = UniformTable::with_policy(policy);

    for record in text.split(RECORD_SEPARATOR) {
        if !record.contains(FIELD_SEPARATOR) {
            if mode == DecodeMode::Strict && !record.is_empty() {
                return Err(DecodeError::MalformedRecord(record.to_owned()).into());
            }
            continue;
        }

        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        match fields[0] {
            TAG_STAGE => {
                if fields.len() < 3 {
                    return Err(DecodeError::MalformedRecord(record.to_owned()).into());
                }
                let code: i32 = fields[1]
                    .parse()
                    .map_err(|_| DecodeError::MalformedRecord(record.to_owned()))?;
                let stage = ShaderStage::from_wire_code(code)
                    .ok_or_else(|| DecodeError::UnknownStage(fields[1].to_owned()))?;
                program.open(fields[2], stage, paths)?;
            }
            TAG_COMPILE => {
                program.compile()?;
            }
            TAG_UNIFORM => {
                if fields.len() < 2 {
                    return Err(DecodeError::MalformedRecord(record.to_owned()).into());
                }
                table.declare(fields[1], &program)?;
            }
            tag => match mode {
                DecodeMode::Strict => {
                    return Err(DecodeError::UnknownTag(tag.to_owned()).into());
                }
                DecodeMode::Lenient => {
                    log::debug!("skipping unrecognised material record tag {tag:?}");
                }
            },
        }
    }

    table.lock();
    Ok((program, table))
}

/// Encode text as UTF-16LE bytes.
pub fn encode_utf16_le(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// Decode UTF-16LE bytes to text.
///
/// Lenient decoding replaces invalid sequences and drops a trailing odd
/// byte; strict decoding rejects both.
pub fn decode_utf16_le(bytes: &[u8], mode: DecodeMode) -> Result<String, DecodeError> {
    if bytes.len() % 2 != 0 && mode == DecodeMode::Strict {
        return Err(DecodeError::InvalidText);
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    match mode {
        DecodeMode::Strict => String::from_utf16(&units).map_err(|_| DecodeError::InvalidText),
        DecodeMode::Lenient => Ok(String::from_utf16_lossy(&units)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{DEFAULT_FRAGMENT_SOURCE, DEFAULT_VERTEX_SOURCE};

    fn test_program() -> ShaderProgram {
        let device = RenderDevice::headless();
        let mut program = ShaderProgram::new(&device);
        program
            .open_source("basic.vert", ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE)
            .unwrap();
        program
            .open_source("basic.frag", ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE)
            .unwrap();
        program.compile().unwrap();
        program
    }

    #[test]
    fn utf16_round_trip() {
        let text = "s\u{00A6}35633\u{00A6}basic.vert\t";
        let bytes = encode_utf16_le(text);
        assert_eq!(bytes.len(), text.chars().count() * 2);
        assert_eq!(decode_utf16_le(&bytes, DecodeMode::Strict).unwrap(), text);
    }

    #[test]
    fn odd_length_payload() {
        let mut bytes = encode_utf16_le("c\u{00A6}\t");
        bytes.push(0x00);
        assert_eq!(
            decode_utf16_le(&bytes, DecodeMode::Strict),
            Err(DecodeError::InvalidText)
        );
        // Lenient decoding drops the trailing byte.
        assert_eq!(
            decode_utf16_le(&bytes, DecodeMode::Lenient).unwrap(),
            "c\u{00A6}\t"
        );
    }

    #[test]
    fn encode_emits_stage_compile_and_uniform_records() {
        let program = test_program();
        let bytes = encode(
            &program,
            ["u_Color"].into_iter(),
            ["u_MVP", "u_Position"].into_iter(),
            false,
        );
        let text = decode_utf16_le(&bytes, DecodeMode::Strict).unwrap();

        let records: Vec<&str> = text.split(RECORD_SEPARATOR).collect();
        assert_eq!(records[0], "s\u{00A6}35633\u{00A6}basic.vert");
        assert_eq!(records[1], "s\u{00A6}35632\u{00A6}basic.frag");
        assert_eq!(records[2], "c\u{00A6}");
        assert_eq!(records[3], "u\u{00A6}u_Color");
        assert_eq!(records[4], "u\u{00A6}u_MVP");
        assert_eq!(records[5], "u\u{00A6}u_Position");
        // A trailing record separator closes the payload.
        assert_eq!(records[6], "");
    }

    #[test]
    fn instance_values_add_a_trailing_empty_field() {
        let program = test_program();
        let bytes = encode(&program, ["u_Color"].into_iter(), std::iter::empty(), true);
        let text = decode_utf16_le(&bytes, DecodeMode::Strict).unwrap();
        assert!(text.contains("u\u{00A6}u_Color\u{00A6}\t"));
    }

    #[test]
    fn decode_rejects_unknown_stage_codes() {
        let device = RenderDevice::headless();
        let paths = AssetPaths::new("/nonexistent");
        let bytes = encode_utf16_le("s\u{00A6}1234\u{00A6}basic.vert\t");
        let result = decode(
            &device,
            &bytes,
            &paths,
            DecodeMode::Lenient,
            LockPolicy::Lenient,
        );
        assert!(matches!(
            result,
            Err(crate::error::RenderError::Decode(DecodeError::UnknownStage(_)))
        ));
    }
}
