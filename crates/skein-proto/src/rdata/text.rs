//! Character-string record types (TXT, HINFO).

use super::{expect_tokens, RecordData};
use crate::error::{Error, Result};
use crate::name::{CompressionTable, Name};
use crate::wire::{
    expect_consumed, fmt_character_string, parse_character_string, rdata_end,
    write_character_string, WireReader,
};
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// TXT record - one or more character-strings (RFC 1035).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TXT {
    strings: SmallVec<[Vec<u8>; 2]>,
}

impl TXT {
    /// Creates a TXT record; strings longer than 255 bytes are split.
    pub fn new(strings: impl IntoIterator<Item = impl Into<Vec<u8>>>) -> Self {
        let strings = strings
            .into_iter()
            .flat_map(|s| {
                let s: Vec<u8> = s.into();
                if s.is_empty() {
                    vec![s]
                } else {
                    s.chunks(255).map(<[u8]>::to_vec).collect()
                }
            })
            .collect();
        Self { strings }
    }

    /// Returns the character-strings.
    pub fn strings(&self) -> &[Vec<u8>] {
        &self.strings
    }

    /// Returns all strings concatenated.
    pub fn data(&self) -> Vec<u8> {
        self.strings.concat()
    }
}

impl RecordData for TXT {
    fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        let end = rdata_end(message, offset, rdlength)?;
        let mut reader = WireReader::at(&message[..end], offset);
        let mut strings = SmallVec::new();
        while reader.position() < end {
            strings.push(reader.read_character_string()?.to_vec());
        }
        Ok(Self { strings })
    }

    fn parse_text(_origin: &Name, tokens: &[&str]) -> Result<Self> {
        expect_tokens("TXT", tokens, 1, usize::MAX)?;
        let strings = tokens
            .iter()
            .map(|t| {
                let s = parse_character_string(t)?;
                check_string_len("TXT", &s)?;
                Ok(s)
            })
            .collect::<Result<_>>()?;
        Ok(Self { strings })
    }

    fn max_encoded_len(&self) -> usize {
        self.strings.iter().map(|s| 1 + s.len()).sum()
    }

    fn encode(&self, buf: &mut BytesMut, _: Option<&mut CompressionTable>, _: bool) {
        for s in &self.strings {
            write_character_string(buf, s);
        }
    }
}

impl fmt::Display for TXT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.strings.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            fmt_character_string(f, s)?;
        }
        Ok(())
    }
}

/// HINFO record - host CPU and operating system (RFC 1035, RFC 8482).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HINFO {
    cpu: Vec<u8>,
    os: Vec<u8>,
}

impl HINFO {
    /// Creates a new HINFO record.
    ///
    /// Fails if either string is longer than 255 bytes.
    pub fn new(cpu: impl Into<Vec<u8>>, os: impl Into<Vec<u8>>) -> Result<Self> {
        let cpu = cpu.into();
        let os = os.into();
        check_string_len("HINFO", &cpu)?;
        check_string_len("HINFO", &os)?;
        Ok(Self { cpu, os })
    }

    /// Returns the CPU string.
    pub fn cpu(&self) -> &[u8] {
        &self.cpu
    }

    /// Returns the operating system string.
    pub fn os(&self) -> &[u8] {
        &self.os
    }
}

impl RecordData for HINFO {
    fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        let end = rdata_end(message, offset, rdlength)?;
        let mut reader = WireReader::at(&message[..end], offset);
        let cpu = reader.read_character_string()?.to_vec();
        let os = reader.read_character_string()?.to_vec();
        expect_consumed("HINFO", offset, reader.position(), rdlength)?;
        Ok(Self { cpu, os })
    }

    fn parse_text(_origin: &Name, tokens: &[&str]) -> Result<Self> {
        expect_tokens("HINFO", tokens, 2, 2)?;
        Self::new(
            parse_character_string(tokens[0])?,
            parse_character_string(tokens[1])?,
        )
    }

    fn max_encoded_len(&self) -> usize {
        2 + self.cpu.len() + self.os.len()
    }

    fn encode(&self, buf: &mut BytesMut, _: Option<&mut CompressionTable>, _: bool) {
        write_character_string(buf, &self.cpu);
        write_character_string(buf, &self.os);
    }
}

impl fmt::Display for HINFO {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_character_string(f, &self.cpu)?;
        f.write_str(" ")?;
        fmt_character_string(f, &self.os)
    }
}

/// Rejects a character-string that cannot be encoded in one length byte.
pub(crate) fn check_string_len(rtype: &str, value: &[u8]) -> Result<()> {
    if value.len() > 255 {
        return Err(Error::invalid_rdata(
            rtype,
            format!("character-string of {} bytes exceeds 255", value.len()),
        ));
    }
    Ok(())
}
