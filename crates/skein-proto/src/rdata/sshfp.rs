//! SSHFP record (RFC 4255, RFC 6594, RFC 7479).

use super::{expect_tokens, parse_token, RecordData};
use crate::error::{Error, Result};
use crate::name::{CompressionTable, Name};
use crate::wire::{rdata_end, WireReader};
use bytes::{BufMut, BytesMut};
use data_encoding::HEXLOWER_PERMISSIVE;
use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public key algorithm of the fingerprinted SSH key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, FromPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum SshfpAlgorithm {
    /// Reserved
    None = 0,
    /// RSA
    Rsa = 1,
    /// DSA
    Dsa = 2,
    /// ECDSA
    EcDsa = 3,
    /// Ed25519
    Ed25519 = 4,
    /// Unassigned value
    #[num_enum(catch_all)]
    Other(u8),
}

/// Hash used to compute the fingerprint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, FromPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum SshfpFingerprintType {
    /// Reserved
    None = 0,
    /// SHA-1
    Sha1 = 1,
    /// SHA-256
    Sha256 = 2,
    /// Unassigned value
    #[num_enum(catch_all)]
    Other(u8),
}

/// SSHFP record - SSH public key fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SSHFP {
    algorithm: SshfpAlgorithm,
    fingerprint_type: SshfpFingerprintType,
    fingerprint: Vec<u8>,
}

impl SSHFP {
    /// Creates a new SSHFP record.
    pub fn new(
        algorithm: SshfpAlgorithm,
        fingerprint_type: SshfpFingerprintType,
        fingerprint: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            algorithm,
            fingerprint_type,
            fingerprint: fingerprint.into(),
        }
    }

    /// Returns the key algorithm.
    #[inline]
    pub const fn algorithm(&self) -> SshfpAlgorithm {
        self.algorithm
    }

    /// Returns the fingerprint hash type.
    #[inline]
    pub const fn fingerprint_type(&self) -> SshfpFingerprintType {
        self.fingerprint_type
    }

    /// Returns the raw fingerprint bytes.
    #[inline]
    pub fn fingerprint(&self) -> &[u8] {
        &self.fingerprint
    }
}

impl RecordData for SSHFP {
    fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        rdata_end(message, offset, rdlength)?;
        if rdlength < 2 {
            return Err(Error::rdata_length("SSHFP", 2, rdlength as usize));
        }
        let mut reader = WireReader::at(message, offset);
        Ok(Self {
            algorithm: reader.read_u8()?.into(),
            fingerprint_type: reader.read_u8()?.into(),
            fingerprint: reader.read_bytes(rdlength as usize - 2)?.to_vec(),
        })
    }

    fn parse_text(_origin: &Name, tokens: &[&str]) -> Result<Self> {
        expect_tokens("SSHFP", tokens, 3, usize::MAX)?;
        let algorithm = parse_token::<u8>("SSHFP", tokens[0])?.into();
        let fingerprint_type = parse_token::<u8>("SSHFP", tokens[1])?.into();
        let hex = tokens[2..].concat();
        let fingerprint = HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|e| Error::invalid_token("SSHFP", hex.as_str(), e.to_string()))?;
        Ok(Self {
            algorithm,
            fingerprint_type,
            fingerprint,
        })
    }

    fn max_encoded_len(&self) -> usize {
        2 + self.fingerprint.len()
    }

    fn encode(&self, buf: &mut BytesMut, _: Option<&mut CompressionTable>, _: bool) {
        buf.put_u8(self.algorithm.into());
        buf.put_u8(self.fingerprint_type.into());
        buf.put_slice(&self.fingerprint);
    }
}

impl fmt::Display for SSHFP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            u8::from(self.algorithm),
            u8::from(self.fingerprint_type),
            HEXLOWER_PERMISSIVE.encode(&self.fingerprint)
        )
    }
}
