// Protocols module - TLS/DTLS protocol versions, extensions and scan detail levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// TLS/SSL/DTLS protocol versions a target may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum ProtocolVersion {
    SSLv2,
    SSLv3,
    TLS10,
    TLS11,
    TLS12,
    TLS13,
    DTLS10,
    DTLS12,
}

impl ProtocolVersion {
    /// Get protocol version as wire value
    pub fn as_hex(&self) -> u16 {
        match self {
            ProtocolVersion::SSLv2 => 0x0002,
            ProtocolVersion::SSLv3 => 0x0300,
            ProtocolVersion::TLS10 => 0x0301,
            ProtocolVersion::TLS11 => 0x0302,
            ProtocolVersion::TLS12 => 0x0303,
            ProtocolVersion::TLS13 => 0x0304,
            ProtocolVersion::DTLS10 => 0xfeff,
            ProtocolVersion::DTLS12 => 0xfefd,
        }
    }

    /// Get protocol name
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolVersion::SSLv2 => "SSLv2",
            ProtocolVersion::SSLv3 => "SSLv3",
            ProtocolVersion::TLS10 => "TLS 1.0",
            ProtocolVersion::TLS11 => "TLS 1.1",
            ProtocolVersion::TLS12 => "TLS 1.2",
            ProtocolVersion::TLS13 => "TLS 1.3",
            ProtocolVersion::DTLS10 => "DTLS 1.0",
            ProtocolVersion::DTLS12 => "DTLS 1.2",
        }
    }

    pub fn is_ssl(&self) -> bool {
        matches!(self, ProtocolVersion::SSLv2 | ProtocolVersion::SSLv3)
    }

    pub fn is_tls13(&self) -> bool {
        matches!(self, ProtocolVersion::TLS13)
    }

    pub fn is_dtls(&self) -> bool {
        matches!(self, ProtocolVersion::DTLS10 | ProtocolVersion::DTLS12)
    }

    /// Get all stream-oriented versions
    pub fn all_tls() -> Vec<ProtocolVersion> {
        vec![
            ProtocolVersion::SSLv2,
            ProtocolVersion::SSLv3,
            ProtocolVersion::TLS10,
            ProtocolVersion::TLS11,
            ProtocolVersion::TLS12,
            ProtocolVersion::TLS13,
        ]
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SSLv2" | "SSL 2.0" => Ok(ProtocolVersion::SSLv2),
            "SSLv3" | "SSL 3.0" => Ok(ProtocolVersion::SSLv3),
            "TLS 1.0" | "TLSv1.0" | "TLSv1" => Ok(ProtocolVersion::TLS10),
            "TLS 1.1" | "TLSv1.1" => Ok(ProtocolVersion::TLS11),
            "TLS 1.2" | "TLSv1.2" => Ok(ProtocolVersion::TLS12),
            "TLS 1.3" | "TLSv1.3" => Ok(ProtocolVersion::TLS13),
            "DTLS 1.0" | "DTLSv1.0" => Ok(ProtocolVersion::DTLS10),
            "DTLS 1.2" | "DTLSv1.2" => Ok(ProtocolVersion::DTLS12),
            _ => Err(format!("Unknown protocol version: {}", s)),
        }
    }
}

/// TLS extensions tracked in the report's supported-extension set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum ExtensionType {
    ServerNameIndication,
    MaxFragmentLength,
    StatusRequest,
    SupportedGroups,
    EcPointFormats,
    SignatureAlgorithms,
    Heartbeat,
    Alpn,
    SignedCertificateTimestamp,
    EncryptThenMac,
    ExtendedMasterSecret,
    SessionTicket,
    PreSharedKey,
    EarlyData,
    SupportedVersions,
    Cookie,
    PskKeyExchangeModes,
    KeyShare,
    RenegotiationInfo,
}

impl ExtensionType {
    /// IANA extension code point
    pub fn code(&self) -> u16 {
        match self {
            ExtensionType::ServerNameIndication => 0x0000,
            ExtensionType::MaxFragmentLength => 0x0001,
            ExtensionType::StatusRequest => 0x0005,
            ExtensionType::SupportedGroups => 0x000a,
            ExtensionType::EcPointFormats => 0x000b,
            ExtensionType::SignatureAlgorithms => 0x000d,
            ExtensionType::Heartbeat => 0x000f,
            ExtensionType::Alpn => 0x0010,
            ExtensionType::SignedCertificateTimestamp => 0x0012,
            ExtensionType::EncryptThenMac => 0x0016,
            ExtensionType::ExtendedMasterSecret => 0x0017,
            ExtensionType::SessionTicket => 0x0023,
            ExtensionType::PreSharedKey => 0x0029,
            ExtensionType::EarlyData => 0x002a,
            ExtensionType::SupportedVersions => 0x002b,
            ExtensionType::Cookie => 0x002c,
            ExtensionType::PskKeyExchangeModes => 0x002d,
            ExtensionType::KeyShare => 0x0033,
            ExtensionType::RenegotiationInfo => 0xff01,
        }
    }

    /// Look up a known extension by code point
    pub fn from_code(code: u16) -> Option<Self> {
        Self::all().into_iter().find(|ext| ext.code() == code)
    }

    pub fn all() -> Vec<ExtensionType> {
        vec![
            ExtensionType::ServerNameIndication,
            ExtensionType::MaxFragmentLength,
            ExtensionType::StatusRequest,
            ExtensionType::SupportedGroups,
            ExtensionType::EcPointFormats,
            ExtensionType::SignatureAlgorithms,
            ExtensionType::Heartbeat,
            ExtensionType::Alpn,
            ExtensionType::SignedCertificateTimestamp,
            ExtensionType::EncryptThenMac,
            ExtensionType::ExtendedMasterSecret,
            ExtensionType::SessionTicket,
            ExtensionType::PreSharedKey,
            ExtensionType::EarlyData,
            ExtensionType::SupportedVersions,
            ExtensionType::Cookie,
            ExtensionType::PskKeyExchangeModes,
            ExtensionType::KeyShare,
            ExtensionType::RenegotiationInfo,
        ]
    }
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:04x})", self, self.code())
    }
}

/// Scan thoroughness, ordered from fastest to most exhaustive
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScannerDetail {
    Quick,
    #[default]
    Normal,
    Detailed,
    All,
}

impl ScannerDetail {
    pub fn is_greater_equal_to(&self, other: ScannerDetail) -> bool {
        *self >= other
    }
}

impl fmt::Display for ScannerDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScannerDetail::Quick => "quick",
            ScannerDetail::Normal => "normal",
            ScannerDetail::Detailed => "detailed",
            ScannerDetail::All => "all",
        };
        write!(f, "{}", name)
    }
}
