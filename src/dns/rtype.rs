use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource record types that show up in an authentication chain.
///
/// Anything not listed is carried as `Unknown` and rendered in the
/// RFC 3597 `TYPEnnn` form.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordType {
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    NAPTR,
    DNAME,
    DS,
    SSHFP,
    RRSIG,
    NSEC,
    DNSKEY,
    NSEC3,
    NSEC3PARAM,
    TLSA,
    CDS,
    CDNSKEY,
    HTTPS,
    CAA,
    DLV,
    Unknown(u16),
}

impl RecordType {
    /// DS and DLV share a wire format and are consolidated the same way.
    pub fn is_delegation_signer(self) -> bool {
        matches!(self, Self::DS | Self::DLV)
    }

    pub fn to_u16(self) -> u16 {
        self.into()
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            6 => RecordType::SOA,
            12 => RecordType::PTR,
            15 => RecordType::MX,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            33 => RecordType::SRV,
            35 => RecordType::NAPTR,
            39 => RecordType::DNAME,
            43 => RecordType::DS,
            44 => RecordType::SSHFP,
            46 => RecordType::RRSIG,
            47 => RecordType::NSEC,
            48 => RecordType::DNSKEY,
            50 => RecordType::NSEC3,
            51 => RecordType::NSEC3PARAM,
            52 => RecordType::TLSA,
            59 => RecordType::CDS,
            60 => RecordType::CDNSKEY,
            65 => RecordType::HTTPS,
            257 => RecordType::CAA,
            32769 => RecordType::DLV,
            x => RecordType::Unknown(x),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(rtype: RecordType) -> Self {
        match rtype {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::PTR => 12,
            RecordType::MX => 15,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::SRV => 33,
            RecordType::NAPTR => 35,
            RecordType::DNAME => 39,
            RecordType::DS => 43,
            RecordType::SSHFP => 44,
            RecordType::RRSIG => 46,
            RecordType::NSEC => 47,
            RecordType::DNSKEY => 48,
            RecordType::NSEC3 => 50,
            RecordType::NSEC3PARAM => 51,
            RecordType::TLSA => 52,
            RecordType::CDS => 59,
            RecordType::CDNSKEY => 60,
            RecordType::HTTPS => 65,
            RecordType::CAA => 257,
            RecordType::DLV => 32769,
            RecordType::Unknown(x) => x,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::NS => write!(f, "NS"),
            Self::CNAME => write!(f, "CNAME"),
            Self::SOA => write!(f, "SOA"),
            Self::PTR => write!(f, "PTR"),
            Self::MX => write!(f, "MX"),
            Self::TXT => write!(f, "TXT"),
            Self::AAAA => write!(f, "AAAA"),
            Self::SRV => write!(f, "SRV"),
            Self::NAPTR => write!(f, "NAPTR"),
            Self::DNAME => write!(f, "DNAME"),
            Self::DS => write!(f, "DS"),
            Self::SSHFP => write!(f, "SSHFP"),
            Self::RRSIG => write!(f, "RRSIG"),
            Self::NSEC => write!(f, "NSEC"),
            Self::DNSKEY => write!(f, "DNSKEY"),
            Self::NSEC3 => write!(f, "NSEC3"),
            Self::NSEC3PARAM => write!(f, "NSEC3PARAM"),
            Self::TLSA => write!(f, "TLSA"),
            Self::CDS => write!(f, "CDS"),
            Self::CDNSKEY => write!(f, "CDNSKEY"),
            Self::HTTPS => write!(f, "HTTPS"),
            Self::CAA => write!(f, "CAA"),
            Self::DLV => write!(f, "DLV"),
            Self::Unknown(x) => write!(f, "TYPE{}", x),
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let rtype = match upper.as_str() {
            "A" => Self::A,
            "NS" => Self::NS,
            "CNAME" => Self::CNAME,
            "SOA" => Self::SOA,
            "PTR" => Self::PTR,
            "MX" => Self::MX,
            "TXT" => Self::TXT,
            "AAAA" => Self::AAAA,
            "SRV" => Self::SRV,
            "NAPTR" => Self::NAPTR,
            "DNAME" => Self::DNAME,
            "DS" => Self::DS,
            "SSHFP" => Self::SSHFP,
            "RRSIG" => Self::RRSIG,
            "NSEC" => Self::NSEC,
            "DNSKEY" => Self::DNSKEY,
            "NSEC3" => Self::NSEC3,
            "NSEC3PARAM" => Self::NSEC3PARAM,
            "TLSA" => Self::TLSA,
            "CDS" => Self::CDS,
            "CDNSKEY" => Self::CDNSKEY,
            "HTTPS" => Self::HTTPS,
            "CAA" => Self::CAA,
            "DLV" => Self::DLV,
            other => {
                let number = other
                    .strip_prefix("TYPE")
                    .and_then(|n| n.parse::<u16>().ok())
                    .ok_or_else(|| format!("Unknown record type: {}", s))?;
                return Ok(Self::from(number));
            }
        };
        Ok(rtype)
    }
}

impl TryFrom<String> for RecordType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(rtype: RecordType) -> Self {
        rtype.to_string()
    }
}
