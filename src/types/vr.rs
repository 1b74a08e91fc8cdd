//! Value representations

use std::fmt;
use std::str::FromStr;

use crate::core::DecodeError;

/// Value representation of an attribute.
///
/// The set is closed; the capability checks below are the only place the
/// codec asks what kind of value it is handling.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Vr {
    AE, AS, AT, CS, DA, DS, DT, FL, FD, IS, LO, LT, OB, OD, OF, OW,
    PN, SH, SL, SQ, SS, ST, TM, UC, UI, UL, UN, UR, US, UT,
}

/// Shape of the values a representation carries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// Character strings
    Text,
    /// Unsigned integers (US, UL, AT)
    Unsigned,
    /// Signed integers (SS, SL)
    Signed,
    /// 32-bit floats (FL, OF)
    Float,
    /// 64-bit floats (FD, OD)
    Double,
    /// Raw bytes (OB, UN)
    Bytes,
    /// 16-bit words (OW)
    Words,
    /// Nested item collections
    Sequence,
}

impl Vr {
    /// Two-letter code
    pub fn code(self) -> &'static str {
        use Vr::*;
        match self {
            AE => "AE", AS => "AS", AT => "AT", CS => "CS", DA => "DA", DS => "DS",
            DT => "DT", FL => "FL", FD => "FD", IS => "IS", LO => "LO", LT => "LT",
            OB => "OB", OD => "OD", OF => "OF", OW => "OW", PN => "PN", SH => "SH",
            SL => "SL", SQ => "SQ", SS => "SS", ST => "ST", TM => "TM", UC => "UC",
            UI => "UI", UL => "UL", UN => "UN", UR => "UR", US => "US", UT => "UT",
        }
    }

    /// Bulk/binary representations: never compared against the base profile
    /// and never shared through it.
    pub fn is_bulk(self) -> bool {
        matches!(self, Vr::OB | Vr::OW | Vr::OF | Vr::OD)
    }

    /// Sequence of nested item collections
    pub fn is_sequence(self) -> bool {
        self == Vr::SQ
    }

    /// Unknown representation
    pub fn is_unknown(self) -> bool {
        self == Vr::UN
    }

    /// Shape of the values this representation carries
    pub fn kind(self) -> ValueKind {
        use Vr::*;
        match self {
            US | UL | AT => ValueKind::Unsigned,
            SS | SL => ValueKind::Signed,
            FL | OF => ValueKind::Float,
            FD | OD => ValueKind::Double,
            OB | UN => ValueKind::Bytes,
            OW => ValueKind::Words,
            SQ => ValueKind::Sequence,
            _ => ValueKind::Text,
        }
    }

    /// Encoded size of one numeric value, `None` for variable-length kinds
    pub fn element_size(self) -> Option<usize> {
        use Vr::*;
        match self {
            US | SS | OW => Some(2),
            UL | SL | FL | OF | AT => Some(4),
            FD | OD => Some(8),
            OB | UN => Some(1),
            _ => None,
        }
    }
}

impl FromStr for Vr {
    type Err = DecodeError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        use Vr::*;
        Ok(match code {
            "AE" => AE, "AS" => AS, "AT" => AT, "CS" => CS, "DA" => DA, "DS" => DS,
            "DT" => DT, "FL" => FL, "FD" => FD, "IS" => IS, "LO" => LO, "LT" => LT,
            "OB" => OB, "OD" => OD, "OF" => OF, "OW" => OW, "PN" => PN, "SH" => SH,
            "SL" => SL, "SQ" => SQ, "SS" => SS, "ST" => ST, "TM" => TM, "UC" => UC,
            "UI" => UI, "UL" => UL, "UN" => UN, "UR" => UR, "US" => US, "UT" => UT,
            other => return Err(DecodeError::UnknownVr(other.to_string())),
        })
    }
}

impl fmt::Display for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        for vr in [Vr::OB, Vr::OW, Vr::OF, Vr::OD] {
            assert!(vr.is_bulk(), "{vr} should be bulk");
        }
        assert!(!Vr::UN.is_bulk());
        assert!(Vr::UN.is_unknown());
        assert!(Vr::SQ.is_sequence());
        assert_eq!(Vr::OW.kind(), ValueKind::Words);
        assert_eq!(Vr::PN.kind(), ValueKind::Text);
    }

    #[test]
    fn test_code_round_trip() {
        let vr: Vr = "FD".parse().unwrap();
        assert_eq!(vr, Vr::FD);
        assert_eq!(vr.code(), "FD");
        assert_eq!("QQ".parse::<Vr>(), Err(DecodeError::UnknownVr("QQ".into())));
    }
}
