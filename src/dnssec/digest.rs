/// DS digest type mnemonics (RFC 3658, 4509, 5933, 6605)
const DIGEST_TYPES: &[(u8, &str)] = &[(1, "SHA1"), (2, "SHA256"), (3, "GOST94"), (4, "SHA384")];

/// Raw DS digest type number as it appears in DS and DLV records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DigestType(pub u8);

impl DigestType {
    pub fn mnemonic(self) -> Option<&'static str> {
        DIGEST_TYPES
            .iter()
            .find(|(number, _)| *number == self.0)
            .map(|(_, mnemonic)| *mnemonic)
    }

    /// Label for a raw digest type number, falling back to the number itself
    pub fn describe(value: u8) -> String {
        match Self(value).mnemonic() {
            Some(mnemonic) => mnemonic.to_string(),
            None => value.to_string(),
        }
    }
}
