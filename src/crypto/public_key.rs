use num_enum::{FromPrimitive, IntoPrimitive};

/// Available public key algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-9.1>
///
/// The `Display` form is the name used as key in signer and verifier tables.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive, IntoPrimitive, derive_more::Display)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt and Sign)
    #[display("RSA")]
    RSA = 1,
    /// DEPRECATED: RSA (Encrypt-Only)
    #[display("RSA")]
    RSAEncrypt = 2,
    /// DEPRECATED: RSA (Sign-Only)
    #[display("RSA")]
    RSASign = 3,
    /// Elgamal (Encrypt-Only)
    #[display("ELGAMAL")]
    Elgamal = 16,
    /// DSA (Digital Signature Algorithm)
    #[display("DSA")]
    DSA = 17,
    /// Reserved for Elliptic Curve
    #[display("ECC")]
    ECC = 18,
    /// Reserved for ECDSA
    #[display("ECDSA")]
    ECDSA = 19,
    /// Reserved for Diffie-Hellman (X9.42, as defined for IETF-S/MIME)
    #[display("DH")]
    DiffieHellman = 21,

    #[num_enum(catch_all)]
    #[display("Unknown({_0})")]
    #[cfg_attr(test, proptest(skip))]
    Unknown(u8),
}

impl PublicKeyAlgorithm {
    pub fn is_rsa(self) -> bool {
        matches!(
            self,
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign
        )
    }
}
