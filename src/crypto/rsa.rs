//! Bridge between OpenPGP RSA key material and the `rsa` crate.

use log::debug;
use md5::Md5;
use num_bigint::traits::ModInverse;
use num_bigint::BigUint;
use num_traits::One;
use rand::{CryptoRng, Rng};
use ripemd::Ripemd160;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::crypto::hash::HashAlgorithm;
use crate::errors::{bail, unsupported_err, Error, Result};
use crate::types::{MpiBytes, PlainSecretParams, PublicParams};

/// Builds a public key from `(n, e)`.
pub fn public_key(params: &PublicParams) -> Result<RsaPublicKey> {
    let PublicParams::Rsa { n, e } = params else {
        bail!("not an RSA public key: {:?}", params);
    };
    let key = RsaPublicKey::new(n.into(), e.into())?;
    Ok(key)
}

/// Builds a private key from `(n, e)` and `(d, p, q, u)`.
///
/// `u` must be the OpenPGP CRT coefficient `p^-1 mod q`.
pub fn private_key(public: &PublicParams, secret: &PlainSecretParams) -> Result<RsaPrivateKey> {
    let (PublicParams::Rsa { n, e }, PlainSecretParams::Rsa { d, p, q, u }) = (public, secret)
    else {
        bail!("not an RSA key pair");
    };

    let p: BigUint = p.into();
    let q: BigUint = q.into();
    let u: BigUint = u.into();
    if (&p * &u) % &q != BigUint::one() {
        return Err(Error::InvalidInput);
    }

    let key = RsaPrivateKey::from_components(n.into(), e.into(), d.into(), vec![p, q])?;
    Ok(key)
}

/// Generates a key pair, returned as OpenPGP key material.
pub fn generate_key<R: Rng + CryptoRng>(
    rng: &mut R,
    bit_size: usize,
) -> Result<(PublicParams, PlainSecretParams)> {
    let key = RsaPrivateKey::new(rng, bit_size)?;

    let (p, q) = match key.primes() {
        [a, b] if a < b => (a, b),
        [a, b] => (b, a),
        _ => bail!("expected two primes"),
    };
    let u = p
        .clone()
        .mod_inverse(q)
        .and_then(|u| u.to_biguint())
        .ok_or(Error::InvalidInput)?;

    Ok((
        PublicParams::Rsa {
            n: key.n().into(),
            e: key.e().into(),
        },
        PlainSecretParams::Rsa {
            d: key.d().into(),
            p: p.into(),
            q: q.into(),
            u: u.into(),
        },
    ))
}

fn signing_scheme(hash: HashAlgorithm) -> Result<Pkcs1v15Sign> {
    let scheme = match hash {
        HashAlgorithm::Md5 => Pkcs1v15Sign::new::<Md5>(),
        HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        HashAlgorithm::Ripemd160 => Pkcs1v15Sign::new::<Ripemd160>(),
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        HashAlgorithm::Sha224 => Pkcs1v15Sign::new::<sha2::Sha224>(),
        _ => unsupported_err!("RSA signatures with {:?}", hash),
    };
    Ok(scheme)
}

/// Left pads `raw` with zeros to the size of the modulus.
fn pad_to(raw: &[u8], size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size.saturating_sub(raw.len())];
    out.extend_from_slice(raw);
    out
}

/// Signs `digest` (already hashed with `hash`), with PKCS#1 v1.5 padding.
pub fn sign(key: &RsaPrivateKey, hash: HashAlgorithm, digest: &[u8]) -> Result<MpiBytes> {
    let sig = key.sign(signing_scheme(hash)?, digest)?;
    Ok(MpiBytes::from_slice(&sig))
}

/// Verifies a PKCS#1 v1.5 signature over `digest`.
pub fn verify(key: &RsaPublicKey, hash: HashAlgorithm, digest: &[u8], sig: &[u8]) -> Result<()> {
    let sig = pad_to(sig, key.size());
    key.verify(signing_scheme(hash)?, digest, &sig)?;
    Ok(())
}

/// Encrypts `plaintext` with PKCS#1 v1.5 padding.
pub fn encrypt<R: CryptoRng + Rng>(rng: &mut R, key: &RsaPublicKey, plaintext: &[u8]) -> Result<MpiBytes> {
    debug!("RSA encrypt");
    let data = key.encrypt(rng, Pkcs1v15Encrypt, plaintext)?;
    Ok(MpiBytes::from_slice(&data))
}

/// Decrypts a PKCS#1 v1.5 padded value.
pub fn decrypt(key: &RsaPrivateKey, mpi: &MpiBytes) -> Result<Zeroizing<Vec<u8>>> {
    debug!("RSA decrypt");
    let ciphertext = pad_to(mpi.as_ref(), key.size());
    let m = key.decrypt(Pkcs1v15Encrypt, &ciphertext)?;
    Ok(Zeroizing::new(m))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_generate_sign_encrypt() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let (public, secret) = generate_key(&mut rng, 1024).unwrap();

        let PlainSecretParams::Rsa { p, q, .. } = &secret else {
            panic!("expected rsa");
        };
        assert!(BigUint::from(p) < BigUint::from(q));

        let pub_key = public_key(&public).unwrap();
        let priv_key = private_key(&public, &secret).unwrap();

        let digest = HashAlgorithm::Sha256.digest(b"hello").unwrap();
        let sig = sign(&priv_key, HashAlgorithm::Sha256, &digest).unwrap();
        verify(&pub_key, HashAlgorithm::Sha256, &digest, sig.as_ref()).unwrap();

        let other = HashAlgorithm::Sha256.digest(b"hellO").unwrap();
        assert!(verify(&pub_key, HashAlgorithm::Sha256, &other, sig.as_ref()).is_err());

        let ct = encrypt(&mut rng, &pub_key, b"session").unwrap();
        assert_eq!(decrypt(&priv_key, &ct).unwrap().as_slice(), b"session");
    }

    #[test]
    fn test_bad_coefficient() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (public, secret) = generate_key(&mut rng, 1024).unwrap();
        let PlainSecretParams::Rsa { d, p, q, .. } = secret else {
            panic!("expected rsa");
        };
        let broken = PlainSecretParams::Rsa {
            d,
            p,
            q,
            u: MpiBytes::from_slice(&[2]),
        };
        assert!(private_key(&public, &broken).is_err());
    }

    #[test]
    fn test_wrong_params() {
        let params = PublicParams::Unknown {
            data: bytes::Bytes::from_static(b"x"),
        };
        assert!(public_key(&params).is_err());
    }
}
