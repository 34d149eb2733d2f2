use std::fmt;
use std::hash::{Hash, Hasher};

use curve25519_dalek::scalar::Scalar;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::codec::{self, impl_serde_bytes, Encode, Reader, WireType, Writer, HEADER_SIZE};
use super::curve::{self, Point, POINT_SIZE, SCALAR_SIZE};
use super::error::{PreError, PreResult};
use super::random::{self, OsRandom, RandomSource};
use super::rekey::ReEncryptionKey;

/// Size of an encoded private key in bytes
pub const PRIVATE_KEY_SIZE: usize = HEADER_SIZE + SCALAR_SIZE;
/// Size of an encoded public key in bytes
pub const PUBLIC_KEY_SIZE: usize = HEADER_SIZE + POINT_SIZE;

/// PEM tag for private keys
pub const PRIVATE_KEY_PEM_TAG: &str = "KMSCHAIN PRIVATE KEY";
/// PEM tag for public keys
pub const PUBLIC_KEY_PEM_TAG: &str = "KMSCHAIN PUBLIC KEY";

/// Public key for encapsulation and delegation
///
/// The point `pk = sk·G` on Ristretto255. Public keys are immutable and cheap to
/// copy; they can be freely shared with encryptors, proxies and delegatees.
///
/// # Examples
///
/// ```ignore
/// let keypair = KeyPair::generate()?;
/// let hex = keypair.public.to_hex();
/// let recovered = PublicKey::from_hex(&hex)?;
/// assert_eq!(keypair.public, recovered);
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    point: Point,
    compressed: [u8; POINT_SIZE],
}

impl PublicKey {
    pub(crate) fn from_point(point: Point) -> Self {
        Self {
            point,
            compressed: curve::point_to_bytes(&point),
        }
    }

    pub(crate) fn point(&self) -> &Point {
        &self.point
    }

    /// The compressed point, without the codec header
    pub fn as_point_bytes(&self) -> &[u8; POINT_SIZE] {
        &self.compressed
    }

    /// Encode as `version || tag || compressed point`
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        Writer::<PUBLIC_KEY_SIZE>::new(WireType::PublicKey)
            .bytes(&self.compressed)
            .finish()
    }

    /// Decode a public key, rejecting invalid points and the identity element
    pub fn from_bytes(bytes: &[u8]) -> PreResult<Self> {
        let mut reader = Reader::new(bytes, WireType::PublicKey, PUBLIC_KEY_SIZE)?;
        let point = reader.nonidentity_point()?;
        Ok(Self::from_point(point))
    }

    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> PreResult<Self> {
        Self::from_bytes(&codec::decode_hex(hex)?)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(PUBLIC_KEY_PEM_TAG, self.to_bytes().to_vec()))
    }

    pub fn from_pem(pem_str: &str) -> PreResult<Self> {
        Self::from_bytes(&parse_pem(pem_str, PUBLIC_KEY_PEM_TAG)?)
    }
}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.compressed.hash(state);
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey")
            .field(&hex::encode(self.compressed))
            .finish()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = PreError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl Encode for PublicKey {
    fn encode(&self) -> PreResult<Vec<u8>> {
        Ok(self.to_bytes().to_vec())
    }
}

impl_serde_bytes!(PublicKey, "a KMSChain public key encoding");

/// Private key for decapsulation and delegation
///
/// A non-zero Ristretto255 scalar. The scalar is zeroized when the key is
/// dropped, and [`PrivateKey::wipe`] (or [`Zeroize::zeroize`]) zeroizes it
/// early. A wiped key refuses every further operation with [`PreError::Wiped`].
///
/// # Security Considerations
///
/// - Never share this key with the proxy or the delegatee
/// - Store it encrypted or in a secure location (e.g. `~/.kmschain/key.pem`)
/// - The type is intentionally neither `Clone` nor `Serialize`
pub struct PrivateKey {
    scalar: Scalar,
    wiped: bool,
}

impl PrivateKey {
    pub(crate) fn from_scalar(scalar: Scalar) -> PreResult<Self> {
        if scalar == Scalar::ZERO {
            return Err(PreError::validation("private key scalar is zero"));
        }
        Ok(Self {
            scalar,
            wiped: false,
        })
    }

    /// Generate a new random private key using the OS CSPRNG
    pub fn generate() -> PreResult<Self> {
        Self::generate_with(&mut OsRandom)
    }

    /// Generate a new random private key from the given source
    pub fn generate_with<R: RandomSource + ?Sized>(rng: &mut R) -> PreResult<Self> {
        Self::from_scalar(random::nonzero_scalar(rng)?)
    }

    pub(crate) fn scalar(&self) -> PreResult<&Scalar> {
        if self.wiped {
            return Err(PreError::Wiped);
        }
        Ok(&self.scalar)
    }

    /// Derive the public key `sk·G`
    pub fn public_key(&self) -> PreResult<PublicKey> {
        Ok(PublicKey::from_point(curve::mul_base(self.scalar()?)))
    }

    /// Delegate capsules for this key to `receiving`
    ///
    /// Same as [`ReEncryptionKey::derive`].
    pub fn generate_rekey(&self, receiving: &PublicKey) -> PreResult<ReEncryptionKey> {
        ReEncryptionKey::derive(self, receiving)
    }

    /// Overwrite the scalar and make the key permanently unusable
    ///
    /// Calling this more than once is harmless.
    pub fn wipe(&mut self) {
        self.scalar.zeroize();
        self.wiped = true;
    }

    pub fn is_wiped(&self) -> bool {
        self.wiped
    }

    /// Encode as `version || tag || scalar`
    pub fn to_bytes(&self) -> PreResult<[u8; PRIVATE_KEY_SIZE]> {
        Ok(Writer::<PRIVATE_KEY_SIZE>::new(WireType::PrivateKey)
            .scalar(self.scalar()?)
            .finish())
    }

    /// Decode a private key, rejecting non-canonical and zero scalars
    pub fn from_bytes(bytes: &[u8]) -> PreResult<Self> {
        let mut reader = Reader::new(bytes, WireType::PrivateKey, PRIVATE_KEY_SIZE)?;
        Self::from_scalar(reader.scalar()?)
    }

    /// Parse a private key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> PreResult<Self> {
        let mut bytes = codec::decode_hex(hex)?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    pub fn to_hex(&self) -> PreResult<String> {
        let mut bytes = self.to_bytes()?;
        let hex = hex::encode(bytes);
        bytes.zeroize();
        Ok(hex)
    }

    /// Encode the private key in PEM format for storage
    ///
    /// Returns a PEM-encoded string with tag `KMSCHAIN PRIVATE KEY`.
    pub fn to_pem(&self) -> PreResult<String> {
        let mut bytes = self.to_bytes()?;
        let pem = pem::encode(&pem::Pem::new(PRIVATE_KEY_PEM_TAG, bytes.to_vec()));
        bytes.zeroize();
        Ok(pem)
    }

    /// Parse a private key from PEM format
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The PEM string is malformed
    /// - The PEM tag is not `KMSCHAIN PRIVATE KEY`
    /// - The encoded key is invalid
    pub fn from_pem(pem_str: &str) -> PreResult<Self> {
        let mut bytes = parse_pem(pem_str, PRIVATE_KEY_PEM_TAG)?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }
}

impl Zeroize for PrivateKey {
    fn zeroize(&mut self) {
        self.wipe();
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl ZeroizeOnDrop for PrivateKey {}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.wiped == other.wiped && bool::from(self.scalar.ct_eq(&other.scalar))
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("wiped", &self.wiped)
            .finish_non_exhaustive()
    }
}

/// A private key generated together with its public key
///
/// Invariant: `public == private·G`.
#[derive(Debug)]
pub struct KeyPair {
    pub private: PrivateKey,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a key pair using the OS CSPRNG
    pub fn generate() -> PreResult<Self> {
        Self::generate_with(&mut OsRandom)
    }

    /// Generate a key pair from the given random source
    ///
    /// Fails only when the source cannot supply entropy.
    pub fn generate_with<R: RandomSource + ?Sized>(rng: &mut R) -> PreResult<Self> {
        let private = PrivateKey::generate_with(rng)?;
        let public = private.public_key()?;
        tracing::debug!(public_key = %public, "generated key pair");
        Ok(Self { private, public })
    }

    /// Rebuild a key pair from a private key
    pub fn from_private(private: PrivateKey) -> PreResult<Self> {
        let public = private.public_key()?;
        Ok(Self { private, public })
    }

    pub fn into_parts(self) -> (PrivateKey, PublicKey) {
        (self.private, self.public)
    }
}

fn parse_pem(pem_str: &str, tag: &str) -> PreResult<Vec<u8>> {
    let pem = pem::parse(pem_str)
        .map_err(|e| PreError::validation(format!("failed to parse PEM: {e}")))?;
    if pem.tag() != tag {
        return Err(PreError::validation(format!(
            "invalid PEM tag, expected {tag}, got {}",
            pem.tag()
        )));
    }
    Ok(pem.contents().to_vec())
}
