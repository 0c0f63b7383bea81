//! Standard security handler support for PDFs that open without a password.
//!
//! Owner-password documents are never decrypted as a whole. Their existing
//! strings and streams are written back exactly as they were read, and only
//! the objects the watermarker adds (or lifts out of object streams) are
//! encrypted, under the key the empty user password unlocks. The document
//! keeps its `/Encrypt` dictionary, file ID and permissions.
//!
//! Supported: RC4 (V1/V2, R2/R3), crypt filters with RC4 or AES-128 (V4/R4)
//! and AES-256 (V5, R5/R6).

use super::WatermarkError;
use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use lopdf::{Dictionary, Document, Object, ObjectId};
use md5::Md5;
use sha2::{Digest, Sha256, Sha384, Sha512};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Padding string from the standard security handler.
const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

const AES_BLOCK_LEN: usize = 16;

/// How one class of objects (strings or streams) is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    /// Stored in the clear
    Identity,
    /// RC4 with a per-object key
    Rc4,
    /// AES-128-CBC with a per-object key (`AESV2`)
    Aes128,
    /// AES-256-CBC with the file key (`AESV3`)
    Aes256,
}

/// Key and methods for sealing new objects into an encrypted document.
#[derive(Clone)]
pub struct DocumentCipher {
    key: Vec<u8>,
    streams: CryptMethod,
    strings: CryptMethod,
}

impl std::fmt::Debug for DocumentCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCipher")
            .field("streams", &self.streams)
            .field("strings", &self.strings)
            .finish_non_exhaustive()
    }
}

fn unsupported(message: impl Into<String>) -> WatermarkError {
    WatermarkError::PdfUnsupportedEncryption(message.into())
}

fn integer(dict: &Dictionary, key: &[u8]) -> Result<i64, WatermarkError> {
    dict.get(key)
        .and_then(Object::as_i64)
        .map_err(|_| unsupported(format!("/{} is missing or not a number", String::from_utf8_lossy(key))))
}

fn string<'a>(dict: &'a Dictionary, key: &[u8]) -> Result<&'a [u8], WatermarkError> {
    dict.get(key)
        .and_then(Object::as_str)
        .map_err(|_| unsupported(format!("/{} is missing or not a string", String::from_utf8_lossy(key))))
}

impl DocumentCipher {
    /// Unlock an encrypted document with the empty user password.
    ///
    /// Returns `Ok(None)` when the document is not encrypted, and
    /// [`WatermarkError::PdfPasswordRequired`] when opening it needs a password.
    pub fn for_document(doc: &Document) -> Result<Option<Self>, WatermarkError> {
        if !doc.is_encrypted() {
            return Ok(None);
        }

        let dict = match doc.trailer.get(b"Encrypt") {
            Ok(Object::Reference(id)) => doc.get_dictionary(*id),
            Ok(object) => object.as_dict(),
            Err(e) => Err(e),
        }
        .map_err(|e| unsupported(format!("unreadable /Encrypt dictionary: {}", e)))?;

        let handler = dict
            .get(b"Filter")
            .and_then(Object::as_name)
            .unwrap_or_default();
        if handler != b"Standard" {
            return Err(unsupported(format!(
                "security handler '{}'",
                String::from_utf8_lossy(handler)
            )));
        }

        let version = dict.get(b"V").and_then(Object::as_i64).unwrap_or(0);
        let revision = integer(dict, b"R")?;

        let cipher = match version {
            1 | 2 => {
                let key_len = if version == 1 {
                    5
                } else {
                    dict.get(b"Length")
                        .and_then(Object::as_i64)
                        .unwrap_or(40) as usize
                        / 8
                };
                let key = legacy_file_key(doc, dict, revision, key_len)?;
                Self {
                    key,
                    streams: CryptMethod::Rc4,
                    strings: CryptMethod::Rc4,
                }
            }
            4 => {
                let streams = crypt_filter(doc, dict, b"StmF")?;
                let strings = crypt_filter(doc, dict, b"StrF")?;
                let key = legacy_file_key(doc, dict, revision, 16)?;
                Self {
                    key,
                    streams,
                    strings,
                }
            }
            5 => {
                let streams = crypt_filter(doc, dict, b"StmF")?;
                let strings = crypt_filter(doc, dict, b"StrF")?;
                let key = modern_file_key(dict, revision)?;
                Self {
                    key,
                    streams,
                    strings,
                }
            }
            other => return Err(unsupported(format!("encryption version {}", other))),
        };

        Ok(Some(cipher))
    }

    pub fn stream_method(&self) -> CryptMethod {
        self.streams
    }

    pub fn string_method(&self) -> CryptMethod {
        self.strings
    }

    /// Encrypt the content of a stream stored as object `id`.
    pub fn encrypt_stream(&self, id: ObjectId, plain: &[u8]) -> Result<Vec<u8>, String> {
        self.encrypt(self.streams, id, plain)
    }

    /// Decrypt the content of a stream stored as object `id`.
    pub fn decrypt_stream(&self, id: ObjectId, sealed: &[u8]) -> Result<Vec<u8>, String> {
        self.decrypt(self.streams, id, sealed)
    }

    /// Encrypt every string inside `object`, which is stored as object `id`.
    pub fn seal_strings(&self, id: ObjectId, object: &mut Object) -> Result<(), String> {
        match object {
            Object::String(content, format) => {
                *content = self.encrypt(self.strings, id, content)?;
                *format = lopdf::StringFormat::Hexadecimal;
            }
            Object::Array(items) => {
                for item in items {
                    self.seal_strings(id, item)?;
                }
            }
            Object::Dictionary(dict) => {
                for (_, value) in dict.iter_mut() {
                    self.seal_strings(id, value)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Per-object key (for AES-256 the file key is used directly).
    fn object_key(&self, method: CryptMethod, id: ObjectId) -> Vec<u8> {
        if method == CryptMethod::Aes256 {
            return self.key.clone();
        }

        let mut hasher = Md5::new();
        hasher.update(&self.key);
        hasher.update(&id.0.to_le_bytes()[..3]);
        hasher.update(&id.1.to_le_bytes()[..2]);
        if method == CryptMethod::Aes128 {
            hasher.update(b"sAlT");
        }
        let digest = hasher.finalize();
        digest[..(self.key.len() + 5).min(16)].to_vec()
    }

    fn encrypt(&self, method: CryptMethod, id: ObjectId, plain: &[u8]) -> Result<Vec<u8>, String> {
        let key = self.object_key(method, id);
        match method {
            CryptMethod::Identity => Ok(plain.to_vec()),
            CryptMethod::Rc4 => Ok(Rc4::new(&key).apply(plain)),
            CryptMethod::Aes128 => {
                let iv: [u8; AES_BLOCK_LEN] = rand::random();
                let cipher = Aes128CbcEnc::new_from_slices(&key, &iv)
                    .map_err(|e| format!("AES key error: {:?}", e))?;
                seal_with_iv(iv, plain, |buf| {
                    cipher
                        .encrypt_padded_b2b_mut::<Pkcs7>(plain, buf)
                        .map(|out| out.len())
                        .map_err(|e| format!("AES encryption error: {:?}", e))
                })
            }
            CryptMethod::Aes256 => {
                let iv: [u8; AES_BLOCK_LEN] = rand::random();
                let cipher = Aes256CbcEnc::new_from_slices(&key, &iv)
                    .map_err(|e| format!("AES key error: {:?}", e))?;
                seal_with_iv(iv, plain, |buf| {
                    cipher
                        .encrypt_padded_b2b_mut::<Pkcs7>(plain, buf)
                        .map(|out| out.len())
                        .map_err(|e| format!("AES encryption error: {:?}", e))
                })
            }
        }
    }

    fn decrypt(&self, method: CryptMethod, id: ObjectId, sealed: &[u8]) -> Result<Vec<u8>, String> {
        let key = self.object_key(method, id);
        match method {
            CryptMethod::Identity => Ok(sealed.to_vec()),
            CryptMethod::Rc4 => Ok(Rc4::new(&key).apply(sealed)),
            CryptMethod::Aes128 | CryptMethod::Aes256 => {
                if sealed.len() < AES_BLOCK_LEN * 2 || sealed.len() % AES_BLOCK_LEN != 0 {
                    return Err(format!("AES data has invalid length {}", sealed.len()));
                }
                let (iv, data) = sealed.split_at(AES_BLOCK_LEN);
                let mut out = vec![0u8; data.len()];
                let len = if method == CryptMethod::Aes128 {
                    Aes128CbcDec::new_from_slices(&key, iv)
                        .map_err(|e| format!("AES key error: {:?}", e))?
                        .decrypt_padded_b2b_mut::<Pkcs7>(data, &mut out)
                        .map_err(|e| format!("AES decryption error: {:?}", e))?
                        .len()
                } else {
                    Aes256CbcDec::new_from_slices(&key, iv)
                        .map_err(|e| format!("AES key error: {:?}", e))?
                        .decrypt_padded_b2b_mut::<Pkcs7>(data, &mut out)
                        .map_err(|e| format!("AES decryption error: {:?}", e))?
                        .len()
                };
                out.truncate(len);
                Ok(out)
            }
        }
    }
}

/// Prefix the IV to the ciphertext written by `encrypt`.
fn seal_with_iv(
    iv: [u8; AES_BLOCK_LEN],
    plain: &[u8],
    encrypt: impl FnOnce(&mut [u8]) -> Result<usize, String>,
) -> Result<Vec<u8>, String> {
    let padded_len = (plain.len() / AES_BLOCK_LEN + 1) * AES_BLOCK_LEN;
    let mut out = vec![0u8; AES_BLOCK_LEN + padded_len];
    out[..AES_BLOCK_LEN].copy_from_slice(&iv);
    let written = encrypt(&mut out[AES_BLOCK_LEN..])?;
    out.truncate(AES_BLOCK_LEN + written);
    Ok(out)
}

/// Method selected by a V4/V5 `/StmF` or `/StrF` entry.
fn crypt_filter(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<CryptMethod, WatermarkError> {
    let name = match dict.get(key) {
        Ok(object) => object
            .as_name()
            .map_err(|_| unsupported(format!("/{} is not a name", String::from_utf8_lossy(key))))?,
        Err(_) => return Ok(CryptMethod::Identity),
    };
    if name == b"Identity" {
        return Ok(CryptMethod::Identity);
    }

    let filters = match dict.get(b"CF") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id),
        Ok(object) => object.as_dict(),
        Err(e) => Err(e),
    }
    .map_err(|_| unsupported("crypt filters (/CF) are missing"))?;
    let filter = match filters.get(name) {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id),
        Ok(object) => object.as_dict(),
        Err(e) => Err(e),
    }
    .map_err(|_| {
        unsupported(format!(
            "crypt filter '{}' is not defined",
            String::from_utf8_lossy(name)
        ))
    })?;

    match filter.get(b"CFM").and_then(Object::as_name) {
        Ok(b"V2") => Ok(CryptMethod::Rc4),
        Ok(b"AESV2") => Ok(CryptMethod::Aes128),
        Ok(b"AESV3") => Ok(CryptMethod::Aes256),
        Ok(b"None") | Err(_) => Ok(CryptMethod::Identity),
        Ok(other) => Err(unsupported(format!(
            "crypt filter method '{}'",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// File key for revisions 2 to 4, checked against `/U`.
fn legacy_file_key(
    doc: &Document,
    dict: &Dictionary,
    revision: i64,
    key_len: usize,
) -> Result<Vec<u8>, WatermarkError> {
    if !(2..=4).contains(&revision) {
        return Err(unsupported(format!("security handler revision {}", revision)));
    }
    if !(5..=16).contains(&key_len) {
        return Err(unsupported(format!("key length of {} bytes", key_len)));
    }

    let owner = string(dict, b"O")?;
    let user = string(dict, b"U")?;
    let permissions = integer(dict, b"P")? as i32;
    let encrypt_metadata = dict
        .get(b"EncryptMetadata")
        .and_then(Object::as_bool)
        .unwrap_or(true);
    let file_id = doc
        .trailer
        .get(b"ID")
        .and_then(Object::as_array)
        .ok()
        .and_then(|ids| ids.first())
        .and_then(|id| id.as_str().ok())
        .ok_or_else(|| unsupported("file /ID is missing"))?;

    if owner.len() < 32 || user.len() < 16 {
        return Err(unsupported("/O or /U is too short"));
    }

    // The empty password is all padding
    let mut hasher = Md5::new();
    hasher.update(PASSWORD_PADDING);
    hasher.update(&owner[..32]);
    hasher.update(permissions.to_le_bytes());
    hasher.update(file_id);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF; 4]);
    }
    let mut key = hasher.finalize()[..key_len].to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            key = Md5::digest(&key)[..key_len].to_vec();
        }
    }

    let matches = if revision == 2 {
        user.len() >= 32 && Rc4::new(&key).apply(&PASSWORD_PADDING) == user[..32]
    } else {
        let mut hasher = Md5::new();
        hasher.update(PASSWORD_PADDING);
        hasher.update(file_id);
        let mut check = Rc4::new(&key).apply(&hasher.finalize());
        for round in 1..=19u8 {
            let round_key: Vec<u8> = key.iter().map(|b| b ^ round).collect();
            check = Rc4::new(&round_key).apply(&check);
        }
        check[..16] == user[..16]
    };

    if matches {
        Ok(key)
    } else {
        Err(WatermarkError::PdfPasswordRequired)
    }
}

/// File key for AES-256 documents (revisions 5 and 6), checked against `/U`.
fn modern_file_key(dict: &Dictionary, revision: i64) -> Result<Vec<u8>, WatermarkError> {
    if !(5..=6).contains(&revision) {
        return Err(unsupported(format!("security handler revision {}", revision)));
    }

    let user = string(dict, b"U")?;
    let user_key = string(dict, b"UE")?;
    if user.len() < 48 || user_key.len() < 32 {
        return Err(unsupported("/U or /UE is too short"));
    }

    let validation_salt = &user[32..40];
    let key_salt = &user[40..48];
    let check = hardened_hash(revision, b"", validation_salt)
        .map_err(|e| unsupported(format!("password hash failed: {}", e)))?;
    if check[..] != user[..32] {
        return Err(WatermarkError::PdfPasswordRequired);
    }

    let intermediate = hardened_hash(revision, b"", key_salt)
        .map_err(|e| unsupported(format!("password hash failed: {}", e)))?;
    let mut key = vec![0u8; 32];
    Aes256CbcDec::new_from_slices(&intermediate, &[0u8; AES_BLOCK_LEN])
        .map_err(|e| unsupported(format!("AES key error: {:?}", e)))?
        .decrypt_padded_b2b_mut::<NoPadding>(&user_key[..32], &mut key)
        .map_err(|e| unsupported(format!("/UE could not be unwrapped: {:?}", e)))?;
    Ok(key)
}

/// Password hash for revision 5 (one SHA-256) and revision 6 (iterated).
fn hardened_hash(revision: i64, password: &[u8], salt: &[u8]) -> Result<[u8; 32], String> {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    let mut k = hasher.finalize().to_vec();

    if revision >= 6 {
        let mut round = 0u32;
        loop {
            let mut block = Vec::with_capacity(64 * (password.len() + k.len()));
            for _ in 0..64 {
                block.extend_from_slice(password);
                block.extend_from_slice(&k);
            }

            let mut e = vec![0u8; block.len()];
            Aes128CbcEnc::new_from_slices(&k[..16], &k[16..32])
                .map_err(|err| format!("AES key error: {:?}", err))?
                .encrypt_padded_b2b_mut::<NoPadding>(&block, &mut e)
                .map_err(|err| format!("AES encryption error: {:?}", err))?;

            // The first 16 bytes as a big-endian number, mod 3
            let selector = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
            k = match selector {
                0 => Sha256::digest(&e).to_vec(),
                1 => Sha384::digest(&e).to_vec(),
                _ => Sha512::digest(&e).to_vec(),
            };

            round += 1;
            let last = e.last().copied().map(u32::from).unwrap_or(0);
            if round >= 64 && last <= round - 32 {
                break;
            }
        }
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&k[..32]);
    Ok(hash)
}

/// RC4 keystream; encryption and decryption are the same operation.
struct Rc4 {
    state: [u8; 256],
}

impl Rc4 {
    fn new(key: &[u8]) -> Self {
        let mut state = [0u8; 256];
        for (i, slot) in state.iter_mut().enumerate() {
            *slot = i as u8;
        }

        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }

        Self { state }
    }

    fn apply(mut self, data: &[u8]) -> Vec<u8> {
        let (mut i, mut j) = (0u8, 0u8);
        data.iter()
            .map(|&byte| {
                i = i.wrapping_add(1);
                j = j.wrapping_add(self.state[i as usize]);
                self.state.swap(i as usize, j as usize);
                let k = self.state[self.state[i as usize].wrapping_add(self.state[j as usize]) as usize];
                byte ^ k
            })
            .collect()
    }
}
