//! Confidential value store
//!
//! Holds every ciphertext behind an opaque [`Handle`] together with the
//! contract that produced it and its access list. Contracts only ever see
//! handles; arithmetic is delegated to the [`FheBackend`].
//!
//! Every operation runs on behalf of a contract context (`ctx`). The
//! context must be on the access list of each input handle, and is granted
//! access to the result. [`Handle::ZERO`] is accepted anywhere as an
//! encrypted zero without any access check.

use crate::acl::AccessList;
use crate::backend::FheBackend;
use crate::types::{Address, Handle};
use crate::{FHEError, FHEResult};
use parking_lot::{Mutex, RwLock};
use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Operation tags mixed into handle derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum OpTag {
    Trivial = 1,
    Random = 2,
    Add = 3,
    AddScalar = 4,
    MulScalar = 5,
    RemScalar = 6,
}

struct StoredValue<C> {
    ciphertext: C,
    origin: Address,
    acl: AccessList,
}

/// Handle-addressed ciphertext store with access control
pub struct ConfidentialValueStore<B: FheBackend> {
    backend: B,
    values: RwLock<HashMap<Handle, StoredValue<B::Ciphertext>>>,
    entropy: Mutex<ChaCha20Rng>,
    nonce: AtomicU64,
}

impl<B: FheBackend> ConfidentialValueStore<B> {
    /// Create a store whose randomness is seeded from the OS
    pub fn new(backend: B) -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::with_seed(backend, seed)
    }

    /// Create a store with a fixed entropy seed (reproducible simulations)
    pub fn with_seed(backend: B, seed: [u8; 32]) -> Self {
        Self {
            backend,
            values: RwLock::new(HashMap::new()),
            entropy: Mutex::new(ChaCha20Rng::from_seed(seed)),
            nonce: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of stored ciphertexts
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, handle: &Handle) -> bool {
        self.values.read().contains_key(handle)
    }

    /// Contract that produced the value
    pub fn origin(&self, handle: &Handle) -> Option<Address> {
        self.values.read().get(handle).map(|v| v.origin)
    }

    /// Whether `account` may use or view the value
    pub fn is_allowed(&self, handle: &Handle, account: &Address) -> bool {
        self.values
            .read()
            .get(handle)
            .map(|v| v.acl.contains(account))
            .unwrap_or(false)
    }

    /// Grant `account` access to `handle`. The granting context must itself be allowed.
    pub fn allow(&self, ctx: Address, handle: Handle, account: Address) -> FHEResult<()> {
        let mut values = self.values.write();
        let stored = values
            .get_mut(&handle)
            .ok_or(FHEError::UnknownHandle(handle))?;
        if !stored.acl.contains(&ctx) {
            return Err(FHEError::AccessDenied { handle, account: ctx });
        }
        if stored.acl.grant(account) {
            trace!(%handle, %account, "access granted");
        }
        Ok(())
    }

    /// Encrypt a public constant
    pub fn trivial(&self, ctx: Address, value: u64) -> FHEResult<Handle> {
        let ct = self.backend.encrypt_trivial(value)?;
        let handle = derive_handle(OpTag::Trivial, &ctx, &[], Some(value), None);
        Ok(self.insert(handle, ct, ctx))
    }

    /// Fresh encrypted random sample, unpredictable to the caller
    pub fn random(&self, ctx: Address) -> FHEResult<Handle> {
        let mut seed = [0u8; 32];
        self.entropy.lock().fill_bytes(&mut seed);
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);

        let ct = self.backend.encrypt_random(seed)?;
        let handle = derive_handle(OpTag::Random, &ctx, &[], None, Some(nonce));
        Ok(self.insert(handle, ct, ctx))
    }

    /// Homomorphic addition of two encrypted values
    pub fn add(&self, ctx: Address, a: Handle, b: Handle) -> FHEResult<Handle> {
        let lhs = self.operand(&ctx, &a)?;
        let rhs = self.operand(&ctx, &b)?;
        let ct = self.backend.add(&lhs, &rhs)?;
        let handle = derive_handle(OpTag::Add, &ctx, &[a, b], None, None);
        Ok(self.insert(handle, ct, ctx))
    }

    /// Add a plaintext scalar to an encrypted value
    pub fn add_scalar(&self, ctx: Address, a: Handle, scalar: u64) -> FHEResult<Handle> {
        let lhs = self.operand(&ctx, &a)?;
        let ct = self.backend.add_scalar(&lhs, scalar)?;
        let handle = derive_handle(OpTag::AddScalar, &ctx, &[a], Some(scalar), None);
        Ok(self.insert(handle, ct, ctx))
    }

    /// Multiply an encrypted value by a plaintext scalar
    pub fn scalar_multiply(&self, ctx: Address, a: Handle, scalar: u64) -> FHEResult<Handle> {
        let lhs = self.operand(&ctx, &a)?;
        let ct = self.backend.mul_scalar(&lhs, scalar)?;
        let handle = derive_handle(OpTag::MulScalar, &ctx, &[a], Some(scalar), None);
        Ok(self.insert(handle, ct, ctx))
    }

    /// Remainder of an encrypted value by a non-zero plaintext scalar
    pub fn rem_scalar(&self, ctx: Address, a: Handle, scalar: u64) -> FHEResult<Handle> {
        if scalar == 0 {
            return Err(FHEError::DivisionByZero);
        }
        let lhs = self.operand(&ctx, &a)?;
        let ct = self.backend.rem_scalar(&lhs, scalar)?;
        let handle = derive_handle(OpTag::RemScalar, &ctx, &[a], Some(scalar), None);
        Ok(self.insert(handle, ct, ctx))
    }

    /// Decrypt a value for an authorized viewer.
    ///
    /// This is the single plaintext exit of the store. It is reserved for
    /// the decryption oracle, which must have verified the viewer's signed
    /// authorization before calling it.
    pub fn reveal(&self, handle: &Handle, viewer: &Address) -> FHEResult<u64> {
        if handle.is_zero() {
            return Ok(0);
        }
        let ct = {
            let values = self.values.read();
            let stored = values
                .get(handle)
                .ok_or(FHEError::UnknownHandle(*handle))?;
            if !stored.acl.contains(viewer) {
                return Err(FHEError::AccessDenied {
                    handle: *handle,
                    account: *viewer,
                });
            }
            stored.ciphertext.clone()
        };
        self.backend.decrypt(&ct)
    }

    fn operand(&self, ctx: &Address, handle: &Handle) -> FHEResult<B::Ciphertext> {
        if handle.is_zero() {
            return self.backend.encrypt_trivial(0);
        }
        let values = self.values.read();
        let stored = values
            .get(handle)
            .ok_or(FHEError::UnknownHandle(*handle))?;
        if !stored.acl.contains(ctx) {
            return Err(FHEError::AccessDenied {
                handle: *handle,
                account: *ctx,
            });
        }
        Ok(stored.ciphertext.clone())
    }

    fn insert(&self, handle: Handle, ciphertext: B::Ciphertext, ctx: Address) -> Handle {
        let mut values = self.values.write();
        match values.get_mut(&handle) {
            // Same op over the same operands in the same context: identical value
            Some(existing) => {
                existing.acl.grant(ctx);
            }
            None => {
                values.insert(
                    handle,
                    StoredValue {
                        ciphertext,
                        origin: ctx,
                        acl: AccessList::with(ctx),
                    },
                );
                debug!(%handle, origin = %ctx, backend = self.backend.name(), "stored ciphertext");
            }
        }
        handle
    }
}

impl<B: FheBackend> std::fmt::Debug for ConfidentialValueStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfidentialValueStore")
            .field("backend", &self.backend.name())
            .field("values", &self.len())
            .finish()
    }
}

fn derive_handle(
    tag: OpTag,
    ctx: &Address,
    inputs: &[Handle],
    scalar: Option<u64>,
    nonce: Option<u64>,
) -> Handle {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"miner-fhe-handle-v1");
    hasher.update(&[tag as u8]);
    hasher.update(ctx.as_bytes());
    for input in inputs {
        hasher.update(input.as_bytes());
    }
    if let Some(scalar) = scalar {
        hasher.update(&scalar.to_le_bytes());
    }
    if let Some(nonce) = nonce {
        hasher.update(&nonce.to_le_bytes());
    }
    Handle(*hasher.finalize().as_bytes())
}
