//! Structured (typed) messages
//!
//! A signable message is the triple (domain, type spec, message). The
//! digest binds all three, so a signature produced for one verifying
//! contract, chain or message type cannot be replayed against another:
//!
//! ```text
//! digest = H(0x19 0x01 || domain_separator || struct_hash)
//! domain_separator = H(H(domain type) || H(name) || H(version) || chain_id || verifying_contract)
//! struct_hash = H(H(type string) || enc(field_1) || ... || enc(field_n))
//! ```
//!
//! `H` is SHA-256. Fields are encoded to 32-byte words in the order of the
//! type spec; dynamic values (`bytes`, `address[]`) are hashed first.

use crate::errors::{WalletError, WalletResult};
use miner_fhe::Address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

const DOMAIN_TYPE: &str =
    "Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Signing domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Domain {
    pub fn separator(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(sha256(DOMAIN_TYPE.as_bytes()));
        hasher.update(sha256(self.name.as_bytes()));
        hasher.update(sha256(self.version.as_bytes()));
        hasher.update(uint_word(self.chain_id));
        hasher.update(address_word(&self.verifying_contract));
        hasher.finalize().into()
    }
}

/// Supported field kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Bytes,
    Address,
    AddressArray,
    Uint256,
}

impl FieldKind {
    fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Bytes => "bytes",
            FieldKind::Address => "address",
            FieldKind::AddressArray => "address[]",
            FieldKind::Uint256 => "uint256",
        }
    }
}

/// One named field of a type spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

/// Primary type and ordered field list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub primary_type: String,
    pub fields: Vec<FieldSpec>,
}

impl TypeSpec {
    pub fn new(primary_type: impl Into<String>) -> Self {
        Self {
            primary_type: primary_type.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
        });
        self
    }

    /// Canonical type string, e.g. `Foo(bytes key,uint256 start)`
    pub fn encode_type(&self) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{} {}", f.kind.type_name(), f.name))
            .collect();
        format!("{}({})", self.primary_type, fields.join(","))
    }
}

/// Field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Bytes(Vec<u8>),
    Address(Address),
    AddressArray(Vec<Address>),
    Uint256(u64),
}

impl FieldValue {
    fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Bytes(_) => FieldKind::Bytes,
            FieldValue::Address(_) => FieldKind::Address,
            FieldValue::AddressArray(_) => FieldKind::AddressArray,
            FieldValue::Uint256(_) => FieldKind::Uint256,
        }
    }

    fn encode(&self) -> [u8; 32] {
        match self {
            FieldValue::Bytes(bytes) => sha256(bytes),
            FieldValue::Address(address) => address_word(address),
            FieldValue::AddressArray(addresses) => {
                let mut hasher = Sha256::new();
                for address in addresses {
                    hasher.update(address_word(address));
                }
                hasher.finalize().into()
            }
            FieldValue::Uint256(value) => uint_word(*value),
        }
    }
}

/// Message values keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredMessage {
    values: BTreeMap<String, FieldValue>,
}

impl StructuredMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Hash of the message under `spec`; fails if the message does not
    /// carry exactly the declared fields with the declared kinds
    pub fn struct_hash(&self, spec: &TypeSpec) -> WalletResult<[u8; 32]> {
        if self.values.len() != spec.fields.len() {
            let unknown = self
                .values
                .keys()
                .find(|name| !spec.fields.iter().any(|f| &f.name == *name))
                .cloned()
                .unwrap_or_default();
            return Err(WalletError::TypeMismatch {
                field: unknown,
                reason: format!(
                    "expected {} fields, got {}",
                    spec.fields.len(),
                    self.values.len()
                ),
            });
        }

        let mut hasher = Sha256::new();
        hasher.update(sha256(spec.encode_type().as_bytes()));
        for field in &spec.fields {
            let value = self
                .values
                .get(&field.name)
                .ok_or_else(|| WalletError::TypeMismatch {
                    field: field.name.clone(),
                    reason: "missing".into(),
                })?;
            if value.kind() != field.kind {
                return Err(WalletError::TypeMismatch {
                    field: field.name.clone(),
                    reason: format!(
                        "declared {}, got {}",
                        field.kind.type_name(),
                        value.kind().type_name()
                    ),
                });
            }
            hasher.update(value.encode());
        }
        Ok(hasher.finalize().into())
    }
}

/// Final digest that gets signed
pub fn signing_digest(
    domain: &Domain,
    spec: &TypeSpec,
    message: &StructuredMessage,
) -> WalletResult<[u8; 32]> {
    let struct_hash = message.struct_hash(spec)?;
    let mut hasher = Sha256::new();
    hasher.update([0x19, 0x01]);
    hasher.update(domain.separator());
    hasher.update(struct_hash);
    Ok(hasher.finalize().into())
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TypeSpec {
        TypeSpec::new("Greeting")
            .field("to", FieldKind::Address)
            .field("amount", FieldKind::Uint256)
    }

    fn domain(chain_id: u64) -> Domain {
        Domain {
            name: "Test".into(),
            version: "1".into(),
            chain_id,
            verifying_contract: Address::from_label("verifier"),
        }
    }

    #[test]
    fn test_encode_type() {
        assert_eq!(spec().encode_type(), "Greeting(address to,uint256 amount)");
    }

    #[test]
    fn test_digest_binds_domain() {
        let message = StructuredMessage::new()
            .with("to", FieldValue::Address(Address::from_label("bob")))
            .with("amount", FieldValue::Uint256(5));

        let a = signing_digest(&domain(1), &spec(), &message).unwrap();
        let b = signing_digest(&domain(2), &spec(), &message).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let message = StructuredMessage::new()
            .with("to", FieldValue::Uint256(1))
            .with("amount", FieldValue::Uint256(5));

        let err = message.struct_hash(&spec()).unwrap_err();
        assert!(matches!(err, WalletError::TypeMismatch { ref field, .. } if field == "to"));
    }

    #[test]
    fn test_missing_and_extra_fields_rejected() {
        let missing = StructuredMessage::new().with("to", FieldValue::Address(Address::ZERO));
        assert!(missing.struct_hash(&spec()).is_err());

        let extra = StructuredMessage::new()
            .with("to", FieldValue::Address(Address::ZERO))
            .with("amount", FieldValue::Uint256(1))
            .with("memo", FieldValue::Bytes(vec![1]));
        assert!(extra.struct_hash(&spec()).is_err());
    }
}
