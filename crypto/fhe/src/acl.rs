//! Access lists for encrypted values

use crate::types::Address;
use std::collections::BTreeSet;

/// Accounts and contracts permitted to use or view a handle.
///
/// Grants are permanent: there is no revocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList {
    allowed: BTreeSet<Address>,
}

impl AccessList {
    pub fn with(account: Address) -> Self {
        let mut list = Self::default();
        list.grant(account);
        list
    }

    /// Returns true if the account was newly added
    pub fn grant(&mut self, account: Address) -> bool {
        self.allowed.insert(account)
    }

    pub fn merge(&mut self, other: &AccessList) {
        self.allowed.extend(other.allowed.iter().copied());
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.allowed.contains(account)
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
