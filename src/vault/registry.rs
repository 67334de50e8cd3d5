//! Owner registry
//!
//! Owns the owner set and the admin identity. The admin mutates the owner
//! set through an [`AdminCapability`], which can only be obtained by
//! presenting the current admin identity.

use crate::vault::error::VaultError;
use crate::vault::identity::Address;
use crate::vault::quorum;
use serde::{Deserialize, Serialize};

/// Minimum number of owners when a vault is created
pub const MIN_OWNERS: usize = 3;

/// Proof that the caller was the admin at the time it was issued
#[derive(Debug)]
pub struct AdminCapability {
    holder: Address,
}

impl AdminCapability {
    pub fn holder(&self) -> &Address {
        &self.holder
    }
}

/// Authoritative owner set plus admin identity.
///
/// The owner list is unordered: removal swaps the last owner into the
/// vacated slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "RegistryData")]
pub struct OwnerRegistry {
    owners: Vec<Address>,
    admin: Address,
    /// Always `quorum::threshold(owners.len())`
    quorum: usize,
}

/// On-disk shape; the quorum is re-derived rather than trusted.
#[derive(Deserialize)]
struct RegistryData {
    owners: Vec<Address>,
    admin: Address,
}

impl From<RegistryData> for OwnerRegistry {
    fn from(data: RegistryData) -> Self {
        let mut registry = Self {
            owners: data.owners,
            admin: data.admin,
            quorum: 0,
        };
        registry.recompute_quorum();
        registry
    }
}

impl OwnerRegistry {
    /// Create a registry with at least [`MIN_OWNERS`] unique, non-null owners
    pub fn new(admin: Address, owners: Vec<Address>) -> Result<Self, VaultError> {
        if admin.is_null() {
            return Err(VaultError::InvalidIdentity);
        }
        if owners.len() < MIN_OWNERS {
            return Err(VaultError::InsufficientOwners {
                have: owners.len(),
                need: MIN_OWNERS,
            });
        }
        for (i, owner) in owners.iter().enumerate() {
            if owner.is_null() {
                return Err(VaultError::InvalidIdentity);
            }
            if owners[..i].contains(owner) {
                return Err(VaultError::DuplicateOwner(owner.clone()));
            }
        }

        let mut registry = Self {
            owners,
            admin,
            quorum: 0,
        };
        registry.recompute_quorum();
        Ok(registry)
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    /// Current quorum threshold
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn is_owner(&self, identity: &Address) -> bool {
        !identity.is_null() && self.owners.contains(identity)
    }

    /// Fail with `Unauthorized` unless `caller` is a current owner
    pub fn ensure_owner(&self, caller: &Address) -> Result<(), VaultError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(VaultError::Unauthorized(caller.clone()))
        }
    }

    /// Issue an admin capability if `caller` is the current admin
    pub fn authorize_admin(&self, caller: &Address) -> Result<AdminCapability, VaultError> {
        if caller.is_null() || *caller != self.admin {
            return Err(VaultError::Unauthorized(caller.clone()));
        }
        Ok(AdminCapability {
            holder: caller.clone(),
        })
    }

    /// Append a new owner and recompute the quorum. Returns the new quorum.
    pub fn add_owner(
        &mut self,
        cap: &AdminCapability,
        identity: Address,
    ) -> Result<usize, VaultError> {
        self.check_capability(cap)?;
        if identity.is_null() {
            return Err(VaultError::InvalidIdentity);
        }
        if self.owners.contains(&identity) {
            return Err(VaultError::AlreadyOwner(identity));
        }

        log::info!("Adding owner {}", identity);
        self.owners.push(identity);
        Ok(self.recompute_quorum())
    }

    /// Remove an owner (swap-and-pop) and recompute the quorum. Returns the
    /// new quorum. No floor is enforced on the remaining owner count.
    pub fn remove_owner(
        &mut self,
        cap: &AdminCapability,
        identity: &Address,
    ) -> Result<usize, VaultError> {
        self.check_capability(cap)?;
        if identity.is_null() {
            return Err(VaultError::InvalidIdentity);
        }
        let index = self
            .owners
            .iter()
            .position(|o| o == identity)
            .ok_or_else(|| VaultError::NotAnOwner(identity.clone()))?;

        log::info!("Removing owner {}", identity);
        self.owners.swap_remove(index);
        let quorum = self.recompute_quorum();
        if quorum == 0 {
            log::warn!(
                "Quorum degraded to 0 with {} owner(s); any owner action now executes",
                self.owners.len()
            );
        }
        Ok(quorum)
    }

    /// Replace `from` with `to` in place. The owner count, and therefore the
    /// quorum, is unchanged.
    pub fn transfer_owner_slot(
        &mut self,
        cap: &AdminCapability,
        from: &Address,
        to: Address,
    ) -> Result<(), VaultError> {
        self.check_capability(cap)?;
        if from.is_null() || to.is_null() {
            return Err(VaultError::InvalidIdentity);
        }
        let index = self
            .owners
            .iter()
            .position(|o| o == from)
            .ok_or_else(|| VaultError::NotAnOwner(from.clone()))?;
        if self.owners.contains(&to) {
            return Err(VaultError::AlreadyOwner(to));
        }

        log::info!("Replacing owner {} with {}", from, to);
        self.owners[index] = to;
        Ok(())
    }

    /// Hand the admin role to `new_admin`.
    ///
    /// Deliberately unvalidated: a null or unchanged admin is accepted.
    pub fn transfer_admin(
        &mut self,
        cap: AdminCapability,
        new_admin: Address,
    ) -> Result<Address, VaultError> {
        self.check_capability(&cap)?;
        if new_admin.is_null() {
            log::warn!("Admin role transferred to the null identity; owner set is now frozen");
        } else if new_admin == self.admin {
            log::warn!("Admin role transferred to the current admin {}", new_admin);
        }

        log::info!("Admin transferred from {} to {}", self.admin, new_admin);
        Ok(std::mem::replace(&mut self.admin, new_admin))
    }

    /// A capability issued before an admin transfer is no longer honoured
    fn check_capability(&self, cap: &AdminCapability) -> Result<(), VaultError> {
        if cap.holder != self.admin {
            return Err(VaultError::Unauthorized(cap.holder.clone()));
        }
        Ok(())
    }

    fn recompute_quorum(&mut self) -> usize {
        self.quorum = quorum::threshold(self.owners.len());
        log::debug!(
            "Quorum recomputed: {} of {} owners",
            self.quorum,
            self.owners.len()
        );
        self.quorum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn registry(n: usize) -> OwnerRegistry {
        let owners = (0..n).map(|i| addr(&format!("owner{}", i))).collect();
        OwnerRegistry::new(addr("admin"), owners).unwrap()
    }

    #[test]
    fn test_creation_validation() {
        let two = vec![addr("a"), addr("b")];
        assert_eq!(
            OwnerRegistry::new(addr("admin"), two).unwrap_err(),
            VaultError::InsufficientOwners { have: 2, need: 3 }
        );

        let dup = vec![addr("a"), addr("b"), addr("a")];
        assert_eq!(
            OwnerRegistry::new(addr("admin"), dup).unwrap_err(),
            VaultError::DuplicateOwner(addr("a"))
        );

        let null = vec![addr("a"), Address::null(), addr("c")];
        assert_eq!(
            OwnerRegistry::new(addr("admin"), null).unwrap_err(),
            VaultError::InvalidIdentity
        );

        let ok = vec![addr("a"), addr("b"), addr("c")];
        assert_eq!(
            OwnerRegistry::new(Address::null(), ok).unwrap_err(),
            VaultError::InvalidIdentity
        );
    }

    #[test]
    fn test_admin_not_required_to_be_owner() {
        let reg = registry(3);
        assert!(!reg.is_owner(reg.admin()));
        assert!(reg.authorize_admin(&addr("admin")).is_ok());
        assert!(matches!(
            reg.authorize_admin(&addr("owner0")),
            Err(VaultError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_add_owner_recomputes_quorum() {
        let mut reg = registry(3);
        assert_eq!(reg.quorum(), 1);

        let cap = reg.authorize_admin(&addr("admin")).unwrap();
        assert_eq!(reg.add_owner(&cap, addr("owner3")).unwrap(), 2);
        assert_eq!(reg.quorum(), 2);
        assert_eq!(reg.owner_count(), 4);

        assert_eq!(
            reg.add_owner(&cap, addr("owner3")).unwrap_err(),
            VaultError::AlreadyOwner(addr("owner3"))
        );
        assert_eq!(
            reg.add_owner(&cap, Address::null()).unwrap_err(),
            VaultError::InvalidIdentity
        );
    }

    #[test]
    fn test_remove_owner_swap_and_pop() {
        let mut reg = registry(5);
        let cap = reg.authorize_admin(&addr("admin")).unwrap();

        assert_eq!(reg.remove_owner(&cap, &addr("owner1")).unwrap(), 2);
        assert_eq!(reg.owners()[1], addr("owner4"));
        assert!(!reg.is_owner(&addr("owner1")));

        assert_eq!(
            reg.remove_owner(&cap, &addr("owner1")).unwrap_err(),
            VaultError::NotAnOwner(addr("owner1"))
        );
        assert_eq!(
            reg.remove_owner(&cap, &Address::null()).unwrap_err(),
            VaultError::InvalidIdentity
        );
    }

    #[test]
    fn test_remove_down_to_zero_quorum() {
        let mut reg = registry(3);
        let cap = reg.authorize_admin(&addr("admin")).unwrap();
        reg.remove_owner(&cap, &addr("owner0")).unwrap();
        assert_eq!(reg.quorum(), 1);
        reg.remove_owner(&cap, &addr("owner1")).unwrap();
        assert_eq!(reg.quorum(), 0);
        reg.remove_owner(&cap, &addr("owner2")).unwrap();
        assert_eq!(reg.owner_count(), 0);
        assert_eq!(reg.quorum(), 0);
    }

    #[test]
    fn test_transfer_owner_slot() {
        let mut reg = registry(4);
        let cap = reg.authorize_admin(&addr("admin")).unwrap();

        reg.transfer_owner_slot(&cap, &addr("owner2"), addr("new"))
            .unwrap();
        assert_eq!(reg.owners()[2], addr("new"));
        assert_eq!(reg.owner_count(), 4);
        assert_eq!(reg.quorum(), 2);

        assert_eq!(
            reg.transfer_owner_slot(&cap, &addr("owner2"), addr("x"))
                .unwrap_err(),
            VaultError::NotAnOwner(addr("owner2"))
        );
        assert_eq!(
            reg.transfer_owner_slot(&cap, &addr("owner0"), addr("owner1"))
                .unwrap_err(),
            VaultError::AlreadyOwner(addr("owner1"))
        );
        assert_eq!(
            reg.transfer_owner_slot(&cap, &addr("owner0"), Address::null())
                .unwrap_err(),
            VaultError::InvalidIdentity
        );
    }

    #[test]
    fn test_transfer_admin_revokes_old_capability() {
        let mut reg = registry(3);
        let cap = reg.authorize_admin(&addr("admin")).unwrap();
        let stale = reg.authorize_admin(&addr("admin")).unwrap();

        let previous = reg.transfer_admin(cap, addr("boss")).unwrap();
        assert_eq!(previous, addr("admin"));
        assert_eq!(reg.admin(), &addr("boss"));

        assert_eq!(
            reg.add_owner(&stale, addr("x")).unwrap_err(),
            VaultError::Unauthorized(addr("admin"))
        );
    }

    #[test]
    fn test_transfer_admin_accepts_null() {
        let mut reg = registry(3);
        let cap = reg.authorize_admin(&addr("admin")).unwrap();
        reg.transfer_admin(cap, Address::null()).unwrap();
        assert!(reg.admin().is_null());
        assert!(reg.authorize_admin(&Address::null()).is_err());
    }

    #[test]
    fn test_quorum_rederived_on_deserialize() {
        let json = r#"{"owners":["a","b","c","d","e"],"admin":"z","quorum":99}"#;
        let reg: OwnerRegistry = serde_json::from_str(json).unwrap();
        assert_eq!(reg.quorum(), 3);
    }
}
