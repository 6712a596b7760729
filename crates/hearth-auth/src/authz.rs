//! Authorization predicates over an authenticated identity.

use hearth_core::error::{HearthError, HearthResult};
use hearth_core::models::account::Account;
use hearth_core::models::role::Role;
use uuid::Uuid;

/// The authenticated caller attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            role: account.role,
            is_verified: account.is_verified,
        }
    }
}

/// A resource that names the account owning it, e.g. a listing.
pub trait OwnedResource {
    fn owner_id(&self) -> Uuid;
}

impl Identity {
    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }

    pub fn owns_or_admin(&self, owner_id: Uuid) -> bool {
        self.role.is_admin() || self.id == owner_id
    }

    pub fn require_role(&self, allowed: &[Role]) -> HearthResult<()> {
        if self.has_role(allowed) {
            Ok(())
        } else {
            Err(HearthError::forbidden(format!(
                "role {} may not perform this action",
                self.role
            )))
        }
    }

    pub fn require_owner_or_admin<R: OwnedResource + ?Sized>(&self, resource: &R) -> HearthResult<()> {
        if self.owns_or_admin(resource.owner_id()) {
            Ok(())
        } else {
            Err(HearthError::forbidden("not the owner of this resource"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Listing {
        agent: Uuid,
    }

    impl OwnedResource for Listing {
        fn owner_id(&self) -> Uuid {
            self.agent
        }
    }

    fn identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "caller@x.com".into(),
            role,
            is_verified: true,
        }
    }

    #[test]
    fn role_gate() {
        let agent = identity(Role::Agent);
        assert!(agent.require_role(&[Role::Agent, Role::Admin]).is_ok());
        let err = identity(Role::User)
            .require_role(&[Role::Agent, Role::Admin])
            .unwrap_err();
        assert!(matches!(err, HearthError::Forbidden { .. }));
    }

    #[test]
    fn owner_passes_ownership_gate() {
        let owner = identity(Role::Agent);
        let listing = Listing { agent: owner.id };
        assert!(owner.require_owner_or_admin(&listing).is_ok());
    }

    #[test]
    fn admin_passes_ownership_gate() {
        let listing = Listing {
            agent: Uuid::new_v4(),
        };
        assert!(identity(Role::Admin).require_owner_or_admin(&listing).is_ok());
    }

    #[test]
    fn stranger_fails_ownership_gate() {
        let listing = Listing {
            agent: Uuid::new_v4(),
        };
        assert!(identity(Role::Agent).require_owner_or_admin(&listing).is_err());
    }
}
