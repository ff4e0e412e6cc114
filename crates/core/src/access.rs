//! Role and ownership predicates.
//!
//! Roles are structural: an account is a business or a customer because the
//! matching profile row exists, not because of a stored flag. Holding
//! neither profile is a valid state — such an account simply cannot perform
//! role-gated actions. Call sites check for the specific profile they need
//! instead of asserting exclusivity.

use crate::domain::account::{AccountId, ProfileKind};

/// The acting user as seen by authorization checks: identity, staff bit,
/// and which profile rows exist for the account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: AccountId,
    pub is_staff: bool,
    pub has_business_profile: bool,
    pub has_customer_profile: bool,
}

impl Actor {
    pub fn is_business(&self) -> bool {
        self.has_business_profile
    }

    pub fn is_customer(&self) -> bool {
        self.has_customer_profile
    }

    /// The role reported to clients. Business wins when an account somehow
    /// holds both profiles, mirroring the lookup order of profile reads.
    pub fn profile_kind(&self) -> Option<ProfileKind> {
        if self.has_business_profile {
            Some(ProfileKind::Business)
        } else if self.has_customer_profile {
            Some(ProfileKind::Customer)
        } else {
            None
        }
    }
}

/// Admins may mutate anything; otherwise only the owner may.
pub fn is_owner_or_admin(actor: &Actor, owner: &AccountId) -> bool {
    actor.is_staff || &actor.id == owner
}

#[cfg(test)]
mod tests {
    use crate::domain::account::{AccountId, ProfileKind};

    use super::{is_owner_or_admin, Actor};

    fn actor(id: &str) -> Actor {
        Actor {
            id: AccountId(id.to_string()),
            is_staff: false,
            has_business_profile: false,
            has_customer_profile: false,
        }
    }

    #[test]
    fn owner_and_staff_pass_the_ownership_check() {
        let owner = AccountId("a-1".to_string());

        assert!(is_owner_or_admin(&actor("a-1"), &owner));
        assert!(is_owner_or_admin(&Actor { is_staff: true, ..actor("a-2") }, &owner));
        assert!(!is_owner_or_admin(&actor("a-2"), &owner));
    }

    #[test]
    fn role_predicates_follow_profile_presence() {
        let business = Actor { has_business_profile: true, ..actor("a-1") };
        assert!(business.is_business());
        assert!(!business.is_customer());
        assert_eq!(business.profile_kind(), Some(ProfileKind::Business));
    }

    #[test]
    fn an_account_with_no_profile_holds_no_role() {
        let bare = actor("a-1");
        assert!(!bare.is_business());
        assert!(!bare.is_customer());
        assert_eq!(bare.profile_kind(), None);
    }

    #[test]
    fn business_profile_wins_when_both_exist() {
        let both =
            Actor { has_business_profile: true, has_customer_profile: true, ..actor("a-1") };
        assert_eq!(both.profile_kind(), Some(ProfileKind::Business));
    }
}
