//! The order snapshot engine.
//!
//! An order materializes a chosen variant into an immutable record at
//! creation time. Back-filling of missing snapshot fields is an explicit
//! hydration step invoked here, not a hidden save hook: missing fields are
//! filled from the linked offer and variant, never rejected.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::access::Actor;
use crate::domain::account::AccountId;
use crate::domain::offer::{Offer, OfferType, OfferVariant};
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::errors::DomainError;

/// The two order-creation entry points, preserved with their diverging
/// initial statuses. Whether they should agree is an open product
/// question; until then both defaults are part of the contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreationPath {
    /// Generic creation: starts out `pending`.
    Standard,
    /// The "buy now" path behind `POST /orders`: starts out `in_progress`.
    Direct,
}

impl CreationPath {
    pub fn initial_status(&self) -> OrderStatus {
        match self {
            Self::Standard => OrderStatus::Pending,
            Self::Direct => OrderStatus::InProgress,
        }
    }
}

/// A partially constructed order before hydration. Empty/zero values mark
/// fields the snapshot still has to fill.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderDraft {
    pub customer_id: AccountId,
    pub business_id: Option<AccountId>,
    pub title: String,
    pub price: Decimal,
    pub delivery_time_in_days: i64,
    pub revisions: i64,
    pub features: Vec<String>,
    pub offer_type: OfferType,
    pub status: OrderStatus,
}

/// Fill missing snapshot fields from the source offer and variant.
/// Present fields are left alone; nothing here ever fails.
pub fn hydrate_snapshot(draft: &mut OrderDraft, offer: &Offer, variant: &OfferVariant) {
    if draft.business_id.is_none() {
        draft.business_id = Some(offer.owner.clone());
    }
    if draft.features.is_empty() {
        draft.features = variant.features.clone();
    }
    if draft.title.is_empty() {
        draft.title = offer.title.clone();
    }
    if draft.price.is_zero() {
        draft.price = variant.price;
    }
    if draft.delivery_time_in_days <= 0 {
        draft.delivery_time_in_days = variant.delivery_time_in_days;
    }
}

/// Create an order from a chosen variant.
///
/// Only a customer-profile holder may order; the business side is resolved
/// from the offer owner once and never changes afterward. The variant's
/// fields are copied into the order and never re-derived, so later edits
/// or deletion of the variant leave existing orders untouched.
pub fn create_order(
    actor: &Actor,
    offer: &Offer,
    variant: &OfferVariant,
    path: CreationPath,
    now: DateTime<Utc>,
) -> Result<Order, DomainError> {
    if actor.is_business() {
        return Err(DomainError::PermissionDenied(
            "Business profiles cannot create orders.".to_string(),
        ));
    }
    if !actor.is_customer() {
        return Err(DomainError::PermissionDenied("Only customers can create orders.".to_string()));
    }
    if variant.offer_id != offer.id {
        return Err(DomainError::NotFound("offer detail"));
    }

    let mut draft = match path {
        CreationPath::Direct => OrderDraft {
            customer_id: actor.id.clone(),
            business_id: None,
            title: variant.title.clone(),
            price: variant.price,
            delivery_time_in_days: variant.delivery_time_in_days,
            revisions: variant.revisions,
            features: variant.features.clone(),
            offer_type: variant.offer_type,
            status: path.initial_status(),
        },
        CreationPath::Standard => OrderDraft {
            customer_id: actor.id.clone(),
            business_id: None,
            title: String::new(),
            price: Decimal::ZERO,
            delivery_time_in_days: 0,
            revisions: variant.revisions,
            features: Vec::new(),
            offer_type: variant.offer_type,
            status: path.initial_status(),
        },
    };
    hydrate_snapshot(&mut draft, offer, variant);

    Ok(Order {
        id: OrderId::generate(),
        customer_id: draft.customer_id,
        business_id: draft.business_id.unwrap_or_else(|| offer.owner.clone()),
        offer_id: offer.id.clone(),
        variant_id: Some(variant.id.clone()),
        title: draft.title,
        price: draft.price,
        delivery_time_in_days: draft.delivery_time_in_days,
        revisions: draft.revisions,
        features: draft.features,
        offer_type: draft.offer_type,
        status: draft.status,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::access::Actor;
    use crate::domain::account::AccountId;
    use crate::domain::offer::{Offer, OfferId, OfferType, OfferVariant, VariantId};
    use crate::domain::order::OrderStatus;
    use crate::errors::DomainError;

    use super::{create_order, hydrate_snapshot, CreationPath, OrderDraft};

    fn customer() -> Actor {
        Actor {
            id: AccountId("cust-1".to_string()),
            is_staff: false,
            has_business_profile: false,
            has_customer_profile: true,
        }
    }

    fn offer() -> Offer {
        Offer {
            id: OfferId("of-1".to_string()),
            owner: AccountId("biz-1".to_string()),
            title: "Web design package".to_string(),
            description: "Everything for a small shop".to_string(),
            image: None,
            base_price: None,
            base_delivery_time_in_days: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn variant() -> OfferVariant {
        OfferVariant {
            id: VariantId("v-1".to_string()),
            offer_id: OfferId("of-1".to_string()),
            title: "Standard tier".to_string(),
            price: Decimal::new(14900, 2),
            delivery_time_in_days: 5,
            revisions: 2,
            offer_type: OfferType::Standard,
            features: vec!["Responsive layout".to_string(), "Contact form".to_string()],
        }
    }

    #[test]
    fn direct_path_snapshots_the_variant_and_starts_in_progress() {
        let (offer, variant) = (offer(), variant());
        let order = create_order(&customer(), &offer, &variant, CreationPath::Direct, Utc::now())
            .expect("customer can buy now");

        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(order.title, "Standard tier");
        assert_eq!(order.price, Decimal::new(14900, 2));
        assert_eq!(order.delivery_time_in_days, 5);
        assert_eq!(order.revisions, 2);
        assert_eq!(order.features, variant.features);
        assert_eq!(order.offer_type, OfferType::Standard);
        assert_eq!(order.business_id, offer.owner);
        assert_eq!(order.variant_id.as_ref(), Some(&variant.id));
    }

    #[test]
    fn standard_path_starts_pending_and_hydrates_from_the_offer() {
        let order = create_order(&customer(), &offer(), &variant(), CreationPath::Standard, Utc::now())
            .expect("generic creation succeeds");

        assert_eq!(order.status, OrderStatus::Pending);
        // The generic path fills the title from the offer, not the tier.
        assert_eq!(order.title, "Web design package");
        assert_eq!(order.price, Decimal::new(14900, 2));
        assert_eq!(order.delivery_time_in_days, 5);
    }

    #[test]
    fn business_profile_holders_cannot_order() {
        let business = Actor { has_business_profile: true, has_customer_profile: false, ..customer() };

        let error = create_order(&business, &offer(), &variant(), CreationPath::Direct, Utc::now())
            .expect_err("business accounts must not order");
        assert!(matches!(error, DomainError::PermissionDenied(_)));
    }

    #[test]
    fn accounts_without_a_customer_profile_cannot_order() {
        let bare = Actor { has_customer_profile: false, ..customer() };

        let error = create_order(&bare, &offer(), &variant(), CreationPath::Direct, Utc::now())
            .expect_err("role-less accounts must not order");
        assert!(matches!(error, DomainError::PermissionDenied(_)));
    }

    #[test]
    fn variant_must_belong_to_the_offer() {
        let mut foreign = variant();
        foreign.offer_id = OfferId("of-2".to_string());

        let error = create_order(&customer(), &offer(), &foreign, CreationPath::Direct, Utc::now())
            .expect_err("cross-offer variant must fail");
        assert_eq!(error, DomainError::NotFound("offer detail"));
    }

    #[test]
    fn a_featureless_variant_yields_an_empty_feature_list() {
        let mut bare = variant();
        bare.features = Vec::new();

        let order = create_order(&customer(), &offer(), &bare, CreationPath::Direct, Utc::now())
            .expect("missing features never fail order creation");
        assert!(order.features.is_empty());
    }

    #[test]
    fn mutating_the_source_variant_later_does_not_touch_the_snapshot() {
        let (offer, mut variant) = (offer(), variant());
        let order = create_order(&customer(), &offer, &variant, CreationPath::Direct, Utc::now())
            .expect("create order");

        variant.price = Decimal::new(99900, 2);
        variant.features.push("Rush delivery".to_string());

        assert_eq!(order.price, Decimal::new(14900, 2));
        assert_eq!(order.features.len(), 2);
    }

    #[test]
    fn hydration_fills_only_the_missing_fields() {
        let (offer, variant) = (offer(), variant());
        let mut draft = OrderDraft {
            customer_id: AccountId("cust-1".to_string()),
            business_id: None,
            title: "Custom headline".to_string(),
            price: Decimal::ZERO,
            delivery_time_in_days: 0,
            revisions: 0,
            features: Vec::new(),
            offer_type: OfferType::Standard,
            status: OrderStatus::Pending,
        };

        hydrate_snapshot(&mut draft, &offer, &variant);

        assert_eq!(draft.title, "Custom headline", "present fields stay untouched");
        assert_eq!(draft.business_id, Some(offer.owner.clone()));
        assert_eq!(draft.price, variant.price);
        assert_eq!(draft.delivery_time_in_days, variant.delivery_time_in_days);
        assert_eq!(draft.features, variant.features);
    }
}
