//! Offer variant reconciliation.
//!
//! Planning is pure: callers hand in the existing variant rows and the
//! request payload, and get back either a validation error (nothing may be
//! persisted) or a plan of writes and deletes the storage layer executes
//! inside one transaction.
//!
//! Update semantics are replace-by-presence, not merge: a non-empty payload
//! that names only `basic` deletes the standard and premium tiers. Order
//! snapshots keep their copied fields, so deleting a tier out from under an
//! existing order is safe. An empty payload leaves the set untouched.

use rust_decimal::Decimal;

use crate::domain::offer::{OfferType, OfferVariant, VariantId};
use crate::errors::DomainError;

/// One variant entry as supplied by a client. On create every field is
/// required; on update, absent fields keep the stored value.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantPayload {
    pub offer_type: OfferType,
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub revisions: Option<i64>,
    pub delivery_time_in_days: Option<i64>,
    pub features: Option<Vec<String>>,
}

/// A fully resolved tier: what the row should look like after the write.
/// Ids are assigned by the storage layer on insert.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantSpec {
    pub offer_type: OfferType,
    pub title: String,
    pub price: Decimal,
    pub revisions: i64,
    pub delivery_time_in_days: i64,
    pub features: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VariantWrite {
    Update { id: VariantId, spec: VariantSpec },
    Insert(VariantSpec),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcilePlan {
    pub writes: Vec<VariantWrite>,
    pub deletes: Vec<VariantId>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }
}

/// Validate an offer-creation payload: exactly three entries, one per
/// tier, every field present and well-formed. Runs before any persistence.
pub fn validate_create(payloads: &[VariantPayload]) -> Result<Vec<VariantSpec>, DomainError> {
    if payloads.len() != 3 {
        return Err(DomainError::validation(
            "details",
            "An offer must provide exactly three details with offer_type basic, standard and premium.",
        ));
    }

    let mut seen: Vec<OfferType> = Vec::with_capacity(3);
    for payload in payloads {
        if seen.contains(&payload.offer_type) {
            return Err(DomainError::validation(
                "details",
                format!("Duplicate offer_type: {}.", payload.offer_type),
            ));
        }
        seen.push(payload.offer_type);
    }

    payloads
        .iter()
        .map(|payload| {
            let spec = resolve_required(payload)?;
            validate_spec(&spec)?;
            Ok(spec)
        })
        .collect()
}

/// Plan an update of the variant set keyed by `offer_type`.
///
/// Entries matching an existing tier overwrite the provided fields and
/// retain the row; unmatched entries insert a new tier (all fields
/// required); existing tiers absent from a non-empty payload are deleted.
pub fn plan_update(
    existing: &[OfferVariant],
    payloads: &[VariantPayload],
) -> Result<ReconcilePlan, DomainError> {
    if payloads.is_empty() {
        return Ok(ReconcilePlan::default());
    }

    // Last write per tier wins: collapse duplicate entries field-wise
    // before planning, so the set stays uniquely keyed by type.
    let mut merged: Vec<VariantPayload> = Vec::new();
    for payload in payloads {
        match merged.iter_mut().find(|entry| entry.offer_type == payload.offer_type) {
            Some(entry) => *entry = merge_payloads(entry, payload),
            None => merged.push(payload.clone()),
        }
    }

    let mut plan = ReconcilePlan::default();
    for payload in &merged {
        match existing.iter().find(|variant| variant.offer_type == payload.offer_type) {
            Some(variant) => {
                let spec = merge_into_existing(variant, payload);
                validate_spec(&spec)?;
                plan.writes.push(VariantWrite::Update { id: variant.id.clone(), spec });
            }
            None => {
                let spec = resolve_required(payload)?;
                validate_spec(&spec)?;
                plan.writes.push(VariantWrite::Insert(spec));
            }
        }
    }

    let retained: Vec<OfferType> = merged.iter().map(|payload| payload.offer_type).collect();
    plan.deletes = existing
        .iter()
        .filter(|variant| !retained.contains(&variant.offer_type))
        .map(|variant| variant.id.clone())
        .collect();

    Ok(plan)
}

fn merge_payloads(first: &VariantPayload, second: &VariantPayload) -> VariantPayload {
    VariantPayload {
        offer_type: second.offer_type,
        title: second.title.clone().or_else(|| first.title.clone()),
        price: second.price.or(first.price),
        revisions: second.revisions.or(first.revisions),
        delivery_time_in_days: second.delivery_time_in_days.or(first.delivery_time_in_days),
        features: second.features.clone().or_else(|| first.features.clone()),
    }
}

fn merge_into_existing(variant: &OfferVariant, payload: &VariantPayload) -> VariantSpec {
    VariantSpec {
        offer_type: payload.offer_type,
        title: payload.title.clone().unwrap_or_else(|| variant.title.clone()),
        price: payload.price.unwrap_or(variant.price),
        revisions: payload.revisions.unwrap_or(variant.revisions),
        delivery_time_in_days: payload
            .delivery_time_in_days
            .unwrap_or(variant.delivery_time_in_days),
        features: payload.features.clone().unwrap_or_else(|| variant.features.clone()),
    }
}

fn resolve_required(payload: &VariantPayload) -> Result<VariantSpec, DomainError> {
    let missing = |name: &str| {
        DomainError::validation("details", format!("Missing required field: {name}"))
    };

    Ok(VariantSpec {
        offer_type: payload.offer_type,
        title: payload.title.clone().ok_or_else(|| missing("title"))?,
        price: payload.price.ok_or_else(|| missing("price"))?,
        revisions: payload.revisions.ok_or_else(|| missing("revisions"))?,
        delivery_time_in_days: payload
            .delivery_time_in_days
            .ok_or_else(|| missing("delivery_time_in_days"))?,
        features: payload.features.clone().ok_or_else(|| missing("features"))?,
    })
}

fn validate_spec(spec: &VariantSpec) -> Result<(), DomainError> {
    if spec.features.is_empty() {
        return Err(DomainError::validation(
            "features",
            "Each detail must have at least one feature.",
        ));
    }
    if spec.delivery_time_in_days < 1 {
        return Err(DomainError::validation(
            "delivery_time_in_days",
            "delivery_time_in_days must be at least 1.",
        ));
    }
    if spec.price.is_sign_negative() {
        return Err(DomainError::validation("price", "price must be a non-negative decimal."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::offer::{OfferId, OfferType, OfferVariant, VariantId};

    use super::{plan_update, validate_create, VariantPayload, VariantWrite};

    fn payload(offer_type: OfferType) -> VariantPayload {
        VariantPayload {
            offer_type,
            title: Some(format!("{offer_type} tier")),
            price: Some(Decimal::new(10000, 2)),
            revisions: Some(2),
            delivery_time_in_days: Some(5),
            features: Some(vec!["One concept".to_string()]),
        }
    }

    fn existing(offer_type: OfferType) -> OfferVariant {
        OfferVariant {
            id: VariantId(format!("v-{offer_type}")),
            offer_id: OfferId("of-1".to_string()),
            title: format!("{offer_type} tier"),
            price: Decimal::new(5000, 2),
            delivery_time_in_days: 3,
            revisions: 1,
            offer_type,
            features: vec!["Original feature".to_string()],
        }
    }

    fn full_set() -> Vec<OfferVariant> {
        OfferType::ALL.into_iter().map(existing).collect()
    }

    #[test]
    fn create_accepts_exactly_one_entry_per_tier() {
        let specs = validate_create(&[
            payload(OfferType::Basic),
            payload(OfferType::Standard),
            payload(OfferType::Premium),
        ])
        .expect("three distinct tiers are valid");

        assert_eq!(specs.len(), 3);
    }

    #[test]
    fn create_rejects_wrong_counts_before_persistence() {
        for count in [0, 2, 4] {
            let payloads: Vec<_> =
                (0..count).map(|_| payload(OfferType::Basic)).collect();
            let error = validate_create(&payloads).expect_err("wrong count must fail");
            assert_eq!(error.field(), Some("details"));
        }
    }

    #[test]
    fn create_rejects_duplicate_tiers() {
        let error = validate_create(&[
            payload(OfferType::Basic),
            payload(OfferType::Basic),
            payload(OfferType::Premium),
        ])
        .expect_err("duplicate basic must fail");

        assert!(error.to_string().contains("Duplicate offer_type"));
    }

    #[test]
    fn create_requires_every_field() {
        let mut incomplete = payload(OfferType::Basic);
        incomplete.price = None;

        let error = validate_create(&[
            incomplete,
            payload(OfferType::Standard),
            payload(OfferType::Premium),
        ])
        .expect_err("missing price must fail");

        assert_eq!(error.to_string(), "details: Missing required field: price");
    }

    #[test]
    fn field_rules_reject_bad_values() {
        let mut empty_features = payload(OfferType::Basic);
        empty_features.features = Some(Vec::new());
        let error = validate_create(&[
            empty_features,
            payload(OfferType::Standard),
            payload(OfferType::Premium),
        ])
        .expect_err("empty features must fail");
        assert_eq!(error.field(), Some("features"));

        let mut same_day = payload(OfferType::Basic);
        same_day.delivery_time_in_days = Some(0);
        let error = validate_create(&[
            same_day,
            payload(OfferType::Standard),
            payload(OfferType::Premium),
        ])
        .expect_err("zero delivery days must fail");
        assert_eq!(error.field(), Some("delivery_time_in_days"));

        let mut negative = payload(OfferType::Basic);
        negative.price = Some(Decimal::new(-100, 2));
        let error = validate_create(&[
            negative,
            payload(OfferType::Standard),
            payload(OfferType::Premium),
        ])
        .expect_err("negative price must fail");
        assert_eq!(error.field(), Some("price"));
    }

    #[test]
    fn update_with_a_single_tier_deletes_the_others() {
        let plan = plan_update(&full_set(), &[payload(OfferType::Basic)])
            .expect("single-tier payload is valid");

        assert_eq!(plan.writes.len(), 1);
        assert!(matches!(&plan.writes[0], VariantWrite::Update { id, .. } if id.0 == "v-basic"));

        let mut deleted: Vec<&str> = plan.deletes.iter().map(|id| id.0.as_str()).collect();
        deleted.sort_unstable();
        assert_eq!(deleted, ["v-premium", "v-standard"]);
    }

    #[test]
    fn an_empty_payload_leaves_the_set_untouched() {
        let plan = plan_update(&full_set(), &[]).expect("empty payload is a no-op");
        assert!(plan.is_empty());
    }

    #[test]
    fn update_keeps_stored_values_for_absent_fields() {
        let partial = VariantPayload {
            offer_type: OfferType::Basic,
            title: None,
            price: Some(Decimal::new(7500, 2)),
            revisions: None,
            delivery_time_in_days: None,
            features: None,
        };

        let plan = plan_update(&full_set(), &[partial]).expect("partial update is valid");
        let VariantWrite::Update { spec, .. } = &plan.writes[0] else {
            panic!("expected an update write");
        };

        assert_eq!(spec.price, Decimal::new(7500, 2));
        assert_eq!(spec.title, "basic tier");
        assert_eq!(spec.revisions, 1);
        assert_eq!(spec.features, vec!["Original feature".to_string()]);
    }

    #[test]
    fn update_inserts_a_tier_that_does_not_exist_yet() {
        let plan = plan_update(&[existing(OfferType::Basic)], &[
            payload(OfferType::Basic),
            payload(OfferType::Premium),
        ])
        .expect("insert alongside update is valid");

        assert_eq!(plan.writes.len(), 2);
        assert!(plan.deletes.is_empty());
        assert!(plan
            .writes
            .iter()
            .any(|write| matches!(write, VariantWrite::Insert(spec) if spec.offer_type == OfferType::Premium)));
    }

    #[test]
    fn inserting_during_update_still_requires_every_field() {
        let incomplete = VariantPayload {
            offer_type: OfferType::Premium,
            title: Some("Premium".to_string()),
            price: None,
            revisions: Some(3),
            delivery_time_in_days: Some(7),
            features: Some(vec!["Everything".to_string()]),
        };

        let error = plan_update(&[existing(OfferType::Basic)], &[incomplete])
            .expect_err("insert without a price must fail");
        assert_eq!(error.to_string(), "details: Missing required field: price");
    }

    #[test]
    fn duplicate_payload_tiers_collapse_with_last_write_winning() {
        let mut first = payload(OfferType::Basic);
        first.price = Some(Decimal::new(1000, 2));
        let mut second = payload(OfferType::Basic);
        second.price = Some(Decimal::new(2000, 2));
        second.title = None;

        let plan = plan_update(&full_set(), &[first, second]).expect("duplicates collapse");

        assert_eq!(plan.writes.len(), 1);
        let VariantWrite::Update { spec, .. } = &plan.writes[0] else {
            panic!("expected an update write");
        };
        assert_eq!(spec.price, Decimal::new(2000, 2));
        assert_eq!(spec.title, "basic tier", "title falls back to the first entry");
    }
}
