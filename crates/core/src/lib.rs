pub mod access;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pagination;
pub mod pricing;
pub mod ratings;
pub mod reconcile;
pub mod snapshot;

pub use access::{is_owner_or_admin, Actor};
pub use domain::account::{Account, AccountId, BusinessProfile, CustomerProfile, ProfileKind};
pub use domain::offer::{Offer, OfferId, OfferType, OfferVariant, VariantId};
pub use domain::order::{Order, OrderId, OrderStatus};
pub use domain::review::{Review, ReviewId};
pub use errors::DomainError;
pub use pagination::{Page, PageDefaults, PageParams};
pub use reconcile::{ReconcilePlan, VariantPayload, VariantSpec, VariantWrite};
pub use snapshot::{create_order, hydrate_snapshot, CreationPath, OrderDraft};
