pub mod affiliate;
pub mod visit;

pub use affiliate::Entity as AffiliateEntity;
pub use visit::Entity as VisitEntity;
