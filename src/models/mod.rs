pub mod activity;
pub mod claims;
pub mod section;
pub mod session;

pub use activity::{ActivityLog, NewActivity};
pub use claims::{peek_claims, AccessClaims};
pub use section::{Section, Student};
pub use session::Session;
