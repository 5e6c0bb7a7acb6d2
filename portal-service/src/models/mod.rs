pub mod session;
pub mod tenant;

pub use session::{MessageRole, Session, SessionMessage};
pub use tenant::{Tenant, TenantClass};
