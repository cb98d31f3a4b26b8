mod federate;
pub use federate::Federate;

mod federation;
pub use federation::{Federation, FederationInfo};
