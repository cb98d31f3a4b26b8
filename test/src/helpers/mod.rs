pub mod fixtures;
pub mod test_federate;
pub mod test_federation;

pub use fixtures::*;
pub use recording_sink::RecordingSink;
pub use test_federate::TestFederate;
pub use test_federation::TestFederation;
