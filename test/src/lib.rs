pub mod helpers;

pub use helpers::*;
pub use local_stream::{LocalStream, LocalStreamPair};
