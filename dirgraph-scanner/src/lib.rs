pub mod analyze;
pub mod baseline;
pub mod client;
pub mod enumerate;
pub mod error;
pub mod probe;
pub mod result;

pub use baseline::BaselineSignature;
pub use enumerate::{EnumerationOutcome, Enumerator};
pub use error::ScanError;
pub use probe::TargetProfile;
pub use result::{Finding, ProbeResult};
