// Cache manager: fingerprints a profile's raw files and persists the
// normalized datasets, invalidating on fingerprint mismatch
pub mod fingerprint;
pub mod store;

pub use fingerprint::{fingerprint_dir, fingerprint_files};
pub use store::{CacheStore, DatasetKind};
