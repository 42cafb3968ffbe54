pub mod entropy;
pub mod fair;

pub use entropy::{EntropySource, FallbackChain, OsEntropy, RemoteEntropy, SeededEntropy};
pub use fair::FairRandomSource;
