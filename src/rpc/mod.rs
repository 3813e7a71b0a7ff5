// Accès au nœud RPC : source brute, limiteur de débit, politique de ré-essai.
pub mod ledger;
pub mod rate_limiter;
pub mod resilient_client;
pub mod retry;

pub use ledger::{AccountFilter, LedgerSource, SolanaLedger, TokenBalance};
pub use resilient_client::{FetcherConfig, RateLimitedFetcher, RawAccount};
pub use retry::RetryPolicy;
