// src/rpc/resilient_client.rs

use super::ledger::{AccountFilter, LedgerSource, TokenBalance};
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use crate::error::{FetchError, RemoteError};
use crate::monitoring::metrics::{RPC_REQUEST_LATENCY, RPC_REQUESTS_TOTAL, RPC_RETRIES_TOTAL};
use futures::stream::{self, StreamExt};
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Octets bruts d'un compte, lus une fois par passe puis jetés après décodage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
    pub address: Pubkey,
    pub data: Vec<u8>,
}

impl RawAccount {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Réglages d'un fetcher. `max_concurrency = 1` donne le mode séquentiel cadencé,
/// `K > 1` le mode parallèle borné : même code, seule la config change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetcherConfig {
    pub max_concurrency: usize,
    pub requests_per_second: u32,
    pub pacing: Duration,
    pub retry: RetryPolicy,
}

impl FetcherConfig {
    /// Pour les endpoints très peu tolérants (profil Raydium).
    pub fn sequential_paced() -> Self {
        Self {
            max_concurrency: 1,
            requests_per_second: 3,
            pacing: Duration::from_millis(200),
            retry: RetryPolicy::new(8, Duration::from_secs(2), Duration::from_secs(60)),
        }
    }

    /// K appels en vol, budget partagé (profil Orca).
    pub fn parallel() -> Self {
        Self {
            max_concurrency: 10,
            requests_per_second: 20,
            pacing: Duration::ZERO,
            retry: RetryPolicy::new(6, Duration::from_secs(1), Duration::from_secs(30)),
        }
    }
}

/// Le seul point d'accès au service distant : budget de débit, plafond de
/// concurrence et ré-essais y sont appliqués à chaque appel.
pub struct RateLimitedFetcher {
    source: Arc<dyn LedgerSource>,
    limiter: RateLimiter,
    permits: Semaphore,
    concurrency: usize,
    policy: RetryPolicy,
}

impl RateLimitedFetcher {
    pub fn new(source: Arc<dyn LedgerSource>, config: FetcherConfig) -> Self {
        let concurrency = config.max_concurrency.max(1);
        Self {
            source,
            limiter: RateLimiter::per_second(config.requests_per_second, config.pacing),
            permits: Semaphore::new(concurrency),
            concurrency,
            policy: config.retry,
        }
    }

    /// Lecture d'un compte. Un compte absent n'est pas ré-essayé.
    pub async fn fetch_one(&self, address: &Pubkey) -> Result<RawAccount, FetchError> {
        let data = self
            .with_retry("get_account", true, || self.source.get_account_data(address))
            .await?;
        match data {
            Some(data) => Ok(RawAccount { address: *address, data }),
            None => Err(FetchError::NotFound),
        }
    }

    /// Lecture d'un lot d'adresses (dédoublonnées), au plus `max_concurrency` en vol.
    /// Chaque adresse a son propre résultat : un échec n'affecte pas les autres.
    pub async fn fetch_many(&self, addresses: &[Pubkey]) -> HashMap<Pubkey, Result<RawAccount, FetchError>> {
        let mut seen = HashSet::with_capacity(addresses.len());
        let unique: Vec<Pubkey> = addresses.iter().copied().filter(|a| seen.insert(*a)).collect();

        stream::iter(unique)
            .map(|address| async move { (address, self.fetch_one(&address).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    /// Scan filtré. Un seul aller-retour : soumis au budget et aux ré-essais,
    /// mais pas au plafond de concurrence par élément.
    pub async fn program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<RawAccount>, FetchError> {
        let accounts = self
            .with_retry("get_program_accounts", false, || {
                self.source.get_program_accounts(program_id, filters)
            })
            .await?;
        Ok(accounts.into_iter().map(|(address, data)| RawAccount { address, data }).collect())
    }

    pub async fn token_balance(&self, address: &Pubkey) -> Result<TokenBalance, FetchError> {
        self.with_retry("get_token_account_balance", true, || {
            self.source.get_token_account_balance(address)
        })
        .await
    }

    async fn with_retry<T, F, Fut>(&self, method: &'static str, per_item: bool, mut call: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let outcome = {
                // Le permis n'est tenu que pendant l'appel, jamais pendant un backoff.
                let _permit = if per_item { self.permits.acquire().await.ok() } else { None };
                self.limiter.acquire().await;
                let timer = RPC_REQUEST_LATENCY.with_label_values(&[method]).start_timer();
                let outcome = call().await;
                timer.observe_duration();
                outcome
            };

            match outcome {
                Ok(value) => {
                    RPC_REQUESTS_TOTAL.with_label_values(&[method, "success"]).inc();
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    RPC_REQUESTS_TOTAL.with_label_values(&[method, "failure"]).inc();
                    debug!(method, error = %e, "Erreur non ré-essayable");
                    return Err(FetchError::Rejected(e));
                }
                Err(e) if attempt >= self.policy.max_attempts => {
                    RPC_REQUESTS_TOTAL.with_label_values(&[method, "failure"]).inc();
                    return Err(FetchError::Exhausted { attempts: attempt, last: e });
                }
                Err(e) => {
                    RPC_REQUESTS_TOTAL.with_label_values(&[method, "retry"]).inc();
                    RPC_RETRIES_TOTAL.with_label_values(&[method]).inc();
                    let delay = self.policy.delay_for(attempt);
                    warn!(method, attempt, delay_ms = delay.as_millis() as u64, error = %e, "Erreur temporaire, nouvelle tentative");
                    sleep(delay).await;
                }
            }
        }
    }
}
