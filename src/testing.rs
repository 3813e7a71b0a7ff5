// src/testing.rs

// Doublures de test : un ledger en mémoire, un sink en mémoire, et des
// encodeurs de comptes binaires pour chaque layout décodé par la crate.

use crate::data_pipeline::sink::OutputSink;
use crate::error::RemoteError;
use crate::rpc::{AccountFilter, LedgerSource, TokenBalance};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Propriétaire des comptes ajoutés par `add_account`.
pub const DEFAULT_OWNER: Pubkey = Pubkey::new_from_array([7; 32]);

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Pubkey, (Pubkey, Vec<u8>)>,
    permanent_failures: HashMap<Pubkey, String>,
    transient_failures: HashMap<Pubkey, u32>,
    transient_scan_failures: u32,
    scan_failures: Vec<(AccountFilter, String)>,
    token_balances: HashMap<Pubkey, TokenBalance>,
    account_calls: HashMap<Pubkey, usize>,
    scan_calls: usize,
}

impl LedgerState {
    fn scripted_failure(&mut self, address: &Pubkey) -> Option<RemoteError> {
        if let Some(message) = self.permanent_failures.get(address) {
            return Some(RemoteError::permanent(message.clone()));
        }
        match self.transient_failures.get_mut(address) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Some(RemoteError::retryable("HTTP status client error (429 Too Many Requests)"))
            }
            _ => None,
        }
    }
}

/// Ledger en mémoire : les scans sont évalués localement avec la même
/// sémantique de filtres que le nœud.
pub struct MockLedger {
    state: Mutex<LedgerState>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockLedger {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    pub fn add_account(&self, address: Pubkey, data: Vec<u8>) -> Pubkey {
        self.add_owned_account(DEFAULT_OWNER, address, data)
    }

    pub fn add_owned_account(&self, owner: Pubkey, address: Pubkey, data: Vec<u8>) -> Pubkey {
        self.state().accounts.insert(address, (owner, data));
        address
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.state().accounts.remove(address);
    }

    pub fn fail_permanently(&self, address: Pubkey, message: &str) {
        self.state().permanent_failures.insert(address, message.to_string());
    }

    pub fn fail_transiently(&self, address: Pubkey, times: u32) {
        self.state().transient_failures.insert(address, times);
    }

    pub fn fail_scans_transiently(&self, times: u32) {
        self.state().transient_scan_failures = times;
    }

    /// Tout scan qui porte ce filtre est rejeté.
    pub fn fail_scans_with(&self, filter: AccountFilter, message: &str) {
        self.state().scan_failures.push((filter, message.to_string()));
    }

    pub fn set_token_balance(&self, address: Pubkey, balance: TokenBalance) {
        self.state().token_balances.insert(address, balance);
    }

    pub fn remove_token_balance(&self, address: &Pubkey) {
        self.state().token_balances.remove(address);
    }

    pub fn account_calls(&self, address: &Pubkey) -> usize {
        self.state().account_calls.get(address).copied().unwrap_or(0)
    }

    pub fn scan_calls(&self) -> usize {
        self.state().scan_calls
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        guard
    }
}

#[async_trait]
impl LedgerSource for MockLedger {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RemoteError> {
        let _guard = self.enter().await;
        let mut state = self.state();
        *state.account_calls.entry(*address).or_default() += 1;
        if let Some(error) = state.scripted_failure(address) {
            return Err(error);
        }
        Ok(state.accounts.get(address).map(|(_, data)| data.clone()))
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, RemoteError> {
        let _guard = self.enter().await;
        let mut state = self.state();
        state.scan_calls += 1;
        if state.transient_scan_failures > 0 {
            state.transient_scan_failures -= 1;
            return Err(RemoteError::retryable("RPC response error -32005: node is behind"));
        }
        if let Some((_, message)) = state.scan_failures.iter().find(|(failing, _)| filters.contains(failing)) {
            return Err(RemoteError::permanent(message.clone()));
        }

        let mut matching: Vec<(Pubkey, Vec<u8>)> = state
            .accounts
            .iter()
            .filter(|(_, (owner, data))| owner == program_id && filters.iter().all(|f| f.matches(data)))
            .map(|(address, (_, data))| (*address, data.clone()))
            .collect();
        matching.sort_by_key(|(address, _)| *address);
        Ok(matching)
    }

    async fn get_token_account_balance(&self, address: &Pubkey) -> Result<TokenBalance, RemoteError> {
        let _guard = self.enter().await;
        let mut state = self.state();
        if let Some(error) = state.scripted_failure(address) {
            return Err(error);
        }
        state
            .token_balances
            .get(address)
            .cloned()
            .ok_or_else(|| RemoteError::permanent(format!("Invalid param: could not find account {address}")))
    }
}

/// Sink en mémoire ; certaines clés peuvent être configurées pour échouer.
#[derive(Default)]
pub struct MemorySink {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    failing: Mutex<Vec<String>>,
    puts: AtomicUsize,
}

impl MemorySink {
    pub fn fail_keys_containing(&self, fragment: &str) {
        self.failing.lock().unwrap().push(fragment.to_string());
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().map(|(_, key)| key.clone()).collect()
    }

    pub fn json(&self, bucket: &str, key: &str) -> Option<serde_json::Value> {
        let objects = self.objects.lock().unwrap();
        let body = objects.get(&(bucket.to_string(), key.to_string()))?;
        serde_json::from_slice(body).ok()
    }

    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> anyhow::Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().iter().any(|fragment| key.contains(fragment.as_str())) {
            anyhow::bail!("503 Slow Down: {key}");
        }
        self.objects.lock().unwrap().insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}

/// Couche `tracing` qui garde chaque événement émis sur le thread du test.
#[derive(Clone, Default)]
pub struct CapturedEvents(Arc<Mutex<Vec<CapturedEvent>>>);

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvents {
    /// Active la capture sur le thread courant tant que le guard vit.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
        self.0.lock().unwrap().iter().filter(|event| event.message == message).cloned().collect()
    }
}

struct FieldRecorder<'a>(&'a mut CapturedEvent);

impl Visit for FieldRecorder<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.0.message = rendered;
        } else {
            self.0.fields.insert(field.name().to_string(), rendered);
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut captured =
            CapturedEvent { level: *event.metadata().level(), message: String::new(), fields: BTreeMap::new() };
        event.record(&mut FieldRecorder(&mut captured));
        self.0.lock().unwrap().push(captured);
    }
}

pub mod fixtures {
    use crate::decoders::orca::whirlpool;
    use crate::decoders::raydium::clmm;
    use bytemuck::Zeroable;
    use solana_sdk::pubkey::Pubkey;

    pub fn with_discriminator(discriminator: [u8; 8], body: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(8 + body.len());
        data.extend_from_slice(&discriminator);
        data.extend_from_slice(body);
        data
    }

    /// Corps dont l'octet `i` vaut `i % 251 + 1` : aucun octet nul, et deux
    /// champs voisins ne peuvent pas se confondre.
    pub fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 + 1).collect()
    }

    /// Lecture little-endian à un offset écrit en dur, sans passer par les layouts.
    pub struct At<'a>(pub &'a [u8]);

    impl At<'_> {
        fn take<const N: usize>(&self, at: usize) -> [u8; N] {
            self.0[at..at + N].try_into().unwrap()
        }

        pub fn u8(&self, at: usize) -> u8 {
            self.0[at]
        }

        pub fn bytes<const N: usize>(&self, at: usize) -> [u8; N] {
            self.take(at)
        }

        pub fn key(&self, at: usize) -> Pubkey {
            Pubkey::new_from_array(self.take(at))
        }

        pub fn u16(&self, at: usize) -> u16 {
            u16::from_le_bytes(self.take(at))
        }

        pub fn i32(&self, at: usize) -> i32 {
            i32::from_le_bytes(self.take(at))
        }

        pub fn u64(&self, at: usize) -> u64 {
            u64::from_le_bytes(self.take(at))
        }

        pub fn u128(&self, at: usize) -> u128 {
            u128::from_le_bytes(self.take(at))
        }

        pub fn i128(&self, at: usize) -> i128 {
            i128::from_le_bytes(self.take(at))
        }

        pub fn u64s(&self, at: usize, count: usize) -> Vec<u64> {
            (0..count).map(|i| self.u64(at + 8 * i)).collect()
        }

        pub fn u128s(&self, at: usize, count: usize) -> Vec<u128> {
            (0..count).map(|i| self.u128(at + 16 * i)).collect()
        }
    }

    // --- Raydium CLMM ---

    pub fn raydium_pool_layout(mint_0: Pubkey, mint_1: Pubkey, tick_spacing: u16) -> clmm::pool::PoolState {
        let mut raw = clmm::pool::PoolState::zeroed();
        raw.amm_config = Pubkey::new_unique();
        raw.token_mint_0 = mint_0;
        raw.token_mint_1 = mint_1;
        raw.token_vault_0 = Pubkey::new_unique();
        raw.token_vault_1 = Pubkey::new_unique();
        raw.mint_decimals_0 = 9;
        raw.mint_decimals_1 = 6;
        raw.tick_spacing = tick_spacing;
        raw
    }

    pub fn raydium_pool_account(mint_0: Pubkey, mint_1: Pubkey, tick_spacing: u16) -> Vec<u8> {
        let raw = raydium_pool_layout(mint_0, mint_1, tick_spacing);
        with_discriminator(clmm::pool::DISCRIMINATOR, bytemuck::bytes_of(&raw))
    }

    pub fn raydium_tick_array_layout(pool_id: Pubkey, start_tick_index: i32) -> clmm::tick_array::TickArrayState {
        let mut raw = clmm::tick_array::TickArrayState::zeroed();
        raw.pool_id = pool_id;
        raw.start_tick_index = start_tick_index;
        raw
    }

    pub fn raydium_tick_array_account(pool_id: Pubkey, start_tick_index: i32) -> Vec<u8> {
        let raw = raydium_tick_array_layout(pool_id, start_tick_index);
        with_discriminator(clmm::tick_array::DISCRIMINATOR, bytemuck::bytes_of(&raw))
    }

    pub fn raydium_bitmap_extension_account(
        pool_id: Pubkey,
        positive: [[u64; 8]; clmm::tickarray_bitmap_extension::EXTENSION_BITMAP_COUNT],
        negative: [[u64; 8]; clmm::tickarray_bitmap_extension::EXTENSION_BITMAP_COUNT],
    ) -> Vec<u8> {
        let mut raw = clmm::tickarray_bitmap_extension::TickArrayBitmapExtensionData::zeroed();
        raw.pool_id = pool_id;
        raw.positive_tick_array_bitmap = positive;
        raw.negative_tick_array_bitmap = negative;
        with_discriminator(clmm::tickarray_bitmap_extension::DISCRIMINATOR, bytemuck::bytes_of(&raw))
    }

    pub fn raydium_personal_position_account(pool_id: Pubkey) -> Vec<u8> {
        let mut raw = clmm::position::PersonalPositionState::zeroed();
        raw.nft_mint = Pubkey::new_unique();
        raw.pool_id = pool_id;
        raw.tick_lower_index = -600;
        raw.tick_upper_index = 600;
        raw.liquidity = 1_000_000;
        with_discriminator(clmm::position::PERSONAL_DISCRIMINATOR, bytemuck::bytes_of(&raw))
    }

    pub fn raydium_protocol_position_account(pool_id: Pubkey) -> Vec<u8> {
        let mut raw = clmm::position::ProtocolPositionState::zeroed();
        raw.pool_id = pool_id;
        raw.tick_lower_index = -600;
        raw.tick_upper_index = 600;
        raw.liquidity = 1_000_000;
        with_discriminator(clmm::position::PROTOCOL_DISCRIMINATOR, bytemuck::bytes_of(&raw))
    }

    // --- Orca Whirlpool ---

    pub fn whirlpool_layout(mint_a: Pubkey, mint_b: Pubkey, tick_spacing: u16) -> whirlpool::pool::WhirlpoolData {
        let mut raw = whirlpool::pool::WhirlpoolData::zeroed();
        raw.whirlpools_config = Pubkey::new_unique();
        raw.tick_spacing = tick_spacing;
        raw.tick_spacing_seed = tick_spacing.to_le_bytes();
        raw.token_mint_a = mint_a;
        raw.token_vault_a = Pubkey::new_unique();
        raw.token_mint_b = mint_b;
        raw.token_vault_b = Pubkey::new_unique();
        raw
    }

    pub fn whirlpool_account(mint_a: Pubkey, mint_b: Pubkey, tick_spacing: u16) -> Vec<u8> {
        let raw = whirlpool_layout(mint_a, mint_b, tick_spacing);
        with_discriminator(whirlpool::pool::DISCRIMINATOR, bytemuck::bytes_of(&raw))
    }

    pub fn whirlpool_tick_array_layout(pool: Pubkey, start_tick_index: i32) -> whirlpool::tick_array::TickArrayData {
        let mut raw = whirlpool::tick_array::TickArrayData::zeroed();
        raw.start_tick_index = start_tick_index;
        raw.whirlpool = pool;
        raw
    }

    pub fn whirlpool_tick_array_account(pool: Pubkey, start_tick_index: i32) -> Vec<u8> {
        let raw = whirlpool_tick_array_layout(pool, start_tick_index);
        with_discriminator(whirlpool::tick_array::DISCRIMINATOR, bytemuck::bytes_of(&raw))
    }

    pub fn whirlpool_position_account(pool: Pubkey) -> Vec<u8> {
        let mut raw = whirlpool::position::PositionData::zeroed();
        raw.whirlpool = pool;
        raw.position_mint = Pubkey::new_unique();
        raw.liquidity = 42;
        raw.tick_lower_index = -128;
        raw.tick_upper_index = 128;
        with_discriminator(whirlpool::position::DISCRIMINATOR, bytemuck::bytes_of(&raw))
    }

    // --- SPL Token ---

    /// Compte de jeton classique de 165 octets, initialisé, sans délégué.
    pub fn token_account(mint: Pubkey, owner: Pubkey, amount: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(165);
        data.extend_from_slice(mint.as_ref());
        data.extend_from_slice(owner.as_ref());
        data.extend_from_slice(&amount.to_le_bytes());
        data.extend_from_slice(&[0u8; 4 + 32]); // delegate: None
        data.push(1); // state: Initialized
        data.extend_from_slice(&[0u8; 4 + 8]); // is_native: None
        data.extend_from_slice(&0u64.to_le_bytes()); // delegated_amount
        data.extend_from_slice(&[0u8; 4 + 32]); // close_authority: None
        debug_assert_eq!(data.len(), 165);
        data
    }
}
