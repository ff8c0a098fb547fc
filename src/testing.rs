//! Test doubles for the ledger, key, quote and limit collaborators

use crate::chain::{ChainClient, KeyPair, KeyPairProvider};
use crate::error::{EngineError, EngineResult};
use crate::money::{CryptoCurrency, MoneyValue};
use crate::quotes::{CurrencyPair, OrderDirection, PricedQuote, QuotesFeed};
use crate::swap::{KycTier, TradeLimits, TradeLimitsProvider};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use ethers::types::{Address, Bytes, H256, U256};
use sha3::{Digest, Keccak256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

pub const OTHER_PRIVATE_KEY: &str =
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const OTHER_ADDRESS: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub const SAMPLE_DEPOSIT_ADDRESS: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
pub const ORDER_DEPOSIT_ADDRESS: &str = "0x90F79bf6EB2c4f870365E785982E1f101E93b906";

pub fn test_key_pair() -> KeyPair {
    KeyPair::from_private_key(TEST_PRIVATE_KEY).unwrap()
}

pub fn other_key_pair() -> KeyPair {
    KeyPair::from_private_key(OTHER_PRIVATE_KEY).unwrap()
}

pub fn test_address() -> Address {
    TEST_ADDRESS.parse().unwrap()
}

pub fn eth(minor: u128) -> MoneyValue {
    MoneyValue::from_minor(minor, CryptoCurrency::Ethereum)
}

pub fn btc(minor: u128) -> MoneyValue {
    MoneyValue::from_minor(minor, CryptoCurrency::Bitcoin)
}

/// In-memory ledger. Reports the keccak of each pushed payload unless told
/// otherwise.
pub struct FakeChainClient {
    balance: Mutex<U256>,
    gas_price: Mutex<Option<U256>>,
    nonce: Mutex<u64>,
    push_error: Mutex<Option<String>>,
    misreport_hash: Mutex<bool>,
    pushes: Mutex<Vec<Bytes>>,
}

impl FakeChainClient {
    pub fn new(balance: u64, gas_price: u64) -> Self {
        Self {
            balance: Mutex::new(U256::from(balance)),
            gas_price: Mutex::new(Some(U256::from(gas_price))),
            nonce: Mutex::new(0),
            push_error: Mutex::new(None),
            misreport_hash: Mutex::new(false),
            pushes: Mutex::new(Vec::new()),
        }
    }

    pub fn set_nonce(&self, nonce: u64) {
        *self.nonce.lock().unwrap() = nonce;
    }

    /// Make `gas_price` fail
    pub fn drop_gas_price(&self) {
        *self.gas_price.lock().unwrap() = None;
    }

    pub fn fail_pushes(&self, message: &str) {
        *self.push_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn misreport_hash(&self) {
        *self.misreport_hash.lock().unwrap() = true;
    }

    pub fn pushes(&self) -> Vec<Bytes> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    fn chain_id(&self) -> u64 {
        1
    }

    fn endpoint(&self) -> String {
        "fake://chain".to_string()
    }

    async fn nonce(&self, _account: Address) -> EngineResult<u64> {
        Ok(*self.nonce.lock().unwrap())
    }

    async fn balance(&self, _account: Address) -> EngineResult<U256> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn gas_price(&self) -> EngineResult<U256> {
        self.gas_price
            .lock()
            .unwrap()
            .ok_or_else(|| EngineError::network("fake://chain", "gas oracle down"))
    }

    async fn push(&self, raw: Bytes) -> EngineResult<H256> {
        if let Some(message) = self.push_error.lock().unwrap().clone() {
            return Err(EngineError::network("fake://chain", message));
        }
        self.pushes.lock().unwrap().push(raw.clone());
        if *self.misreport_hash.lock().unwrap() {
            return Ok(H256::repeat_byte(0xee));
        }
        Ok(H256::from_slice(&Keccak256::digest(raw.as_ref())))
    }
}

/// Hands out one key pair, optionally behind a plain-text second password
pub struct StaticKeys {
    key_pair: KeyPair,
    second_password: Option<String>,
}

impl StaticKeys {
    pub fn new(key_pair: KeyPair) -> Self {
        Self {
            key_pair,
            second_password: None,
        }
    }

    pub fn with_second_password(mut self, password: &str) -> Self {
        self.second_password = Some(password.to_string());
        self
    }
}

#[async_trait]
impl KeyPairProvider for StaticKeys {
    async fn key_pair(&self, second_password: Option<&str>) -> EngineResult<KeyPair> {
        match &self.second_password {
            Some(expected) if second_password != Some(expected.as_str()) => {
                Err(EngineError::Credential("incorrect second password".to_string()))
            }
            _ => Ok(self.key_pair.clone()),
        }
    }
}

/// Quotes at a fixed 0.05 BTC per ETH with a 1000 sat network fee. Each
/// fetch gets a new identifier.
pub struct FakeQuotesFeed {
    unreachable: bool,
    ttl: Duration,
    fetches: AtomicUsize,
    last_amount: Mutex<Option<MoneyValue>>,
}

impl FakeQuotesFeed {
    pub fn new() -> Self {
        Self {
            unreachable: false,
            ttl: Duration::minutes(10),
            fetches: AtomicUsize::new(0),
            last_amount: Mutex::new(None),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new()
        }
    }

    /// Quotes expire `ttl` after they are fetched; negative means already
    /// expired
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn last_amount(&self) -> Option<MoneyValue> {
        *self.last_amount.lock().unwrap()
    }
}

#[async_trait]
impl QuotesFeed for FakeQuotesFeed {
    async fn fetch_quote(
        &self,
        direction: OrderDirection,
        pair: CurrencyPair,
        amount: Option<MoneyValue>,
    ) -> EngineResult<PricedQuote> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_amount.lock().unwrap() = amount;

        if self.unreachable {
            return Err(EngineError::network("fake://quotes", "connection refused"));
        }

        Ok(PricedQuote {
            identifier: format!("quote-{}", n),
            direction,
            pair,
            rate: MoneyValue::from_minor(5_000_000, pair.destination),
            network_fee: MoneyValue::from_minor(1_000, pair.destination),
            sample_deposit_address: SAMPLE_DEPOSIT_ADDRESS.to_string(),
            expires_at: Utc::now() + self.ttl,
        })
    }
}

pub struct FakeLimits {
    limits: Option<TradeLimits>,
}

impl FakeLimits {
    pub fn new(minimum: MoneyValue, maximum: MoneyValue) -> Self {
        Self {
            limits: Some(TradeLimits {
                minimum,
                maximum,
                maximum_personal: None,
                tier: KycTier::Tier2,
            }),
        }
    }

    pub fn with_personal(mut self, ceiling: MoneyValue) -> Self {
        if let Some(limits) = &mut self.limits {
            limits.maximum_personal = Some(ceiling);
            limits.tier = KycTier::Tier1;
        }
        self
    }

    pub fn unreachable() -> Self {
        Self { limits: None }
    }
}

#[async_trait]
impl TradeLimitsProvider for FakeLimits {
    async fn trade_limits(
        &self,
        _direction: OrderDirection,
        _pair: CurrencyPair,
    ) -> EngineResult<TradeLimits> {
        self.limits
            .clone()
            .ok_or_else(|| EngineError::network("fake://limits", "connection refused"))
    }
}
