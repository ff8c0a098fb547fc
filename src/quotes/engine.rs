//! Streams live quotes per (direction, pair)

use super::{CurrencyPair, OrderDirection, PricedQuote, QuotesFeed};
use crate::error::{EngineError, EngineResult};
use crate::money::MoneyValue;

use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Quotes as they arrive. A failed fetch is emitted as an error and polling
/// carries on.
pub type QuoteStream = BoxStream<'static, EngineResult<PricedQuote>>;

type QuoteKey = (OrderDirection, CurrencyPair);

/// Shared quote service. Each subscription gets its own poller, which stops
/// as soon as the consumer drops the stream.
pub struct QuotesEngine {
    feed: Arc<dyn QuotesFeed>,
    refresh_interval: Duration,
    /// Latest trade size per key
    amount_hints: DashMap<QuoteKey, watch::Sender<Option<MoneyValue>>>,
}

impl QuotesEngine {
    pub fn new(feed: Arc<dyn QuotesFeed>, refresh_interval: Duration) -> Self {
        Self {
            feed,
            refresh_interval,
            amount_hints: DashMap::new(),
        }
    }

    fn subscribe_hints(&self, key: QuoteKey) -> watch::Receiver<Option<MoneyValue>> {
        self.amount_hints
            .entry(key)
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    /// Continuously updating quotes. The first one is fetched right away, then
    /// one per refresh interval or whenever the amount hint changes.
    pub fn get_rate(&self, direction: OrderDirection, pair: CurrencyPair) -> QuoteStream {
        let (tx, rx) = mpsc::channel(1);
        let feed = self.feed.clone();
        let refresh_interval = self.refresh_interval;
        let mut hints = self.subscribe_hints((direction, pair));

        tokio::spawn(async move {
            let mut ticker = interval(refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut hints_open = true;

            loop {
                tokio::select! {
                    // A gone consumer wins over a pending tick or hint
                    biased;
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {}
                    changed = hints.changed(), if hints_open => {
                        hints_open = changed.is_ok();
                    }
                }

                let amount = *hints.borrow_and_update();
                let quote = feed.fetch_quote(direction, pair, amount).await;
                if let Err(e) = &quote {
                    warn!("Quote fetch for {} failed: {}", pair, e);
                }

                if tx.send(quote).await.is_err() {
                    break;
                }
            }

            debug!("Quote stream for {} closed", pair);
        });

        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|quote| (quote, rx))
        })
        .boxed()
    }

    /// One-shot quote: the first element of a fresh stream
    pub async fn first_quote(
        &self,
        direction: OrderDirection,
        pair: CurrencyPair,
    ) -> EngineResult<PricedQuote> {
        let mut first = self.get_rate(direction, pair).take(1);
        match first.next().await {
            Some(quote) => quote,
            None => Err(EngineError::network(
                "quotes",
                format!("quote stream for {} ended before the first quote", pair),
            )),
        }
    }

    /// Tell pollers for this key about the current trade size. Does not wait
    /// for a new quote.
    pub fn update_amount(&self, direction: OrderDirection, pair: CurrencyPair, amount: MoneyValue) {
        self.amount_hints
            .entry((direction, pair))
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(amount));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::CryptoCurrency;
    use crate::testing::FakeQuotesFeed;

    fn pair() -> CurrencyPair {
        CurrencyPair::new(CryptoCurrency::Ethereum, CryptoCurrency::Bitcoin)
    }

    #[tokio::test]
    async fn test_take_one_yields_only_first_quote() {
        let feed = Arc::new(FakeQuotesFeed::new());
        let engine = QuotesEngine::new(feed.clone(), Duration::from_millis(5));

        let quotes: Vec<_> = engine
            .get_rate(OrderDirection::OnChain, pair())
            .take(1)
            .collect()
            .await;

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].as_ref().unwrap().identifier, "quote-1");
    }

    #[tokio::test]
    async fn test_stream_keeps_updating() {
        let feed = Arc::new(FakeQuotesFeed::new());
        let engine = QuotesEngine::new(feed.clone(), Duration::from_millis(5));

        let quotes: Vec<_> = engine
            .get_rate(OrderDirection::OnChain, pair())
            .take(3)
            .map(|q| q.unwrap().identifier)
            .collect()
            .await;

        assert_eq!(quotes, vec!["quote-1", "quote-2", "quote-3"]);
    }

    #[tokio::test]
    async fn test_poller_stops_after_consumer_drops() {
        let feed = Arc::new(FakeQuotesFeed::new());
        let engine = QuotesEngine::new(feed.clone(), Duration::from_millis(5));

        engine
            .first_quote(OrderDirection::OnChain, pair())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let after_drop = feed.fetch_count();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(feed.fetch_count(), after_drop);
        assert!(after_drop <= 2);
    }

    #[tokio::test]
    async fn test_amount_hint_reaches_feed() {
        let feed = Arc::new(FakeQuotesFeed::new());
        let engine = QuotesEngine::new(feed.clone(), Duration::from_secs(60));
        let amount = MoneyValue::from_minor(42, CryptoCurrency::Ethereum);

        let mut stream = engine.get_rate(OrderDirection::OnChain, pair());
        stream.next().await.unwrap().unwrap();

        engine.update_amount(OrderDirection::OnChain, pair(), amount);
        stream.next().await.unwrap().unwrap();

        assert_eq!(feed.last_amount(), Some(amount));
    }

    #[tokio::test]
    async fn test_feed_error_is_emitted() {
        let feed = Arc::new(FakeQuotesFeed::unreachable());
        let engine = QuotesEngine::new(feed, Duration::from_millis(5));

        let err = engine
            .first_quote(OrderDirection::OnChain, pair())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
