// src/services/rate_limiter.rs
//
// Contador de requisições por chave de API em janela fixa.
// A store em memória é local ao processo e zera ao reiniciar; quem precisar de
// várias instâncias implementa `RateLimitStore` sobre uma store compartilhada.

use async_trait::async_trait;
use std::{collections::HashMap, sync::Mutex, time::Duration};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_after_secs: u64,
    },
    Limited {
        limit: u32,
        retry_after_secs: u64,
    },
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Registra uma chamada para `key_id` e decide se ela cabe no limite.
    async fn hit(&self, key_id: i64, limit: u32) -> RateDecision;
}

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    started_at: Instant,
    count: u32,
}

pub struct InMemoryRateLimitStore {
    window: Duration,
    counters: Mutex<HashMap<i64, WindowCounter>>,
}

impl InMemoryRateLimitStore {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            counters: Mutex::new(HashMap::new()),
        }
    }

    // Arredonda para cima: nunca anuncia 0s enquanto a janela não acabou
    fn secs_until_reset(&self, elapsed: Duration) -> u64 {
        let left = self.window.saturating_sub(elapsed);
        let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
        secs.max(1)
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, key_id: i64, limit: u32) -> RateDecision {
        let now = Instant::now();
        // Mutex envenenado só acontece após panic; seguimos com o estado atual.
        let mut counters = match self.counters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let entry = counters
            .entry(key_id)
            .or_insert(WindowCounter { started_at: now, count: 0 });

        if now.duration_since(entry.started_at) >= self.window {
            *entry = WindowCounter { started_at: now, count: 0 };
        }

        let elapsed = now.duration_since(entry.started_at);
        if entry.count >= limit {
            return RateDecision::Limited {
                limit,
                retry_after_secs: self.secs_until_reset(elapsed),
            };
        }

        entry.count += 1;
        RateDecision::Allowed {
            limit,
            remaining: limit - entry.count,
            reset_after_secs: self.secs_until_reset(elapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryRateLimitStore {
        InMemoryRateLimitStore::new(Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn accepts_exactly_the_limit_then_rejects() {
        let limiter = store();

        for expected_remaining in (0..5).rev() {
            match limiter.hit(1, 5).await {
                RateDecision::Allowed { remaining, .. } => assert_eq!(remaining, expected_remaining),
                other => panic!("esperado Allowed, veio {other:?}"),
            }
        }

        tokio::time::advance(Duration::from_secs(20)).await;
        match limiter.hit(1, 5).await {
            RateDecision::Limited { limit, retry_after_secs } => {
                assert_eq!(limit, 5);
                assert_eq!(retry_after_secs, 40);
            }
            other => panic!("esperado Limited, veio {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn counter_resets_after_window() {
        let limiter = store();
        for _ in 0..5 {
            limiter.hit(1, 5).await;
        }
        assert!(matches!(limiter.hit(1, 5).await, RateDecision::Limited { .. }));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(
            limiter.hit(1, 5).await,
            RateDecision::Allowed { limit: 5, remaining: 4, reset_after_secs: 60 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_counted_independently() {
        let limiter = store();
        assert!(matches!(limiter.hit(1, 1).await, RateDecision::Allowed { .. }));
        assert!(matches!(limiter.hit(1, 1).await, RateDecision::Limited { .. }));
        assert!(matches!(limiter.hit(2, 1).await, RateDecision::Allowed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_limit_always_rejects() {
        let limiter = store();
        assert!(matches!(limiter.hit(3, 0).await, RateDecision::Limited { .. }));
    }
}
