use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::storage::PageStore;

/// Background task that deletes expired pages.
///
/// Reads already hide pages past `expires_at`, so the sweep only bounds how
/// long dead rows linger: at most one `interval`.
pub async fn run_sweeper(store: Arc<dyn PageStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        sweep_once(store.as_ref()).await;
    }
}

/// One sweep pass. Failures are logged and retried on the next tick.
pub async fn sweep_once(store: &dyn PageStore) -> u64 {
    match store.delete_expired(Utc::now()).await {
        Ok(count) => {
            if count > 0 {
                tracing::info!(count, "Expiry sweep removed pages");
            }
            count
        }
        Err(e) => {
            tracing::warn!("Expiry sweep failed: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::{
        models::{generate_page_id, GratitudePage},
        storage::memory::MemoryPageStore,
    };

    fn page_created(created_at: chrono::DateTime<Utc>) -> GratitudePage {
        GratitudePage {
            page_id: generate_page_id(),
            creator_name: "Someone Special".to_string(),
            loved_one_name: "Sam".to_string(),
            nickname: None,
            message: "Thank you".to_string(),
            wishes: String::new(),
            photos: vec![],
            theme: "default".to_string(),
            created_at,
            expires_at: created_at + ChronoDuration::hours(24),
        }
    }

    #[tokio::test]
    async fn sweep_once_removes_only_expired_pages() {
        let store = MemoryPageStore::new();
        let expired = page_created(Utc::now() - ChronoDuration::hours(30));
        let live = page_created(Utc::now());
        store.insert_page(&expired).await.unwrap();
        store.insert_page(&live).await.unwrap();

        assert_eq!(sweep_once(&store).await, 1);
        assert_eq!(sweep_once(&store).await, 0);
        assert!(store
            .find_live_page(&live.page_id, Utc::now())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_on_first_tick() {
        let store = Arc::new(MemoryPageStore::new());
        let page = page_created(Utc::now() - ChronoDuration::hours(30));
        store.insert_page(&page).await.unwrap();

        let handle = tokio::spawn(run_sweeper(store.clone(), Duration::from_secs(60)));
        // Paused clock: this only completes once the sweeper is parked on its next tick.
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(store.delete_expired(Utc::now()).await.unwrap(), 0);
    }
}
