//! Context-scoped shared feed.
//!
//! A [`Feed`] lets one handler stream a continuous sequence of items to any
//! number of cooperating consumers within the same context, without the
//! handlers sharing state. It is a broadcast channel paired with a stop
//! signal: consumers call [`FeedSubscription::next`] in a loop and get `None`
//! once the feed is stopped, so shutdown is always cooperative rather than
//! preemptive.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Shared stream handle. Cloning shares the underlying channel and stop
/// signal; every clone publishes to and stops the same feed.
pub struct Feed<I: Clone> {
    tx: broadcast::Sender<I>,
    stop: CancellationToken,
}

impl<I: Clone> Clone for Feed<I> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            stop: self.stop.clone(),
        }
    }
}

impl<I: Clone + Send + 'static> Feed<I> {
    /// Create a feed buffering up to `capacity` items per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            stop: CancellationToken::new(),
        }
    }

    /// Publish an item to every current subscriber.
    ///
    /// Returns the number of subscribers the item was delivered to. Items
    /// published while nobody is subscribed are dropped; only items published
    /// after `subscribe` reach a given subscriber.
    pub fn publish(&self, item: I) -> usize {
        match self.tx.send(item) {
            Ok(receivers) => receivers,
            Err(_) => {
                log::trace!("feed item dropped, no subscribers");
                0
            }
        }
    }

    /// Subscribe to items published from this point on.
    pub fn subscribe(&self) -> FeedSubscription<I> {
        FeedSubscription {
            rx: self.tx.subscribe(),
            stop: self.stop.clone(),
        }
    }

    /// Signal every consumer to stop. Consumers observe the signal at their
    /// next `next()` call; in-flight work is never interrupted mid-item.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A consumer's view of a [`Feed`].
pub struct FeedSubscription<I: Clone> {
    rx: broadcast::Receiver<I>,
    stop: CancellationToken,
}

impl<I: Clone + Send + 'static> FeedSubscription<I> {
    /// Await the next item.
    ///
    /// Returns `None` once the feed is stopped or every publisher is gone.
    /// A subscriber that falls behind the channel capacity skips the lost
    /// items and keeps going.
    pub async fn next(&mut self) -> Option<I> {
        loop {
            tokio::select! {
                _ = self.stop.cancelled() => {
                    log::trace!("feed stopped, consumer leaving");
                    return None;
                }
                received = self.rx.recv() => {
                    match received {
                        Ok(item) => return Some(item),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            log::warn!("feed consumer lagged, skipped {} items", skipped);
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_publish_and_receive() {
        let feed: Feed<u64> = Feed::new(16);
        let mut subscription = feed.subscribe();

        assert_eq!(feed.publish(1), 1);
        assert_eq!(feed.publish(2), 1);

        assert_eq!(subscription.next().await, Some(1));
        assert_eq!(subscription.next().await, Some(2));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_drops() {
        let feed: Feed<u64> = Feed::new(16);
        assert_eq!(feed.publish(42), 0);

        // Late subscribers only see later items.
        let mut subscription = feed.subscribe();
        feed.publish(43);
        assert_eq!(subscription.next().await, Some(43));
    }

    #[tokio::test]
    async fn test_stop_wakes_waiting_consumer() {
        let feed: Feed<u64> = Feed::new(16);
        let mut subscription = feed.subscribe();

        let waiter = tokio::spawn(async move { subscription.next().await });

        feed.stop();
        let item = timeout(Duration::from_millis(200), waiter)
            .await
            .expect("consumer did not observe stop")
            .unwrap();
        assert_eq!(item, None);
        assert!(feed.is_stopped());
    }

    #[tokio::test]
    async fn test_multiple_consumers_each_get_every_item() {
        let feed: Feed<u64> = Feed::new(16);
        let mut first = feed.subscribe();
        let mut second = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 2);

        assert_eq!(feed.publish(7), 2);

        assert_eq!(first.next().await, Some(7));
        assert_eq!(second.next().await, Some(7));
    }

    #[tokio::test]
    async fn test_lagged_consumer_skips_and_continues() {
        let feed: Feed<u64> = Feed::new(2);
        let mut subscription = feed.subscribe();

        for item in 0..5 {
            feed.publish(item);
        }

        // Oldest items were overwritten; the consumer resumes at the tail.
        let first = subscription.next().await.unwrap();
        assert!(first >= 3);
        let second = subscription.next().await.unwrap();
        assert_eq!(second, first + 1);
    }
}
