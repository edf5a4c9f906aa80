use crate::domain::notification::{NotificationRequest, NotificationResult};
use crate::domain::ports::{NotificationChannel, NotificationChannelRef};
use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fans an "order placed" event out to every configured channel.
///
/// Channels run concurrently and independently: an error, a panic or a timeout in one
/// channel turns into a failed [`NotificationResult`] for that channel only. `dispatch`
/// always resolves with exactly one result per channel, in configuration order.
pub struct NotificationDispatcher {
    channels: Vec<NotificationChannelRef>,
    channel_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(channel_timeout: Duration) -> Self {
        Self {
            channels: Vec::new(),
            channel_timeout,
        }
    }

    pub fn with_channel(mut self, channel: NotificationChannelRef) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_channels(
        mut self,
        channels: impl IntoIterator<Item = NotificationChannelRef>,
    ) -> Self {
        self.channels.extend(channels);
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn dispatch(&self, request: &NotificationRequest) -> Vec<NotificationResult> {
        let sends = self
            .channels
            .iter()
            .map(|channel| self.send_one(channel.as_ref(), request));
        let results = join_all(sends).await;

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            warn!(
                order_id = %request.order_id,
                failed,
                total = results.len(),
                "some notification channels failed"
            );
        } else {
            info!(
                order_id = %request.order_id,
                total = results.len(),
                "notifications dispatched"
            );
        }
        results
    }

    async fn send_one(
        &self,
        channel: &dyn NotificationChannel,
        request: &NotificationRequest,
    ) -> NotificationResult {
        let name = channel.name().to_string();
        let attempt = AssertUnwindSafe(channel.send(request)).catch_unwind();

        let result = match tokio::time::timeout(self.channel_timeout, attempt).await {
            Ok(Ok(Ok(mut result))) => {
                result.channel = name;
                result
            }
            Ok(Ok(Err(e))) => NotificationResult::failed(name, e.to_string()),
            Ok(Err(_)) => NotificationResult::failed(name, "channel panicked"),
            Err(_) => NotificationResult::failed(
                name,
                format!("no answer within {}ms", self.channel_timeout.as_millis()),
            ),
        };
        debug!(
            channel = %result.channel,
            success = result.success,
            message = %result.message,
            "notification channel settled"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Customer, Pressing};
    use crate::domain::session::PaymentMethod;
    use crate::error::{CheckoutError, Result};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Arc;

    enum Behaviour {
        Ok,
        Err,
        Panic,
        Hang,
    }

    struct TestChannel {
        name: &'static str,
        behaviour: Behaviour,
    }

    #[async_trait]
    impl NotificationChannel for TestChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, _request: &NotificationRequest) -> Result<NotificationResult> {
            match self.behaviour {
                Behaviour::Ok => Ok(NotificationResult::delivered(self.name, "sent")),
                Behaviour::Err => Err(CheckoutError::Channel("smtp refused".to_string())),
                Behaviour::Panic => panic!("channel bug"),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(NotificationResult::delivered(self.name, "late"))
                }
            }
        }
    }

    fn channel(name: &'static str, behaviour: Behaviour) -> NotificationChannelRef {
        Arc::new(TestChannel { name, behaviour })
    }

    fn request() -> NotificationRequest {
        NotificationRequest {
            order_id: "ord-1".to_string(),
            order_reference: "ORD-1".to_string(),
            customer: Customer::default(),
            pressing: Pressing::default(),
            method: PaymentMethod::CashOnDelivery,
            amount: 5000,
            transaction_id: None,
            placed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_one_result_per_channel_in_order() {
        let dispatcher = NotificationDispatcher::new(Duration::from_secs(1))
            .with_channel(channel("a", Behaviour::Ok))
            .with_channel(channel("b", Behaviour::Err))
            .with_channel(channel("c", Behaviour::Ok));

        let results = dispatcher.dispatch(&request()).await;

        let names: Vec<&str> = results.iter().map(|r| r.channel.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].message.contains("smtp refused"));
        assert!(results[2].success);
    }

    #[tokio::test]
    async fn test_panicking_channel_is_reported() {
        let dispatcher = NotificationDispatcher::new(Duration::from_secs(1))
            .with_channel(channel("panics", Behaviour::Panic))
            .with_channel(channel("ok", Behaviour::Ok));

        let results = dispatcher.dispatch(&request()).await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert_eq!(results[0].message, "channel panicked");
        assert!(results[1].success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_channel_times_out() {
        let dispatcher = NotificationDispatcher::new(Duration::from_secs(10))
            .with_channel(channel("hangs", Behaviour::Hang))
            .with_channel(channel("ok", Behaviour::Ok));

        let results = dispatcher.dispatch(&request()).await;

        assert!(!results[0].success);
        assert!(results[0].message.contains("no answer"));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_no_channels() {
        let dispatcher = NotificationDispatcher::new(Duration::from_secs(1));
        assert!(dispatcher.dispatch(&request()).await.is_empty());
        assert!(dispatcher.channel_names().is_empty());
    }
}
