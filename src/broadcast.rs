use async_broadcast::{broadcast, Sender, Receiver, InactiveReceiver};

/// Fan-out channel whose sends never wait: old values are dropped when the
/// buffer is full and nothing is queued while nobody listens.
#[derive(Debug, Clone)]
pub struct BroadcastChannel<T> {
    sender: Sender<T>,
    inactive_template: InactiveReceiver<T>,
}

impl<T: Clone> BroadcastChannel<T> {
    pub fn new(buffer: usize) -> Self {
        let (mut sender, receiver) = broadcast(buffer);
        sender.set_overflow(true);
        sender.set_await_active(false);

        Self {
            sender,
            // deactivate the initial receiver so it does not back up the buffer
            inactive_template: receiver.deactivate(),
        }
    }

    pub fn subscribe(&self) -> Receiver<T> {
        self.inactive_template.clone().activate()
    }

    pub async fn send(&self, value: T) {
        let _ = self.sender.broadcast(value).await;
    }

    pub fn send_now(&self, value: T) {
        let _ = self.sender.try_broadcast(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_without_subscribers_does_not_block() {
        let channel = BroadcastChannel::new(1);
        channel.send_now(1);
        channel.send_now(2);

        let mut receiver = channel.subscribe();
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn overflow_keeps_newest_values() {
        let channel = BroadcastChannel::new(2);
        let mut receiver = channel.subscribe();

        for value in 0..4 {
            channel.send_now(value);
        }

        let mut received = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(value) => received.push(value),
                Err(async_broadcast::TryRecvError::Overflowed(_)) => continue,
                Err(_) => break,
            }
        }

        assert_eq!(received, vec![2, 3]);
    }
}
