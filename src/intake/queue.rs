use std::collections::VecDeque;

use crate::config::EvictionPolicy;
use super::Bubble;

pub const MAX_VISIBLE_BUBBLES: usize = 3;

/// Bubbles in arrival order, never longer than its capacity once a push has
/// returned.
#[derive(Debug, Clone)]
pub struct BubbleQueue {
    bubbles: VecDeque<Bubble>,
    capacity: usize,
    policy: EvictionPolicy,
}

impl BubbleQueue {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self::with_capacity(MAX_VISIBLE_BUBBLES, policy)
    }

    pub fn with_capacity(capacity: usize, policy: EvictionPolicy) -> Self {
        BubbleQueue {
            bubbles: VecDeque::with_capacity(capacity + 1),
            capacity,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: EvictionPolicy) {
        self.policy = policy;
    }

    /// Appends a bubble and returns the one evicted to stay within capacity.
    pub fn push(&mut self, bubble: Bubble) -> Option<Bubble> {
        self.bubbles.push_back(bubble);

        if self.bubbles.len() > self.capacity {
            match self.policy {
                EvictionPolicy::Newest => self.bubbles.pop_back(),
                EvictionPolicy::Oldest => self.bubbles.pop_front(),
            }
        } else {
            None
        }
    }

    pub fn remove(&mut self, id: u32) -> Option<Bubble> {
        let index = self.bubbles.iter().position(|bubble| bubble.id == id)?;
        self.bubbles.remove(index)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Bubble> {
        self.bubbles.iter_mut().find(|bubble| bubble.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bubble> {
        self.bubbles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::tests::message;

    fn bubble(id: u32) -> Bubble {
        Bubble::new(message(id, "app", 0), "2024/01/01-00:00:00".to_owned())
    }

    fn ids(queue: &BubbleQueue) -> Vec<u32> {
        queue.iter().map(|bubble| bubble.id).collect()
    }

    #[test]
    fn newest_policy_drops_the_pushed_bubble() {
        let mut queue = BubbleQueue::new(EvictionPolicy::Newest);
        for id in 1..=3 {
            assert!(queue.push(bubble(id)).is_none());
        }

        let evicted = queue.push(bubble(4)).map(|bubble| bubble.id);
        assert_eq!(evicted, Some(4));
        assert_eq!(ids(&queue), vec![1, 2, 3]);
    }

    #[test]
    fn oldest_policy_drops_the_front() {
        let mut queue = BubbleQueue::new(EvictionPolicy::Oldest);
        for id in 1..=4 {
            queue.push(bubble(id));
        }

        assert_eq!(ids(&queue), vec![2, 3, 4]);
    }

    #[test]
    fn remove_by_id_keeps_order() {
        let mut queue = BubbleQueue::new(EvictionPolicy::Newest);
        for id in 1..=3 {
            queue.push(bubble(id));
        }

        assert_eq!(queue.remove(2).map(|bubble| bubble.id), Some(2));
        assert!(queue.remove(2).is_none());
        assert_eq!(ids(&queue), vec![1, 3]);
    }

    #[test]
    fn custom_capacity() {
        let mut queue = BubbleQueue::with_capacity(1, EvictionPolicy::Oldest);
        queue.push(bubble(1));
        assert_eq!(queue.push(bubble(2)).map(|bubble| bubble.id), Some(1));
        assert_eq!(queue.len(), 1);
    }
}
