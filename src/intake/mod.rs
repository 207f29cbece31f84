//! Turns incoming notifications into bubbles, history entries and unread
//! counts.
//!
//! Everything here runs on the GTK main thread, one notification at a time.
//! Collaborators are injected through [`Collaborators`] so the rules can be
//! exercised without a display, a bus or a database.

pub mod queue;

use async_channel::{Receiver, Sender};
use chrono::NaiveDateTime;

use crate::config::EvictionPolicy;
use crate::format::{FormatError, Formatter, Message};
use crate::notifications::wrapper::Notification;
use self::queue::BubbleQueue;

pub const HEIGHT_WITHOUT_ACTIONS: i32 = 87;
pub const HEIGHT_WITH_ACTIONS: i32 = 110;
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d-%H:%M:%S";

pub trait Preference {
    fn disable_bubble(&self) -> bool;
}

pub trait Blacklist {
    fn contains(&self, app_name: &str) -> bool;
}

pub trait HistoryStore {
    fn add(&self, created_at: &str, message: &Message) -> anyhow::Result<()>;
}

pub trait TrayIndicator {
    fn increase_unread(&self, entry: (String, Message)) -> anyhow::Result<()>;
}

pub fn bubble_height(message: &Message) -> i32 {
    if message.actions.is_empty() {
        HEIGHT_WITHOUT_ACTIONS
    } else {
        HEIGHT_WITH_ACTIONS
    }
}

pub fn format_timestamp(time: NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub id: u32,
    pub message: Message,
    pub height: i32,
    pub created_at: String,
}

impl Bubble {
    pub fn new(message: Message, created_at: String) -> Self {
        Bubble {
            id: message.id,
            height: bubble_height(&message),
            message,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BubbleEvent {
    /// A bubble is about to arrive; visible ones shift by this height.
    ReadyToMoveUp(i32),
    Shown(Bubble),
    Updated(Bubble),
    Evicted(u32),
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("failed to format notification: {0}")]
    Format(#[from] FormatError),
    #[error("failed to record notification in history: {0}")]
    History(#[source] anyhow::Error),
    #[error("failed to update the tray: {0}")]
    Tray(#[source] anyhow::Error),
}

/// What a single intake did, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeReport {
    pub height: i32,
    pub created_at: String,
    pub repositioned: bool,
    pub shown: bool,
    pub evicted: Option<u32>,
}

pub struct Collaborators {
    pub formatter: Box<dyn Formatter>,
    pub preference: Box<dyn Preference>,
    pub blacklist: Box<dyn Blacklist>,
    pub history: Box<dyn HistoryStore>,
    pub tray: Box<dyn TrayIndicator>,
}

pub struct Intake {
    collaborators: Collaborators,
    queue: BubbleQueue,
    events: Sender<BubbleEvent>,
    receiver: Receiver<BubbleEvent>,
    clock: Box<dyn Fn() -> NaiveDateTime>,
}

impl Intake {
    pub fn new(collaborators: Collaborators, policy: EvictionPolicy) -> Self {
        // Unbounded: a lost Shown or Evicted would leave a queued bubble
        // without a widget to ever release it
        let (events, receiver) = async_channel::unbounded();

        Intake {
            collaborators,
            queue: BubbleQueue::new(policy),
            events,
            receiver,
            clock: Box::new(|| chrono::Local::now().naive_local()),
        }
    }

    #[cfg(test)]
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// The bubble event stream. Every event is delivered to exactly one
    /// receiver, so the rendering layer should be the only consumer.
    pub fn events(&self) -> Receiver<BubbleEvent> {
        self.receiver.clone()
    }

    fn emit(&self, event: BubbleEvent) {
        // Cannot fail, the channel is unbounded and we hold a receiver
        let _ = self.events.try_send(event);
    }

    pub fn queue(&self) -> &BubbleQueue {
        &self.queue
    }

    pub fn set_eviction_policy(&mut self, policy: EvictionPolicy) {
        self.queue.set_policy(policy);
    }

    pub fn on_notify(&mut self, notification: &Notification) -> Result<IntakeReport, IntakeError> {
        let message = self.collaborators.formatter.format(notification)?;
        let height = bubble_height(&message);
        let created_at = format_timestamp((self.clock)());

        // Signalled before suppression is decided, so a suppressed bubble
        // still moves the visible ones.
        let repositioned = !self.queue.is_empty();
        if repositioned {
            self.emit(BubbleEvent::ReadyToMoveUp(height));
        }

        let mut shown = false;
        let mut evicted = None;

        if !self.collaborators.preference.disable_bubble()
            && !self.collaborators.blacklist.contains(&message.app_name)
        {
            let bubble = Bubble::new(message.clone(), created_at.clone());

            match self.queue.push(bubble.clone()) {
                Some(dropped) if dropped.id == bubble.id => {
                    evicted = Some(dropped.id);
                },

                Some(dropped) => {
                    evicted = Some(dropped.id);
                    self.emit(BubbleEvent::Evicted(dropped.id));
                    self.emit(BubbleEvent::Shown(bubble));
                    shown = true;
                },

                None => {
                    self.emit(BubbleEvent::Shown(bubble));
                    shown = true;
                },
            }
        }

        self.collaborators.history
            .add(&created_at, &message)
            .map_err(IntakeError::History)?;

        self.collaborators.tray
            .increase_unread((created_at.clone(), message))
            .map_err(IntakeError::Tray)?;

        Ok(IntakeReport {
            height,
            created_at,
            repositioned,
            shown,
            evicted,
        })
    }

    /// Applies a replacement to a queued bubble and records it in history.
    /// Returns whether a queued bubble was updated.
    pub fn on_update(&mut self, notification: &Notification) -> Result<bool, IntakeError> {
        let message = self.collaborators.formatter.format(notification)?;
        let created_at = format_timestamp((self.clock)());

        let updated = match self.queue.get_mut(message.id) {
            Some(bubble) => {
                bubble.height = bubble_height(&message);
                bubble.message = message.clone();
                let bubble = bubble.clone();
                self.emit(BubbleEvent::Updated(bubble));
                true
            },

            None => false,
        };

        self.collaborators.history
            .add(&created_at, &message)
            .map_err(IntakeError::History)?;

        Ok(updated)
    }

    /// Forgets a bubble the rendering layer has closed.
    pub fn release(&mut self, id: u32) -> bool {
        self.queue.remove(id).is_some()
    }
}
