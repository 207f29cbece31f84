pub mod bubble;

use std::cell::RefCell;
use std::rc::Rc;

use crate::config;
use crate::intake::{Bubble, BubbleEvent, Intake};
use crate::notifications;
use crate::notifications::bus::BusEvent;
use crate::notifications::wrapper::NotificationCloseReason;
use self::bubble::{BubbleWidget, expire_duration};

pub const BUBBLE_SPACING: i32 = 10;

/// The visible bubble windows, newest at the top edge.
#[derive(Clone)]
pub struct BubbleStack {
    application: gtk4::Application,
    intake: Rc<RefCell<Intake>>,
    widgets: Rc<RefCell<Vec<BubbleWidget>>>,
}

impl BubbleStack {
    pub fn new(application: &gtk4::Application, intake: Rc<RefCell<Intake>>) -> Self {
        BubbleStack {
            application: application.clone(),
            intake,
            widgets: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn find(&self, id: u32) -> Option<BubbleWidget> {
        self.widgets.borrow().iter().find(|widget| widget.id == id).cloned()
    }

    /// Shifts every bubble stacked below `offset` by `delta`.
    fn shift_below(&self, offset: i32, delta: i32) {
        for widget in self.widgets.borrow().iter() {
            if widget.offset.get() > offset {
                widget.set_offset(widget.offset.get() + delta);
            }
        }
    }

    fn move_up(&self, height: i32) {
        self.shift_below(i32::MIN, height + BUBBLE_SPACING);
    }

    fn show(&self, bubble: &Bubble) {
        let widget = BubbleWidget::new(&self.application, bubble, {
            let me = self.clone();
            move |id, reason| me.on_closed(id, reason)
        });

        self.widgets.borrow_mut().push(widget.clone());
        widget.present(self.expire_after(bubble));
    }

    fn update(&self, bubble: &Bubble) {
        if let Some(widget) = self.find(bubble.id) {
            let delta = widget.update(bubble, self.expire_after(bubble));
            if delta != 0 {
                self.shift_below(widget.offset.get(), delta);
            }
        }
    }

    fn expire_after(&self, bubble: &Bubble) -> std::time::Duration {
        expire_duration(&bubble.message, config::read_config().bubbles.expire_timeout)
    }

    /// Closes a bubble without telling the server, which initiated the close.
    pub fn close_silently(&self, id: u32) {
        if let Some(widget) = self.find(id) {
            widget.close(None);
        }
    }

    fn on_closed(&self, id: u32, reason: Option<NotificationCloseReason>) {
        let removed = {
            let mut widgets = self.widgets.borrow_mut();
            let index = widgets.iter().position(|widget| widget.id == id);
            index.map(|index| widgets.remove(index))
        };

        if let Some(widget) = removed {
            self.shift_below(widget.offset.get(), -(widget.height.get() + BUBBLE_SPACING));
        }

        self.intake.borrow_mut().release(id);

        if let Some(reason) = reason {
            if let Err(err) = notifications::close_notification_by_id(id, reason) {
                debug!(id, ?err, "Notification was already gone when its bubble closed");
            }
        }
    }

    fn handle(&self, event: BubbleEvent) {
        match event {
            BubbleEvent::ReadyToMoveUp(height) => self.move_up(height),
            BubbleEvent::Shown(bubble) => self.show(&bubble),
            BubbleEvent::Updated(bubble) => self.update(&bubble),
            BubbleEvent::Evicted(id) => {
                if let Some(widget) = self.find(id) {
                    widget.close(Some(NotificationCloseReason::Expired));
                }
            },
        }
    }
}

/// Drives the intake from the bus and the bubble windows from the intake.
pub fn listen_for_notifications(stack: BubbleStack) {
    let bubble_events = stack.intake.borrow().events();

    gtk4::glib::spawn_future_local({
        let stack = stack.clone();
        async move {
            while let Ok(event) = bubble_events.recv().await {
                stack.handle(event);
            }
        }
    });

    let bus_events = notifications::subscribe();

    gtk4::glib::spawn_future_local(async move {
        while let Ok(event) = bus_events.recv().await {
            match event {
                BusEvent::NotificationAdded(notification) => {
                    let result = {
                        let mut intake = stack.intake.borrow_mut();
                        intake.set_eviction_policy(config::read_config().bubbles.eviction);
                        intake.on_notify(&notification)
                    };

                    match result {
                        // Never displayed, so it will never expire on its own
                        Ok(report) if !report.shown => {
                            debug!(id = notification.id, ?report, "Notification taken in without a bubble");
                            let _ = notifications::close_notification_by_id(notification.id, NotificationCloseReason::Expired);
                        },
                        Ok(report) => debug!(id = notification.id, ?report, "Notification taken in"),
                        Err(err) => error!(id = notification.id, %err, "Failed to take in notification"),
                    }
                },

                BusEvent::NotificationUpdated(id, notification) => {
                    if let Err(err) = stack.intake.borrow_mut().on_update(&notification) {
                        error!(id, %err, "Failed to apply notification update");
                    }
                },

                BusEvent::NotificationClosed(id) => stack.close_silently(id),
            }
        }
    });
}
