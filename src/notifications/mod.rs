pub mod bus;
pub mod interface;
pub mod wrapper;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, OnceLock, RwLock};
use async_broadcast::RecvError;
use async_channel::{Receiver, Sender};

use crate::sql::actor::SqlActor;
use crate::sql::wrappers::history::HistoryRecord;
use self::bus::BusEvent;
use self::wrapper::{Notification, NotificationCloseReason, NotificationManager};

// Unbounded so that every accepted Notify reaches intake
static CHANNEL: LazyLock<(Sender<BusEvent>, Receiver<BusEvent>)> = LazyLock::new(async_channel::unbounded);

pub static NOTIFICATIONS: OnceLock<Arc<RwLock<HashMap<u32, Notification>>>> = OnceLock::new();

/// Claims the notifications bus name and starts serving it. Events are
/// delivered through [`subscribe`] and new history records are announced on
/// the bus.
pub async fn activate(
    history: SqlActor,
    mut records: async_broadcast::Receiver<HistoryRecord>,
) -> Result<(), dbus::Error> {
    let manager = NotificationManager::new(history, CHANNEL.0.clone());

    NOTIFICATIONS.set(manager.notifications())
        .map_err(|_| dbus::Error::new_failed("Notifications singleton already initialized"))?;

    tokio::spawn(async move {
        loop {
            match records.recv().await {
                Ok(record) => match record.to_json() {
                    Ok(json) => wrapper::emit_record_added(json),
                    Err(err) => warn!(%err, id = %record.id, "Failed to serialize history record"),
                },
                // The rows are stored, only their announcement is lost
                Err(RecvError::Overflowed(skipped)) => warn!(skipped, "Dropped RecordAdded signals"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    wrapper::init_shared_connection().await?;
    manager.serve()?;

    info!("Serving org.freedesktop.Notifications");
    Ok(())
}

/// The bus event stream. Events are not fanned out, each one reaches a
/// single receiver.
pub fn subscribe() -> Receiver<BusEvent> {
    CHANNEL.1.clone()
}

pub fn close_notification_by_id(
    id: u32,
    reason: NotificationCloseReason
) -> Result<(), dbus::MethodErr> {
    let notifications = NOTIFICATIONS.get()
        .ok_or_else(|| dbus::MethodErr::failed(&"Notifications singleton is not initialized"))?;

    wrapper::close_notification_by_id(
        notifications,
        &CHANNEL.0,
        id,
        reason,
    )
}

pub fn invoke_notification_action(
    id: u32,
    action_key: &str,
) {
    wrapper::emit_notification_action_invoked(id, action_key);
}
