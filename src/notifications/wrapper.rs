use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use async_channel::Sender;
use dbus::message::{MatchRule, SignalArgs as _};
use dbus::nonblock::SyncConnection;
use dbus::arg::RefArg as _;
use dbus::channel::{MatchingReceiver as _, Sender as _};
use dbus_crossroads::{Crossroads, IfaceToken};
use dbus_tokio::connection;
use serde::{Deserialize, Serialize};

use crate::sql::actor::SqlActor;
use crate::sql::wrappers::history;
use super::bus::{self, BusEvent};
use super::interface::{self, OrgFreedesktopNotifications};

static SHARED_CONNECTION: OnceLock<Arc<SyncConnection>> = OnceLock::new();

pub const CAPABILITIES: [&str; 5] = [
    "action-icons",
    "actions",
    "body",
    "body-hyperlinks",
    "body-markup",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCloseReason {
    Expired = 1,
    Dismissed = 2,
    ClosedByCall = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub id: String,
    pub localized_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u32,
    pub app_name: String,
    pub replaces_id: u32,
    pub app_icon: String,
    pub summary: String,
    pub body: String,
    pub actions: Vec<NotificationAction>,
    pub hints: HashMap<String, String>,
    pub expire_timeout: i32,
}

/// Pairs up the flattened `[id, label, id, label, ...]` action list. A
/// trailing unpaired element is ignored.
pub fn parse_actions(actions: &[String]) -> Vec<NotificationAction> {
    actions.chunks_exact(2)
        .map(|chunk| NotificationAction {
            id: chunk[0].clone(),
            localized_name: chunk[1].clone(),
        })
        .collect()
}

/// Keeps string and integer hints, rendering integers in decimal.
pub fn parse_hints(hints: dbus::arg::PropMap) -> HashMap<String, String> {
    hints.into_iter()
        .filter_map(|(key, value)| {
            let value = value.as_str()
                .map(str::to_owned)
                .or_else(|| value.as_i64().map(|n| n.to_string()))
                .or_else(|| value.as_u64().map(|n| n.to_string()))?;

            Some((key, value))
        })
        .collect()
}

#[derive(Clone)]
pub struct NotificationManager {
    id_counter: Arc<RwLock<u32>>,
    notifications: Arc<RwLock<HashMap<u32, Notification>>>,
    events: Sender<BusEvent>,
    history: SqlActor,
}

/// Advances the counter to the next id that is neither 0 nor live, wrapping
/// at `u32::MAX`.
fn next_id(counter: &mut u32, live: &HashMap<u32, Notification>) -> u32 {
    loop {
        *counter = counter.wrapping_add(1);
        if *counter != 0 && !live.contains_key(counter) {
            return *counter;
        }
    }
}

fn send_event(events: &Sender<BusEvent>, event: BusEvent) {
    if events.try_send(event).is_err() {
        error!("Notification event channel is closed");
    }
}

impl OrgFreedesktopNotifications for NotificationManager {
    fn notify(
        &mut self,
        app_name: String,
        replaces_id: u32,
        app_icon: String,
        summary: String,
        body: String,
        actions: Vec<String>,
        hints: dbus::arg::PropMap,
        expire_timeout: i32,
    ) -> Result<u32, dbus::MethodErr> {
        let mut notification = Notification {
            id: 0,
            app_name,
            replaces_id,
            app_icon,
            summary,
            body,
            actions: parse_actions(&actions),
            hints: parse_hints(hints),
            expire_timeout,
        };

        let mut notifications = self.notifications.write()
            .map_err(|_| dbus::MethodErr::failed(&"Failed to acquire write lock on notifications"))?;

        if replaces_id > 0 && notifications.contains_key(&replaces_id) {
            notification.id = replaces_id;
            notifications.insert(replaces_id, notification.clone());
            send_event(&self.events, BusEvent::NotificationUpdated(replaces_id, notification));
            return Ok(replaces_id);
        }

        let id = {
            let mut id_counter = self.id_counter.write()
                .map_err(|_| dbus::MethodErr::failed(&"Failed to acquire write lock on id_counter"))?;

            if replaces_id > 0 {
                // Unknown id: honour it and keep the counter ahead of it
                *id_counter = (*id_counter).max(replaces_id);
                replaces_id
            } else {
                next_id(&mut *id_counter, &*notifications)
            }
        };

        notification.id = id;
        notifications.insert(id, notification.clone());
        debug!(id, app = %notification.app_name, "Received notification");
        send_event(&self.events, BusEvent::NotificationAdded(notification));
        Ok(id)
    }

    fn close_notification(&mut self, id: u32) -> Result<(), dbus::MethodErr> {
        close_notification_by_id(
            &self.notifications,
            &self.events,
            id,
            NotificationCloseReason::ClosedByCall,
        )
    }

    fn get_capabilities(&mut self) -> Result<Vec<String>, dbus::MethodErr> {
        Ok(CAPABILITIES.iter().map(|c| (*c).to_owned()).collect())
    }

    fn get_server_information(&mut self) -> Result<(String, String, String, String), dbus::MethodErr> {
        Ok((
            "Bubble Notifier".to_owned(),
            "bubble-notifier".to_owned(),
            env!("CARGO_PKG_VERSION").to_owned(),
            "1.2".to_owned(),
        ))
    }

    fn get_all_records(&mut self) -> Result<String, dbus::MethodErr> {
        let records = history::get_all(&self.history)
            .map_err(|err| dbus::MethodErr::failed(&err))?;

        serde_json::to_string(&records)
            .map_err(|err| dbus::MethodErr::failed(&err))
    }

    fn remove_record(&mut self, id: String) -> Result<(), dbus::MethodErr> {
        let Ok(row_id) = id.parse::<i64>() else {
            debug!(%id, "Ignoring removal of a malformed record id");
            return Ok(());
        };

        history::remove(&self.history, row_id)
            .map(|_| ())
            .map_err(|err| dbus::MethodErr::failed(&err))
    }

    fn clear_records(&mut self) -> Result<(), dbus::MethodErr> {
        history::clear(&self.history)
            .map(|removed| info!(removed, "Cleared notification history"))
            .map_err(|err| dbus::MethodErr::failed(&err))
    }
}

impl NotificationManager {
    /// Events go to `events` in the order the bus delivered the calls.
    pub fn new(history: SqlActor, events: Sender<BusEvent>) -> Self {
        NotificationManager {
            id_counter: Arc::new(RwLock::new(0)),
            notifications: Arc::new(RwLock::new(HashMap::new())),
            events,
            history,
        }
    }

    /// Retrieves an Arc to the notifications HashMap's RwLock.
    pub fn notifications(&self) -> Arc<RwLock<HashMap<u32, Notification>>> {
        Arc::clone(&self.notifications)
    }

    /// Serves clients on the shared D-Bus connection, consuming this manager.
    ///
    /// The shared connection must be initialized via `init_shared_connection()` before calling this.
    pub fn serve(self) -> Result<(), dbus::Error> {
        let connection = get_shared_connection()
            .ok_or_else(|| dbus::Error::new_failed("Shared connection not initialized. Call init_shared_connection() first."))?;

        let mut crossroads = Crossroads::new();
        let token: IfaceToken<NotificationManager> = interface::register_org_freedesktop_notifications(&mut crossroads);

        crossroads.insert(bus::NOTIFICATIONS_DBUS_OBJECT, &[token], self);

        connection.start_receive(
            MatchRule::new_method_call(),
            Box::new(move |msg, conn| {
                let _ = crossroads.handle_message(msg, conn);
                true
            }),
        );

        Ok(())
    }
}

/// Initializes the shared D-Bus connection and requests the bus name.
/// Must be called from within a tokio runtime context.
pub async fn init_shared_connection() -> Result<(), dbus::Error> {
    let (resource, connection) = connection::new_session_sync()?;

    tokio::spawn(async move {
        let err = resource.await;
        error!(%err, "Lost connection to D-Bus");
        std::process::exit(1);
    });

    let reply = connection.request_name(
        bus::NOTIFICATIONS_DBUS_BUS,
        false,
        true,
        true,
    ).await?;

    info!(?reply, bus = bus::NOTIFICATIONS_DBUS_BUS, "Requested notifications bus name");

    SHARED_CONNECTION.set(connection)
        .map_err(|_| dbus::Error::new_failed("Shared connection already initialized"))?;

    Ok(())
}

/// Gets the shared D-Bus connection.
fn get_shared_connection() -> Option<Arc<SyncConnection>> {
    SHARED_CONNECTION.get().cloned()
}

fn emit_signal<S: dbus::message::SignalArgs + dbus::arg::AppendAll>(signal: S) {
    let Some(connection) = get_shared_connection() else {
        warn!(signal = S::NAME, "Failed to emit signal: shared connection not initialized");
        return;
    };

    let message = signal.to_emit_message(&bus::NOTIFICATIONS_DBUS_OBJECT.into());

    if connection.send(message).is_err() {
        error!(signal = S::NAME, "Failed to send signal");
    }
}

/// Emits a NotificationActionInvoked signal for the given notification ID and action key.
pub(super) fn emit_notification_action_invoked(id: u32, action_key: &str) {
    emit_signal(interface::OrgFreedesktopNotificationsActionInvoked {
        id,
        action_key: action_key.to_owned(),
    });
}

/// Emits a RecordAdded signal carrying the JSON form of a history record.
pub(super) fn emit_record_added(record: String) {
    emit_signal(interface::OrgFreedesktopNotificationsRecordAdded { record });
}

/// Closes a notification by ID with the given reason.
/// This will emit the NotificationClosed signal with the reason.
pub(super) fn close_notification_by_id(
    notifications_ref: &Arc<RwLock<HashMap<u32, Notification>>>,
    events: &Sender<BusEvent>,
    id: u32,
    reason: NotificationCloseReason,
) -> Result<(), dbus::MethodErr> {
    let mut notifications = notifications_ref.write()
        .map_err(|_| dbus::MethodErr::failed(&"Failed to acquire write lock on notifications"))?;

    if notifications.remove(&id).is_some() {
        send_event(events, BusEvent::NotificationClosed(id));
        emit_signal(interface::OrgFreedesktopNotificationsNotificationClosed {
            id,
            reason: reason as u32,
        });
        Ok(())
    } else {
        Err(dbus::MethodErr::failed(&"Notification ID not found"))
    }
}
