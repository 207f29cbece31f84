use std::sync::Arc;
use std::time::Duration;
use dbus::message::MatchRule;
use dbus::nonblock::{Proxy, SyncConnection};
use dbus::channel::{MatchingReceiver as _, Sender as _};
use dbus_crossroads::{Crossroads, IfaceBuilder, IfaceToken};
use dbus_tokio::connection;
use futures_signals::signal::SignalExt as _;

use super::UnreadTray;

pub const ITEM_DBUS_OBJECT: &str = "/StatusNotifierItem";
pub const ITEM_DBUS_INTERFACE: &str = "org.kde.StatusNotifierItem";
pub const WATCHER_DBUS_BUS: &str = "org.kde.StatusNotifierWatcher";
pub const WATCHER_DBUS_OBJECT: &str = "/StatusNotifierWatcher";

const ICON_IDLE: &str = "notification-symbolic";
const ICON_UNREAD: &str = "notification-new-symbolic";

type ToolTip = (String, Vec<(i32, i32, Vec<u8>)>, String, String);

/// https://www.freedesktop.org/wiki/Specifications/StatusNotifierItem/StatusNotifierItem/
#[derive(Clone)]
pub struct TrayItem {
    tray: UnreadTray,
}

impl TrayItem {
    pub fn new(tray: UnreadTray) -> Self {
        TrayItem { tray }
    }

    pub fn title(&self) -> String {
        match self.tray.count() {
            0 => "No unread notifications".to_owned(),
            1 => "1 unread notification".to_owned(),
            count => format!("{count} unread notifications"),
        }
    }

    pub fn status(&self) -> &'static str {
        if self.tray.count() > 0 { "NeedsAttention" } else { "Active" }
    }

    pub fn icon_name(&self) -> &'static str {
        if self.tray.count() > 0 { ICON_UNREAD } else { ICON_IDLE }
    }

    pub fn tool_tip(&self) -> ToolTip {
        let description = self.tray.unread()
            .iter()
            .rev()
            .take(5)
            .map(|(created_at, message)| format!("{created_at} {}: {}", message.app_name, message.summary))
            .collect::<Vec<_>>()
            .join("\n");

        (self.icon_name().to_owned(), Vec::new(), self.title(), description)
    }

    pub fn activate(&self) {
        self.tray.mark_all_read();
    }
}

pub fn register_org_kde_status_notifier_item(cr: &mut Crossroads) -> IfaceToken<TrayItem> {
    cr.register(ITEM_DBUS_INTERFACE, |b: &mut IfaceBuilder<TrayItem>| {
        b.signal::<(), _>("NewTitle", ());
        b.signal::<(), _>("NewIcon", ());
        b.signal::<(), _>("NewToolTip", ());
        b.signal::<(String,), _>("NewStatus", ("status",));

        b.property("Category").get(|_, _| Ok("Communications".to_owned()));
        b.property("Id").get(|_, _| Ok(env!("CARGO_PKG_NAME").to_owned()));
        b.property("Title").get(|_, t: &mut TrayItem| Ok(t.title()));
        b.property("Status").get(|_, t: &mut TrayItem| Ok(t.status().to_owned()));
        b.property("IconName").get(|_, t: &mut TrayItem| Ok(t.icon_name().to_owned()));
        b.property("ToolTip").get(|_, t: &mut TrayItem| Ok(t.tool_tip()));
        b.property("ItemIsMenu").get(|_, _| Ok(false));

        b.method("Activate", ("x", "y",), (), |_, t: &mut TrayItem, (_x, _y,): (i32, i32,)| {
            t.activate();
            Ok(())
        });

        b.method("SecondaryActivate", ("x", "y",), (), |_, t: &mut TrayItem, (_x, _y,): (i32, i32,)| {
            t.activate();
            Ok(())
        });

        b.method("ContextMenu", ("x", "y",), (), |_, _, (_x, _y,): (i32, i32,)| Ok(()));
        b.method("Scroll", ("delta", "orientation",), (), |_, _, (_delta, _orientation,): (i32, String,)| Ok(()));
    })
}

fn emit(connection: &SyncConnection, member: &'static str, status: Option<&str>) {
    let mut signal = dbus::Message::signal(
        &ITEM_DBUS_OBJECT.into(),
        &ITEM_DBUS_INTERFACE.into(),
        &member.into(),
    );

    if let Some(status) = status {
        signal = signal.append1(status);
    }

    if connection.send(signal).is_err() {
        error!(member, "Failed to send tray signal");
    }
}

/// Exports the tray item on its own session connection and registers it with
/// the StatusNotifierWatcher. Keeps the exported state in sync with the
/// unread count until the process exits.
pub async fn serve(tray: UnreadTray) -> Result<(), dbus::Error> {
    let (resource, connection): (_, Arc<SyncConnection>) = connection::new_session_sync()?;

    tokio::spawn(async move {
        let err = resource.await;
        error!(%err, "Lost tray connection to D-Bus");
    });

    let item = TrayItem::new(tray.clone());
    let mut crossroads = Crossroads::new();
    let token = register_org_kde_status_notifier_item(&mut crossroads);
    crossroads.insert(ITEM_DBUS_OBJECT, &[token], item.clone());

    connection.start_receive(
        MatchRule::new_method_call(),
        Box::new(move |msg, conn| {
            let _ = crossroads.handle_message(msg, conn);
            true
        }),
    );

    let watcher = Proxy::new(WATCHER_DBUS_BUS, WATCHER_DBUS_OBJECT, Duration::from_secs(2), connection.clone());
    let service = connection.unique_name().to_string();
    let registration: Result<(), dbus::Error> = watcher
        .method_call(WATCHER_DBUS_BUS, "RegisterStatusNotifierItem", (service.clone(),))
        .await;

    match registration {
        Ok(()) => info!(%service, "Registered tray item"),
        Err(err) => warn!(%err, "No StatusNotifierWatcher available, tray icon will not be shown"),
    }

    tokio::spawn(crate::signal!(tray, (count) {
        debug!(count, "Unread count changed");
        emit(&connection, "NewTitle", None);
        emit(&connection, "NewIcon", None);
        emit(&connection, "NewToolTip", None);
        emit(&connection, "NewStatus", Some(item.status()));
    }));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::TrayIndicator as _;
    use crate::intake::tests::message;

    #[test]
    fn idle_item() {
        let item = TrayItem::new(UnreadTray::default());
        assert_eq!(item.title(), "No unread notifications");
        assert_eq!(item.status(), "Active");
        assert_eq!(item.icon_name(), ICON_IDLE);
        assert!(item.tool_tip().3.is_empty());
    }

    #[test]
    fn unread_item_needs_attention_until_activated() {
        let tray = UnreadTray::default();
        let item = TrayItem::new(tray.clone());

        tray.increase_unread(("2024/01/01-09:00:00".to_owned(), message(1, "mail", 0))).unwrap();
        tray.increase_unread(("2024/01/01-09:00:05".to_owned(), message(2, "chat", 0))).unwrap();

        assert_eq!(item.title(), "2 unread notifications");
        assert_eq!(item.status(), "NeedsAttention");
        assert_eq!(item.icon_name(), ICON_UNREAD);

        let description = item.tool_tip().3;
        assert_eq!(description, "2024/01/01-09:00:05 chat: summary 2\n2024/01/01-09:00:00 mail: summary 1");

        item.activate();
        assert_eq!(tray.count(), 0);
        assert_eq!(item.status(), "Active");
    }
}
