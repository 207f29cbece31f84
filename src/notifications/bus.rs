use super::wrapper::Notification;

pub const NOTIFICATIONS_DBUS_BUS: &str = "org.freedesktop.Notifications";
pub const NOTIFICATIONS_DBUS_OBJECT: &str = "/org/freedesktop/Notifications";
pub const NOTIFICATIONS_DBUS_INTERFACE: &str = "org.freedesktop.Notifications";

#[derive(Debug, Clone)]
pub enum BusEvent {
    NotificationAdded(Notification),
    NotificationUpdated(u32, Notification), // id, updated notification
    NotificationClosed(u32), // id
}
