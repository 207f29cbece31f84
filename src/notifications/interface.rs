use dbus::arg;
use dbus_crossroads::{Crossroads, IfaceBuilder, IfaceToken};

use super::bus::NOTIFICATIONS_DBUS_INTERFACE;

pub trait OrgFreedesktopNotifications {
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &mut self,
        app_name: String,
        replaces_id: u32,
        app_icon: String,
        summary: String,
        body: String,
        actions: Vec<String>,
        hints: arg::PropMap,
        expire_timeout: i32,
    ) -> Result<u32, dbus::MethodErr>;
    fn close_notification(&mut self, id: u32) -> Result<(), dbus::MethodErr>;
    fn get_capabilities(&mut self) -> Result<Vec<String>, dbus::MethodErr>;
    fn get_server_information(&mut self) -> Result<(String, String, String, String), dbus::MethodErr>;

    // History extensions
    fn get_all_records(&mut self) -> Result<String, dbus::MethodErr>;
    fn remove_record(&mut self, id: String) -> Result<(), dbus::MethodErr>;
    fn clear_records(&mut self) -> Result<(), dbus::MethodErr>;
}

#[derive(Debug)]
pub struct OrgFreedesktopNotificationsNotificationClosed {
    pub id: u32,
    pub reason: u32,
}

impl arg::AppendAll for OrgFreedesktopNotificationsNotificationClosed {
    fn append(&self, i: &mut arg::IterAppend) {
        arg::RefArg::append(&self.id, i);
        arg::RefArg::append(&self.reason, i);
    }
}

impl arg::ReadAll for OrgFreedesktopNotificationsNotificationClosed {
    fn read(i: &mut arg::Iter) -> Result<Self, arg::TypeMismatchError> {
        Ok(OrgFreedesktopNotificationsNotificationClosed {
            id: i.read()?,
            reason: i.read()?,
        })
    }
}

impl dbus::message::SignalArgs for OrgFreedesktopNotificationsNotificationClosed {
    const NAME: &'static str = "NotificationClosed";
    const INTERFACE: &'static str = NOTIFICATIONS_DBUS_INTERFACE;
}

#[derive(Debug)]
pub struct OrgFreedesktopNotificationsActionInvoked {
    pub id: u32,
    pub action_key: String,
}

impl arg::AppendAll for OrgFreedesktopNotificationsActionInvoked {
    fn append(&self, i: &mut arg::IterAppend) {
        arg::RefArg::append(&self.id, i);
        arg::RefArg::append(&self.action_key, i);
    }
}

impl arg::ReadAll for OrgFreedesktopNotificationsActionInvoked {
    fn read(i: &mut arg::Iter) -> Result<Self, arg::TypeMismatchError> {
        Ok(OrgFreedesktopNotificationsActionInvoked {
            id: i.read()?,
            action_key: i.read()?,
        })
    }
}

impl dbus::message::SignalArgs for OrgFreedesktopNotificationsActionInvoked {
    const NAME: &'static str = "ActionInvoked";
    const INTERFACE: &'static str = NOTIFICATIONS_DBUS_INTERFACE;
}

#[derive(Debug)]
pub struct OrgFreedesktopNotificationsRecordAdded {
    pub record: String,
}

impl arg::AppendAll for OrgFreedesktopNotificationsRecordAdded {
    fn append(&self, i: &mut arg::IterAppend) {
        arg::RefArg::append(&self.record, i);
    }
}

impl arg::ReadAll for OrgFreedesktopNotificationsRecordAdded {
    fn read(i: &mut arg::Iter) -> Result<Self, arg::TypeMismatchError> {
        Ok(OrgFreedesktopNotificationsRecordAdded {
            record: i.read()?,
        })
    }
}

impl dbus::message::SignalArgs for OrgFreedesktopNotificationsRecordAdded {
    const NAME: &'static str = "RecordAdded";
    const INTERFACE: &'static str = NOTIFICATIONS_DBUS_INTERFACE;
}

pub fn register_org_freedesktop_notifications<T>(cr: &mut Crossroads) -> IfaceToken<T>
where
    T: OrgFreedesktopNotifications + Send + 'static,
{
    cr.register(NOTIFICATIONS_DBUS_INTERFACE, |b: &mut IfaceBuilder<T>| {
        b.signal::<(u32, u32,), _>("NotificationClosed", ("id", "reason",));
        b.signal::<(u32, String,), _>("ActionInvoked", ("id", "action_key",));
        b.signal::<(String,), _>("RecordAdded", ("record",));

        b.method(
            "Notify",
            ("app_name", "replaces_id", "app_icon", "summary", "body", "actions", "hints", "expire_timeout",),
            ("id",),
            |_, t: &mut T, (app_name, replaces_id, app_icon, summary, body, actions, hints, expire_timeout,): (String, u32, String, String, String, Vec<String>, arg::PropMap, i32,)| {
                t.notify(app_name, replaces_id, app_icon, summary, body, actions, hints, expire_timeout)
                    .map(|x| (x,))
            },
        );

        b.method("CloseNotification", ("id",), (), |_, t: &mut T, (id,): (u32,)| {
            t.close_notification(id)
        });

        b.method("GetCapabilities", (), ("capabilities",), |_, t: &mut T, ()| {
            t.get_capabilities().map(|x| (x,))
        });

        b.method("GetServerInformation", (), ("name", "vendor", "version", "spec_version",), |_, t: &mut T, ()| {
            t.get_server_information()
        });

        b.method("GetAllRecords", (), ("records",), |_, t: &mut T, ()| {
            t.get_all_records().map(|x| (x,))
        });

        b.method("RemoveRecord", ("id",), (), |_, t: &mut T, (id,): (String,)| {
            t.remove_record(id)
        });

        b.method("ClearRecords", (), (), |_, t: &mut T, ()| {
            t.clear_records()
        });
    })
}
