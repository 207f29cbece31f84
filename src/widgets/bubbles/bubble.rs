use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use gtk4::prelude::*;
use gtk4_layer_shell::{Edge, Layer, LayerShell as _};
use relm4::RelmRemoveAllExt as _;
use relm4::view;

use crate::format::Message;
use crate::intake::Bubble;
use crate::notifications;
use crate::notifications::wrapper::{NotificationAction, NotificationCloseReason};
use crate::timeout::Timeout;
use crate::utils::{gesture, process};

pub const BUBBLE_WIDTH: i32 = 300;
pub const EDGE_MARGIN: i32 = 20;
const ICON_SIZE: i32 = 48;
const ACTION_HINT_PREFIX: &str = "x-deepin-action-";

/// Where the bubble icon comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconReference {
    File(String),
    Themed(String),
}

/// `image-path` wins over `app_icon`; paths and `file://` URIs load from disk.
pub fn icon_reference(message: &Message) -> Option<IconReference> {
    let source = message.hints.get("image-path")
        .filter(|path| !path.is_empty())
        .unwrap_or(&message.app_icon);

    if source.is_empty() {
        None
    } else if let Some(path) = source.strip_prefix("file://") {
        Some(IconReference::File(path.to_owned()))
    } else if source.starts_with('/') {
        Some(IconReference::File(source.clone()))
    } else {
        Some(IconReference::Themed(source.clone()))
    }
}

pub fn expire_duration(message: &Message, default_ms: u64) -> Duration {
    match u64::try_from(message.expire_timeout) {
        Ok(ms) if ms > 0 => Duration::from_millis(ms),
        _ => Duration::from_millis(default_ms),
    }
}

type CloseHandler = Rc<dyn Fn(u32, Option<NotificationCloseReason>)>;

#[derive(Clone)]
pub struct BubbleWidget {
    pub id: u32,
    pub window: gtk4::ApplicationWindow,
    pub message: Rc<RefCell<Message>>,
    pub height: Rc<Cell<i32>>,
    pub offset: Rc<Cell<i32>>,
    hovered: Rc<Cell<bool>>,
    closed: Rc<Cell<bool>>,
    expiry: Timeout,
    icon: gtk4::Image,
    summary: gtk4::Label,
    body: gtk4::Label,
    links_box: gtk4::Box,
    actions_box: gtk4::Box,
    on_close: CloseHandler,
}

impl BubbleWidget {
    pub fn new<F>(application: &gtk4::Application, bubble: &Bubble, on_close: F) -> Self
    where
        F: Fn(u32, Option<NotificationCloseReason>) + 'static,
    {
        view! {
            icon = gtk4::Image {
                set_css_classes: &["bubble-icon"],
                set_pixel_size: ICON_SIZE,
                set_valign: gtk4::Align::Start,
            },

            summary = gtk4::Label {
                set_css_classes: &["bubble-summary"],
                set_xalign: 0.0,
                set_hexpand: true,
                set_ellipsize: gtk4::pango::EllipsizeMode::End,
            },

            close_button = gtk4::Button {
                set_css_classes: &["bubble-close"],
                set_icon_name: "window-close-symbolic",
                set_valign: gtk4::Align::Start,
            },

            header = gtk4::Box {
                set_orientation: gtk4::Orientation::Horizontal,
                set_spacing: 4,
                append: &summary,
                append: &close_button,
            },

            body = gtk4::Label {
                set_css_classes: &["bubble-body"],
                set_xalign: 0.0,
                set_hexpand: true,
                set_wrap: true,
                set_wrap_mode: gtk4::pango::WrapMode::WordChar,
                set_lines: 2,
                set_ellipsize: gtk4::pango::EllipsizeMode::End,
            },

            links_box = gtk4::Box {
                set_css_classes: &["bubble-links"],
                set_orientation: gtk4::Orientation::Horizontal,
                set_spacing: 2,
            },

            content = gtk4::Box {
                set_css_classes: &["bubble-content"],
                set_orientation: gtk4::Orientation::Vertical,
                set_spacing: 2,
                set_hexpand: true,
                append: &header,
                append: &body,
                append: &links_box,
            },

            main = gtk4::Box {
                set_orientation: gtk4::Orientation::Horizontal,
                set_spacing: 8,
                append: &icon,
                append: &content,
            },

            actions_box = gtk4::Box {
                set_css_classes: &["bubble-actions"],
                set_orientation: gtk4::Orientation::Horizontal,
                set_homogeneous: true,
                set_spacing: 4,
            },

            root = gtk4::Box {
                set_css_classes: &["bubble"],
                set_orientation: gtk4::Orientation::Vertical,
                set_spacing: 4,
                append: &main,
                append: &actions_box,
            },

            window = gtk4::ApplicationWindow {
                set_css_classes: &["bubble-window"],
                set_application: Some(application),
                init_layer_shell: (),
                set_layer: Layer::Overlay,
                set_anchor: (Edge::Top, true),
                set_anchor: (Edge::Right, true),
                set_margin: (Edge::Right, EDGE_MARGIN),
                set_namespace: Some("bubble-notifier"),
                set_default_size: (BUBBLE_WIDTH, bubble.height),
                set_child: Some(&root),
            }
        }

        let me = BubbleWidget {
            id: bubble.id,
            window,
            message: Rc::new(RefCell::new(bubble.message.clone())),
            height: Rc::new(Cell::new(bubble.height)),
            offset: Rc::new(Cell::new(0)),
            hovered: Rc::new(Cell::new(false)),
            closed: Rc::new(Cell::new(false)),
            expiry: Timeout::default(),
            icon,
            summary,
            body,
            links_box,
            actions_box,
            on_close: Rc::new(on_close),
        };

        me.fill(bubble);
        me.set_offset(0);

        close_button.connect_clicked({
            let me = me.clone();
            move |_| me.close(Some(NotificationCloseReason::Dismissed))
        });

        root.add_controller(gesture::on_primary_up({
            let me = me.clone();
            move |_, _, _| me.close(Some(NotificationCloseReason::Dismissed))
        }));

        root.add_controller(gesture::on_enter({
            let hovered = me.hovered.clone();
            move |_, _| hovered.set(true)
        }));

        root.add_controller(gesture::on_leave({
            let hovered = me.hovered.clone();
            move || hovered.set(false)
        }));

        me
    }

    fn fill(&self, bubble: &Bubble) {
        let message = &bubble.message;

        match icon_reference(message) {
            Some(IconReference::File(path)) => self.icon.set_from_file(Some(path)),
            Some(IconReference::Themed(name)) => self.icon.set_icon_name(Some(&name)),
            None => self.icon.set_icon_name(Some("dialog-information-symbolic")),
        }

        self.summary.set_label(&message.summary);
        self.summary.set_tooltip_text(Some(&bubble.created_at));

        // Clients are not trusted to send valid markup
        if gtk4::pango::parse_markup(&message.body, '\0').is_ok() {
            self.body.set_markup(&message.body);
        } else {
            self.body.set_text(&message.body);
        }

        self.links_box.remove_all();
        for uri in &message.hyperlinks {
            let link = gtk4::LinkButton::with_label(uri, uri);
            link.set_css_classes(&["bubble-link"]);
            self.links_box.append(&link);
        }
        self.links_box.set_visible(!message.hyperlinks.is_empty());

        self.actions_box.remove_all();
        for action in &message.actions {
            self.actions_box.append(&self.make_action_button(action));
        }
        self.actions_box.set_visible(!message.actions.is_empty());

        self.window.set_default_size(BUBBLE_WIDTH, bubble.height);
    }

    fn make_action_button(&self, action: &NotificationAction) -> gtk4::Button {
        let button = gtk4::Button::with_label(&action.localized_name);
        button.set_css_classes(&["bubble-action-button"]);
        button.connect_clicked({
            let me = self.clone();
            let action_id = action.id.clone();
            move |_| {
                notifications::invoke_notification_action(me.id, &action_id);
                me.run_action_hint(&action_id);
                me.close(Some(NotificationCloseReason::Dismissed));
            }
        });

        button
    }

    fn run_action_hint(&self, action_id: &str) {
        let message = self.message.borrow();
        let Some(value) = message.hints.get(&format!("{ACTION_HINT_PREFIX}{action_id}")) else {
            return;
        };

        let Some((program, args)) = process::parse_action_command(value) else {
            warn!(id = self.id, action_id, "Empty action command hint");
            return;
        };

        if let Err(err) = process::launch_detached(&program, &args) {
            warn!(%err, %program, "Failed to launch action command");
        }
    }

    pub fn set_offset(&self, offset: i32) {
        self.offset.set(offset);
        self.window.set_margin(Edge::Top, EDGE_MARGIN + offset);
    }

    pub fn present(&self, expire_after: Duration) {
        self.window.present();
        self.arm_expiry(expire_after);
    }

    /// Re-armed for as long as the pointer rests on the bubble.
    fn arm_expiry(&self, expire_after: Duration) {
        let me = self.clone();
        self.expiry.set(expire_after, move || {
            if me.hovered.get() {
                me.arm_expiry(expire_after);
            } else {
                me.close(Some(NotificationCloseReason::Expired));
            }
        });
    }

    /// Swaps in new content, restarts expiry and returns the height change.
    pub fn update(&self, bubble: &Bubble, expire_after: Duration) -> i32 {
        self.message.replace(bubble.message.clone());
        self.fill(bubble);

        let delta = bubble.height - self.height.replace(bubble.height);
        self.arm_expiry(expire_after);
        delta
    }

    /// `None` closes silently, when the server already knows.
    pub fn close(&self, reason: Option<NotificationCloseReason>) {
        if self.closed.replace(true) {
            return;
        }

        self.expiry.clear();
        self.window.close();
        (self.on_close)(self.id, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::tests::message;

    #[test]
    fn image_path_hint_wins() {
        let mut message = message(1, "app", 0);
        message.app_icon = "mail-unread".to_owned();
        message.hints.insert("image-path".to_owned(), "file:///tmp/avatar.png".to_owned());

        assert_eq!(icon_reference(&message), Some(IconReference::File("/tmp/avatar.png".to_owned())));
    }

    #[test]
    fn app_icon_name_or_path() {
        let mut message = message(1, "app", 0);
        message.app_icon = "mail-unread".to_owned();
        assert_eq!(icon_reference(&message), Some(IconReference::Themed("mail-unread".to_owned())));

        message.app_icon = "/usr/share/icons/app.svg".to_owned();
        assert_eq!(icon_reference(&message), Some(IconReference::File("/usr/share/icons/app.svg".to_owned())));

        message.app_icon.clear();
        assert_eq!(icon_reference(&message), None);
    }

    #[test]
    fn client_timeout_overrides_default() {
        let mut message = message(1, "app", 0);

        message.expire_timeout = 1200;
        assert_eq!(expire_duration(&message, 5000), Duration::from_millis(1200));

        message.expire_timeout = -1;
        assert_eq!(expire_duration(&message, 5000), Duration::from_millis(5000));

        message.expire_timeout = 0;
        assert_eq!(expire_duration(&message, 5000), Duration::from_millis(5000));
    }
}
