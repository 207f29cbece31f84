pub mod item;

use std::sync::Arc;
use futures_signals::signal::{Mutable, Signal};
use futures_signals::signal_vec::MutableVec;

use crate::format::Message;
use crate::intake::TrayIndicator;

/// Entries kept for the tooltip; the count keeps going past this.
pub const MAX_UNREAD_ENTRIES: usize = 50;

/// Unread notifications shown by the tray icon.
#[derive(Clone, Default)]
pub struct UnreadTray {
    unread: Arc<MutableVec<(String, Message)>>,
    count: Mutable<usize>,
}

impl UnreadTray {
    pub fn count(&self) -> usize {
        self.count.get()
    }

    pub fn signal(&self) -> impl Signal<Item = usize> + Send + 'static {
        self.count.signal()
    }

    pub fn unread(&self) -> Vec<(String, Message)> {
        self.unread.lock_ref().to_vec()
    }

    pub fn mark_all_read(&self) {
        self.unread.lock_mut().clear();
        self.count.set(0);
    }
}

impl TrayIndicator for UnreadTray {
    fn increase_unread(&self, entry: (String, Message)) -> anyhow::Result<()> {
        let mut unread = self.unread.lock_mut();
        if unread.len() >= MAX_UNREAD_ENTRIES {
            unread.remove(0);
        }
        unread.push_cloned(entry);
        drop(unread);

        self.count.replace_with(|count| *count + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::tests::message;

    #[test]
    fn unread_entries_accumulate_until_read() {
        let tray = UnreadTray::default();
        tray.increase_unread(("2024/01/01-00:00:00".to_owned(), message(1, "a", 0))).unwrap();
        tray.increase_unread(("2024/01/01-00:00:01".to_owned(), message(2, "b", 1))).unwrap();

        assert_eq!(tray.count(), 2);
        let unread = tray.unread();
        assert_eq!(unread[0].0, "2024/01/01-00:00:00");
        assert_eq!(unread[1].1.app_name, "b");

        tray.mark_all_read();
        assert_eq!(tray.count(), 0);
        assert!(tray.unread().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let tray = UnreadTray::default();
        let handle = tray.clone();

        handle.increase_unread(("t".to_owned(), message(1, "a", 0))).unwrap();
        assert_eq!(tray.count(), 1);
    }

    #[test]
    fn entries_are_capped_but_count_is_not() {
        let tray = UnreadTray::default();
        for id in 0..(MAX_UNREAD_ENTRIES as u32 + 10) {
            tray.increase_unread((format!("t{id}"), message(id, "a", 0))).unwrap();
        }

        let unread = tray.unread();
        assert_eq!(tray.count(), MAX_UNREAD_ENTRIES + 10);
        assert_eq!(unread.len(), MAX_UNREAD_ENTRIES);
        assert_eq!(unread[0].0, "t10");
        assert_eq!(unread[MAX_UNREAD_ENTRIES - 1].1.id, MAX_UNREAD_ENTRIES as u32 + 9);
    }
}
