use async_broadcast::Receiver;
use serde::{Deserialize, Serialize};

use crate::broadcast::BroadcastChannel;
use crate::format::Message;
use crate::intake::HistoryStore;
use crate::sql::actor::SqlActor;

/// One row of the history as published over D-Bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    #[serde(rename = "name")]
    pub app_name: String,
    #[serde(rename = "icon")]
    pub app_icon: String,
    pub summary: String,
    pub body: String,
    #[serde(rename = "time")]
    pub created_at: String,
}

impl HistoryRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(HistoryRecord {
            id: row.get::<_, i64>(0)?.to_string(),
            created_at: row.get(1)?,
            app_name: row.get(2)?,
            app_icon: row.get(3)?,
            summary: row.get(4)?,
            body: row.get(5)?,
        })
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Appends a message to the history and returns the stored record.
pub fn add(actor: &SqlActor, created_at: &str, message: &Message) -> anyhow::Result<HistoryRecord> {
    let hyperlinks = serde_json::to_string(&message.hyperlinks)?;
    let actions = serde_json::to_string(&message.actions)?;
    let mut record = HistoryRecord {
        id: String::new(),
        app_name: message.app_name.clone(),
        app_icon: message.app_icon.clone(),
        summary: message.summary.clone(),
        body: message.body.clone(),
        created_at: created_at.to_owned(),
    };

    let id = actor.with_blocking({
        let record = record.clone();
        move |connection| {
            connection.execute(
                "INSERT INTO notification_history
                    (created_at, app_name, app_icon, summary, body, hyperlinks, actions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record.created_at,
                    record.app_name,
                    record.app_icon,
                    record.summary,
                    record.body,
                    hyperlinks,
                    actions,
                ],
            )?;

            Ok::<_, rusqlite::Error>(connection.last_insert_rowid())
        }
    })??;

    record.id = id.to_string();
    Ok(record)
}

/// Gets every record, oldest first.
pub fn get_all(actor: &SqlActor) -> anyhow::Result<Vec<HistoryRecord>> {
    actor.with_blocking(|connection| {
        let mut statement = connection.prepare(
            "SELECT id, created_at, app_name, app_icon, summary, body
             FROM notification_history ORDER BY id ASC"
        )?;

        let records = statement.query_map([], HistoryRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    })?
}

/// Deletes one record. Returns whether a row was removed.
pub fn remove(actor: &SqlActor, id: i64) -> anyhow::Result<bool> {
    actor.with_blocking(move |connection| {
        let removed = connection.execute("DELETE FROM notification_history WHERE id = ?1", [id])?;
        Ok(removed > 0)
    })?
}

/// Deletes every record and returns how many were removed.
pub fn clear(actor: &SqlActor) -> anyhow::Result<usize> {
    actor.with_blocking(|connection| {
        Ok(connection.execute("DELETE FROM notification_history", [])?)
    })?
}

/// History store that writes through the SQL actor and announces every new
/// record to subscribers.
#[derive(Clone)]
pub struct SqlHistory {
    actor: SqlActor,
    records: BroadcastChannel<HistoryRecord>,
}

impl SqlHistory {
    pub fn new(actor: SqlActor) -> Self {
        SqlHistory {
            actor,
            records: BroadcastChannel::new(32),
        }
    }

    pub fn subscribe(&self) -> Receiver<HistoryRecord> {
        self.records.subscribe()
    }
}

impl HistoryStore for SqlHistory {
    fn add(&self, created_at: &str, message: &Message) -> anyhow::Result<()> {
        let record = add(&self.actor, created_at, message)?;
        debug!(id = %record.id, app = %record.app_name, "Recorded notification");
        self.records.send_now(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use super::*;
    use crate::notifications::wrapper::NotificationAction;

    fn message(summary: &str) -> Message {
        Message {
            id: 1,
            app_name: "chat".to_owned(),
            app_icon: "chat-icon".to_owned(),
            summary: summary.to_owned(),
            body: "hello <u>there</u>".to_owned(),
            hints: HashMap::new(),
            actions: vec![NotificationAction {
                id: "reply".to_owned(),
                localized_name: "Reply".to_owned(),
            }],
            hyperlinks: vec!["https://example.org".to_owned()],
            expire_timeout: -1,
        }
    }

    async fn actor() -> SqlActor {
        let actor = SqlActor::open_in_memory().unwrap();
        crate::sql::init_database(&actor).await.unwrap();
        actor
    }

    #[tokio::test]
    async fn records_come_back_oldest_first() {
        let actor = actor().await;
        add(&actor, "2024/01/02-03:04:05", &message("first")).unwrap();
        add(&actor, "2024/01/02-03:04:06", &message("second")).unwrap();

        let records = get_all(&actor).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].summary, "first");
        assert_eq!(records[0].created_at, "2024/01/02-03:04:05");
        assert_eq!(records[1].summary, "second");
    }

    #[tokio::test]
    async fn extra_columns_are_stored_as_json() {
        let actor = actor().await;
        add(&actor, "2024/01/02-03:04:05", &message("first")).unwrap();

        let (hyperlinks, actions): (String, String) = actor.with_blocking(|connection| {
            connection.query_row(
                "SELECT hyperlinks, actions FROM notification_history",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
        }).unwrap().unwrap();

        assert_eq!(hyperlinks, r#"["https://example.org"]"#);
        assert_eq!(actions, r#"[{"id":"reply","localized_name":"Reply"}]"#);
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let actor = actor().await;
        let first = add(&actor, "2024/01/02-03:04:05", &message("first")).unwrap();
        add(&actor, "2024/01/02-03:04:06", &message("second")).unwrap();
        add(&actor, "2024/01/02-03:04:07", &message("third")).unwrap();

        assert!(remove(&actor, first.id.parse().unwrap()).unwrap());
        assert!(!remove(&actor, 9999).unwrap());
        assert_eq!(get_all(&actor).unwrap().len(), 2);

        assert_eq!(clear(&actor).unwrap(), 2);
        assert!(get_all(&actor).unwrap().is_empty());
    }

    #[test]
    fn record_json_uses_short_keys() {
        let record = HistoryRecord {
            id: "3".to_owned(),
            app_name: "chat".to_owned(),
            app_icon: "chat-icon".to_owned(),
            summary: "s".to_owned(),
            body: "b".to_owned(),
            created_at: "2024/01/02-03:04:05".to_owned(),
        };

        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["id"], "3");
        assert_eq!(value["name"], "chat");
        assert_eq!(value["icon"], "chat-icon");
        assert_eq!(value["time"], "2024/01/02-03:04:05");
    }

    #[tokio::test]
    async fn store_announces_new_records() {
        let history = SqlHistory::new(actor().await);
        let mut receiver = history.subscribe();

        HistoryStore::add(&history, "2024/01/02-03:04:05", &message("first")).unwrap();

        let record = receiver.try_recv().unwrap();
        assert_eq!(record.summary, "first");
        assert_eq!(record.id, "1");
    }
}
