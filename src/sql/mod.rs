pub mod actor;
pub mod wrappers;

use self::actor::SqlActor;

pub const DATABASE_FILE_NAME: &str = "history.db";

pub fn get_database_path() -> std::path::PathBuf {
    std::path::Path::new(&crate::utils::filesystem::get_local_state_directory())
        .join(DATABASE_FILE_NAME)
}

pub async fn init_database(actor: &SqlActor) -> anyhow::Result<()> {
    actor.with(|connection| {
        // Create tables if they do not exist
        connection.execute_batch("
            CREATE TABLE IF NOT EXISTS notification_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                app_name TEXT NOT NULL,
                app_icon TEXT NOT NULL,
                summary TEXT NOT NULL,
                body TEXT NOT NULL,
                hyperlinks TEXT NOT NULL DEFAULT '[]',
                actions TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS notification_history_created_at
                ON notification_history (created_at);
        ")
    }).await??;

    Ok(())
}
