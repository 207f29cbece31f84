use std::path::Path;
use rusqlite::Connection;
use async_channel::Sender;

type SqlJob = Box<dyn FnOnce(&mut Connection) + Send>;

/// Owns the SQLite connection on a dedicated thread and runs jobs against it
/// in submission order.
#[derive(Clone)]
pub struct SqlActor {
    tx: Sender<SqlJob>,
}

impl SqlActor {
    /// Opens the database at `path`, creating its parent directory if needed.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("
            PRAGMA journal_mode = WAL;
            PRAGMA wal_autocheckpoint = 500;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ")?;

        Self::spawn(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::spawn(Connection::open_in_memory()?)
    }

    fn spawn(mut conn: Connection) -> anyhow::Result<Self> {
        let (tx, rx) = async_channel::unbounded::<SqlJob>();

        std::thread::Builder::new()
            .name("bubble-notifier-sql".into())
            .spawn(move || {
                while let Ok(job) = rx.recv_blocking() {
                    job(&mut conn);
                }
            })?;

        Ok(Self { tx })
    }

    fn job<F, R>(func: F) -> (SqlJob, async_channel::Receiver<R>)
    where
        F: FnOnce(&mut Connection) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (resp_tx, resp_rx) = async_channel::bounded(1);
        let job = Box::new(move |conn: &mut Connection| {
            let result = func(conn);
            let _ = resp_tx.send_blocking(result);
        });

        (job, resp_rx)
    }

    /// Returns the result of a SQL operation.
    pub async fn with<F, R>(&self, func: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut Connection) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (job, resp_rx) = Self::job(func);

        self.tx.send(job)
            .await
            .map_err(|_| anyhow::anyhow!("DB thread dead"))?;

        resp_rx.recv()
            .await
            .map_err(|_| anyhow::anyhow!("DB query cancelled"))
    }

    /// Same as [`SqlActor::with`], parking the calling thread until the job ran.
    pub fn with_blocking<F, R>(&self, func: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut Connection) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (job, resp_rx) = Self::job(func);

        self.tx.send_blocking(job)
            .map_err(|_| anyhow::anyhow!("DB thread dead"))?;

        resp_rx.recv_blocking()
            .map_err(|_| anyhow::anyhow!("DB query cancelled"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_run_in_order() {
        let actor = SqlActor::open_in_memory().unwrap();
        actor.with_blocking(|conn| conn.execute_batch("CREATE TABLE t (v INTEGER)")).unwrap().unwrap();

        for v in 0..5 {
            actor.with_blocking(move |conn| conn.execute("INSERT INTO t (v) VALUES (?1)", [v])).unwrap().unwrap();
        }

        let values: Vec<i64> = actor.with_blocking(|conn| {
            let mut statement = conn.prepare("SELECT v FROM t ORDER BY rowid")?;
            let rows = statement.query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, rusqlite::Error>(rows)
        }).unwrap().unwrap();

        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn async_jobs_return_results() {
        let actor = SqlActor::open_in_memory().unwrap();
        let value: i64 = actor.with(|conn| conn.query_row("SELECT 40 + 2", [], |row| row.get(0)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(value, 42);
    }
}
