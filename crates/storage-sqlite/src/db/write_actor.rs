use super::DbPool;
use crate::errors::StorageError;
use cmetrack_core::errors::{DatabaseError, Error, Result};
use diesel::SqliteConnection;
use log::error;
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

// A write job runs against the writer's connection and returns a core Result.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;
type ErasedJob = Job<Box<dyn Any + Send + 'static>>;
type Reply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

/// Capacity of the job queue in front of the writer.
const WRITE_QUEUE_SIZE: usize = 1024;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(ErasedJob, Reply)>,
}

impl WriteHandle {
    /// Executes a job on the writer's dedicated connection inside an
    /// immediate transaction. The transaction rolls back if the job fails.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| writer_stopped("the job queue is closed"))?;

        let boxed = ret_rx
            .await
            .map_err(|_| writer_stopped("the reply was dropped"))??;
        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::Unexpected("write job returned an unexpected type".to_string()))
    }
}

fn writer_stopped(reason: &str) -> Error {
    Error::Database(DatabaseError::Internal(format!(
        "database writer stopped: {}",
        reason
    )))
}

/// Spawns the single database writer. The actor holds one pooled connection
/// for its lifetime and runs jobs serially.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(ErasedJob, Reply)>(WRITE_QUEUE_SIZE);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Database writer could not get a connection: {}", e);
                // Dropping the receiver fails every pending and future job.
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(Error::from);

            // The caller may have gone away; the write is committed regardless.
            let _ = reply_tx.send(result);
        }
    });

    WriteHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, get_connection};
    use cmetrack_core::goals::GoalError;
    use diesel::RunQueryDsl;
    use tempfile::tempdir;

    #[derive(diesel::QueryableByName)]
    struct Count {
        #[diesel(sql_type = diesel::sql_types::BigInt)]
        n: i64,
    }

    fn count_rows(pool: &DbPool) -> i64 {
        let mut conn = get_connection(pool).unwrap();
        diesel::sql_query("SELECT COUNT(*) AS n FROM scratch")
            .get_result::<Count>(&mut conn)
            .unwrap()
            .n
    }

    #[tokio::test]
    async fn test_failed_job_rolls_back() {
        let dir = tempdir().unwrap();
        let pool = create_pool(&dir.path().join("w.db").to_string_lossy()).unwrap();
        let writer = spawn_writer((*pool).clone());

        writer
            .exec(|conn| {
                diesel::sql_query("CREATE TABLE scratch (id INTEGER)")
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
            .unwrap();

        let result: Result<()> = writer
            .exec(|conn| {
                diesel::sql_query("INSERT INTO scratch (id) VALUES (1)")
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Err(GoalError::ProfileNotFound("u1".to_string()).into())
            })
            .await;

        assert!(matches!(result, Err(Error::Goal(GoalError::ProfileNotFound(_)))));
        assert_eq!(count_rows(&pool), 0);

        let inserted = writer
            .exec(|conn| {
                diesel::sql_query("INSERT INTO scratch (id) VALUES (2)")
                    .execute(conn)
                    .map_err(StorageError::from)
                    .map_err(Error::from)
            })
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(count_rows(&pool), 1);
    }
}
