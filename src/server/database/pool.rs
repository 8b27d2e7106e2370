use crate::server::database::connection::Connection;
use anyhow::{bail, Error};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time;
use tokio_postgres::{Client, NoTls};

pub(crate) struct CommonPool<M> {
    /// pool name, for logs
    name: String,
    slots: Vec<Arc<Mutex<M>>>,
    /// one permit per slot, so holding a permit guarantees a free slot
    permits: Arc<Semaphore>,
}

/// Fixed-size pool of database clients.
pub(crate) struct Pool<M>(Arc<CommonPool<M>>);

impl<M> Clone for Pool<M> {
    fn clone(&self) -> Pool<M> {
        Pool(self.0.clone())
    }
}

impl<M: Send + 'static> Pool<M> {
    pub fn from_clients(name: &str, clients: Vec<M>) -> Self {
        let permits = Arc::new(Semaphore::new(clients.len()));
        Self(Arc::new(CommonPool {
            name: name.to_string(),
            slots: clients.into_iter().map(|c| Arc::new(Mutex::new(c))).collect(),
            permits,
        }))
    }

    pub fn size(&self) -> usize {
        self.0.slots.len()
    }

    /// acquire a connection, bail out with `None` once `timeout` elapses.
    /// The connection goes back to the pool when dropped.
    pub async fn acquire(&self, timeout: Duration) -> Option<Connection<M>> {
        let permit = match time::timeout(timeout, self.0.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(e)) => {
                error!("pool {} is closed, {}", self.0.name, e);
                return None;
            }
            Err(_) => {
                error!(
                    "timed out to acquire a connection from pool {} after {} ms",
                    self.0.name,
                    timeout.as_millis()
                );
                return None;
            }
        };
        self.0
            .slots
            .iter()
            .find_map(|slot| slot.clone().try_lock_owned().ok())
            .map(|guard| Connection::new(guard, permit))
    }
}

impl Pool<Client> {
    /// open `size` connections concurrently; fails if none could be established
    pub async fn connect(name: &str, conn_str: &str, size: usize) -> Result<Self, Error> {
        let mut set = JoinSet::new();
        for _ in 0..size {
            let conn_str = conn_str.to_string();
            set.spawn(async move {
                let (client, conn) = tokio_postgres::connect(&conn_str, NoTls).await?;
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!("connection returned error and aborted, {}", e);
                    }
                });
                Ok::<_, tokio_postgres::Error>(client)
            });
        }
        let mut clients = Vec::with_capacity(size);
        while let Some(res) = set.join_next().await {
            match res {
                Ok(Ok(client)) => clients.push(client),
                Ok(Err(e)) => error!("failed to open connection for pool {}, {}", name, e),
                Err(e) => error!("join_next failed when joining, {}", e),
            }
        }
        if clients.is_empty() {
            bail!("pool {name} could not open any connection");
        }
        let pool = Self::from_clients(name, clients);
        info!("pool {} created with {} of {} connections", name, pool.size(), size);
        Ok(pool)
    }
}
