//! Bounded connection pool for the fingerprint store.
//!
//! Mirrors the reference implementation's `queue.Queue(maxsize=pool_size)`
//! cursor pool: a fixed number of connections are lazily established, handed
//! out on borrow, pinged and replaced if dead, and always returned to the
//! queue regardless of how the borrowing scope exits.

use std::collections::VecDeque;
use std::sync::Mutex;

use diesel::connection::Connection;
use diesel::mysql::MysqlConnection;
use diesel::RunQueryDsl;

use crate::config::StoreConfig;
use crate::error::{Error, Result};

pub struct Pool {
    database_url: String,
    size: usize,
    idle: Mutex<VecDeque<MysqlConnection>>,
}

impl Pool {
    pub fn new(cfg: &StoreConfig) -> Result<Self> {
        cfg.validate()?;
        let pool = Pool {
            database_url: cfg.database_url.clone(),
            size: cfg.pool_size,
            idle: Mutex::new(VecDeque::with_capacity(cfg.pool_size)),
        };
        for _ in 0..pool.size {
            let conn = pool.establish()?;
            pool.idle.lock().unwrap().push_back(conn);
        }
        Ok(pool)
    }

    fn establish(&self) -> Result<MysqlConnection> {
        MysqlConnection::establish(&self.database_url).map_err(Error::from)
    }

    /// Borrows a connection from the pool, pinging it first and
    /// transparently re-establishing it if the ping fails (a connection can
    /// go stale behind a load balancer or idle timeout).
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        let mut conn = {
            let mut idle = self.idle.lock().unwrap();
            idle.pop_front()
        }
        .map_or_else(|| self.establish(), Ok)?;

        if diesel::sql_query("SELECT 1").execute(&mut conn).is_err() {
            conn = self.establish()?;
        }

        Ok(PooledConnection {
            pool: self,
            conn: Some(conn),
        })
    }

    /// Drops every idle connection without closing them gracefully,
    /// matching the reference pool's `before_fork`/`after_fork` discard —
    /// connections are not valid to share across a process fork.
    pub fn after_fork(&self) {
        self.idle.lock().unwrap().clear();
    }
}

pub struct PooledConnection<'a> {
    pool: &'a Pool,
    conn: Option<MysqlConnection>,
}

impl<'a> std::ops::Deref for PooledConnection<'a> {
    type Target = MysqlConnection;
    fn deref(&self) -> &MysqlConnection {
        self.conn.as_ref().expect("connection taken before drop")
    }
}

impl<'a> std::ops::DerefMut for PooledConnection<'a> {
    fn deref_mut(&mut self) -> &mut MysqlConnection {
        self.conn.as_mut().expect("connection taken before drop")
    }
}

impl<'a> Drop for PooledConnection<'a> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let mut idle = self.pool.idle.lock().unwrap();
            if idle.len() < self.pool.size {
                idle.push_back(conn);
            }
        }
    }
}
