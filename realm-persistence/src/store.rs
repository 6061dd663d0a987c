//! Thin typed wrapper over a pooled `redis` connection (`spec.md` §4.9).
//! The teacher's networking layer has nothing resembling a KV store, so
//! this is new code, but it keeps the teacher's habit of a single
//! small struct owning a connection resource plus a `Logger`
//! (compare `lib/flux/src/session.rs`).

use r2d2::Pool;
use realm_shared::error::PersistenceError;
use redis::{Commands, Value};

pub type Pipeline = redis::Pipeline;

#[derive(Clone)]
pub struct Store {
    pool: Pool<redis::Client>,
}

fn classify(err: redis::RedisError) -> PersistenceError {
    if err.is_connection_dropped() || err.is_timeout() || err.is_io_error() {
        PersistenceError::Transient(err.to_string())
    } else {
        PersistenceError::Permanent(err.to_string())
    }
}

impl Store {
    pub fn connect_from_config(cfg: &realm_shared::config::PersistenceSection) -> Result<Store, PersistenceError> {
        let url = format!("redis://{}:{}/{}", cfg.kv_host, cfg.kv_port, cfg.kv_db);
        Store::connect(&url)
    }

    pub fn connect(url: &str) -> Result<Store, PersistenceError> {
        let client = redis::Client::open(url).map_err(classify)?;
        let pool = Pool::builder()
            .build(client)
            .map_err(|e| PersistenceError::Transient(e.to_string()))?;
        Ok(Store { pool })
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<redis::Client>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::Transient(e.to_string()))
    }

    /// Atomically increments `key` and returns the new value. Used for
    /// the account id sequence (`accounts:counter`).
    pub fn incr(&self, key: &str, by: i64) -> Result<i64, PersistenceError> {
        let mut conn = self.conn()?;
        conn.incr(key, by).map_err(classify)
    }

    pub fn hget(&self, key: &str, field: &str) -> Result<Option<String>, PersistenceError> {
        let mut conn = self.conn()?;
        conn.hget(key, field).map_err(classify)
    }

    pub fn hget_all(&self, key: &str) -> Result<hashbrown::HashMap<String, String>, PersistenceError> {
        let mut conn = self.conn()?;
        let pairs: Vec<(String, String)> = conn.hgetall(key).map_err(classify)?;
        Ok(pairs.into_iter().collect())
    }

    pub fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn()?;
        let _: () = conn.hset(key, field, value).map_err(classify)?;
        Ok(())
    }

    pub fn hdel(&self, key: &str, field: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn()?;
        let _: () = conn.hdel(key, field).map_err(classify)?;
        Ok(())
    }

    pub fn hincr(&self, key: &str, field: &str, by: i64) -> Result<i64, PersistenceError> {
        let mut conn = self.conn()?;
        conn.hincr(key, field, by).map_err(classify)
    }

    pub fn sadd(&self, key: &str, member: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn()?;
        let _: () = conn.sadd(key, member).map_err(classify)?;
        Ok(())
    }

    pub fn srem(&self, key: &str, member: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn()?;
        let _: () = conn.srem(key, member).map_err(classify)?;
        Ok(())
    }

    pub fn smembers(&self, key: &str) -> Result<Vec<String>, PersistenceError> {
        let mut conn = self.conn()?;
        conn.smembers(key).map_err(classify)
    }

    pub fn exists(&self, key: &str) -> Result<bool, PersistenceError> {
        let mut conn = self.conn()?;
        conn.exists(key).map_err(classify)
    }

    pub fn del(&self, key: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn()?;
        let _: () = conn.del(key).map_err(classify)?;
        Ok(())
    }

    /// Runs a caller-built pipeline atomically.
    pub fn run_pipeline(&self, pipeline: &Pipeline) -> Result<Vec<Value>, PersistenceError> {
        let mut conn = self.conn()?;
        pipeline.query(&mut *conn).map_err(classify)
    }

    /// Moves `qty` from `(from_key, from_field)` to `(to_key, to_field)`
    /// depositing first and removing second, compensating the deposit
    /// if the removal fails (`spec.md` §4.9 transactional discipline).
    /// Callers validate sufficient balance before calling this; it only
    /// guards against store-level failure between the two writes.
    pub fn transfer_stackable(
        &self,
        from_key: &str,
        from_field: &str,
        to_key: &str,
        to_field: &str,
        qty: i64,
    ) -> Result<(), PersistenceError> {
        self.hincr(to_key, to_field, qty)?;

        match self.hincr(from_key, from_field, -qty) {
            Ok(_) => Ok(()),
            Err(remove_err) => {
                // Best effort compensation; if this also fails the
                // store is in real trouble and the error propagates.
                self.hincr(to_key, to_field, -qty)?;
                Err(remove_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_malformed_url() {
        assert!(Store::connect("not a url").is_err());
    }
}
