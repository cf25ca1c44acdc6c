//! Server singleton store.

use crate::access::{encode, load};
use crate::context::StoreContext;
use crate::error::{StoreError, StoreResult};
use crate::model::Server;
use listenup_codec::{keys, RecordKind};
use listenup_core::retry::CancelToken;
use listenup_core::ReadOps;
use tracing::{debug, info};

const ENTITY: &str = "server";

/// Store for the one server record.
///
/// The record lives at a fixed key. It can be created once; afterwards its
/// signing secret never changes and `is_set_up` only ever goes from false
/// to true.
#[derive(Debug, Clone, Copy)]
pub struct ServerStore<'a> {
    ctx: &'a StoreContext,
}

impl<'a> ServerStore<'a> {
    pub(crate) fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    /// Creates the server record.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if a server record is already stored; the
    /// stored record is left untouched.
    pub fn create_server(&self, cancel: &CancelToken, server: &Server) -> StoreResult<()> {
        let key = keys::server();
        let value = encode(RecordKind::Server, server, ENTITY)?;

        self.ctx.mutate(cancel, "create_server", |txn| {
            if txn.contains(&key)? {
                return Err(StoreError::already_exists(ENTITY, keys::display(&key)));
            }
            txn.put(key.clone(), value.clone());
            Ok(())
        })?;

        info!(name = %server.config.name, "server record created");
        Ok(())
    }

    /// Returns the server record, or `None` if it was never created.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the stored record cannot be decoded.
    pub fn get_server(&self) -> StoreResult<Option<Server>> {
        self.ctx
            .database()
            .view(|txn| load(txn, &keys::server(), RecordKind::Server, ENTITY))
    }

    /// Applies `transform` to the stored record and writes the result back
    /// in one transaction.
    ///
    /// `transform` runs again on a fresh copy if the commit conflicts.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no server record exists
    /// - `Invalid` if the transform changes the signing secret or clears
    ///   `is_set_up`
    /// - Any error returned by `transform`
    pub fn update_server<F>(&self, cancel: &CancelToken, mut transform: F) -> StoreResult<Server>
    where
        F: FnMut(&mut Server) -> StoreResult<()>,
    {
        let key = keys::server();

        self.ctx.mutate(cancel, "update_server", |txn| {
            let current: Server = load(txn, &key, RecordKind::Server, ENTITY)?
                .ok_or_else(|| StoreError::not_found(ENTITY, keys::display(&key)))?;

            let mut next = current.clone();
            transform(&mut next)?;

            if next.signing_secret != current.signing_secret {
                return Err(StoreError::invalid("server signing secret is immutable"));
            }
            if current.is_set_up && !next.is_set_up {
                return Err(StoreError::invalid("server set-up flag cannot be cleared"));
            }

            if next != current {
                txn.put(key.clone(), encode(RecordKind::Server, &next, ENTITY)?);
            }
            Ok(next)
        })
    }

    /// Marks the server as set up.
    ///
    /// Returns `true` only for the call that performed the flip; every
    /// later (or concurrently losing) call returns `false`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no server record exists.
    pub fn mark_set_up(&self, cancel: &CancelToken) -> StoreResult<bool> {
        let key = keys::server();

        let flipped = self.ctx.mutate(cancel, "mark_set_up", |txn| {
            let mut server: Server = load(txn, &key, RecordKind::Server, ENTITY)?
                .ok_or_else(|| StoreError::not_found(ENTITY, keys::display(&key)))?;
            if server.is_set_up {
                return Ok(false);
            }
            server.is_set_up = true;
            txn.put(key.clone(), encode(RecordKind::Server, &server, ENTITY)?);
            Ok(true)
        })?;

        if flipped {
            info!("server marked as set up");
        } else {
            debug!("server already set up");
        }
        Ok(flipped)
    }
}
