//! Refresh token store.

use crate::access::{encode, load};
use crate::context::StoreContext;
use crate::error::{StoreError, StoreResult};
use crate::model::{now_millis, RefreshToken};
use listenup_codec::{decode_record, keys, RecordKind};
use listenup_core::retry::CancelToken;
use listenup_core::ReadOps;
use std::time::Duration;
use tracing::{debug, info};

const ENTITY: &str = "refresh token";

/// Store for refresh tokens, one per user.
#[derive(Debug, Clone, Copy)]
pub struct AuthStore<'a> {
    ctx: &'a StoreContext,
}

impl<'a> AuthStore<'a> {
    pub(crate) fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn put(&self, cancel: &CancelToken, operation: &str, token: &RefreshToken) -> StoreResult<()> {
        let key = keys::refresh_token(&token.user_id);
        let value = encode(RecordKind::RefreshToken, token, ENTITY)?;
        self.ctx.mutate(cancel, operation, |txn| {
            txn.put(key.clone(), value.clone());
            Ok(())
        })
    }

    /// Stores `token` for `user_id`, replacing any previous token.
    ///
    /// # Errors
    ///
    /// Returns `Storage`, `RetryExhausted` or `Cancelled`.
    pub fn store_refresh_token(
        &self,
        cancel: &CancelToken,
        user_id: &str,
        token: &str,
    ) -> StoreResult<()> {
        self.store_refresh_token_at(cancel, user_id, token, now_millis())
    }

    /// Stores `token` for `user_id` with an explicit issue time (Unix ms).
    ///
    /// # Errors
    ///
    /// Returns `Storage`, `RetryExhausted` or `Cancelled`.
    pub fn store_refresh_token_at(
        &self,
        cancel: &CancelToken,
        user_id: &str,
        token: &str,
        created_at: u64,
    ) -> StoreResult<()> {
        let record = RefreshToken {
            user_id: user_id.to_string(),
            token: token.to_string(),
            created_at,
        };
        self.put(cancel, "store_refresh_token", &record)
    }

    /// Replaces the token for `user_id`. Same as storing a new one.
    ///
    /// # Errors
    ///
    /// Returns `Storage`, `RetryExhausted` or `Cancelled`.
    pub fn update_refresh_token(
        &self,
        cancel: &CancelToken,
        user_id: &str,
        token: &str,
    ) -> StoreResult<()> {
        let record = RefreshToken {
            user_id: user_id.to_string(),
            token: token.to_string(),
            created_at: now_millis(),
        };
        self.put(cancel, "update_refresh_token", &record)
    }

    /// Returns the token stored for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user has no token.
    pub fn get_refresh_token(&self, user_id: &str) -> StoreResult<String> {
        self.ctx
            .database()
            .view(|txn| {
                load::<RefreshToken, _>(
                    txn,
                    &keys::refresh_token(user_id),
                    RecordKind::RefreshToken,
                    ENTITY,
                )
            })?
            .map(|record| record.token)
            .ok_or_else(|| StoreError::not_found(ENTITY, user_id))
    }

    /// Removes the token for `user_id`. Removing a missing token succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Storage`, `RetryExhausted` or `Cancelled`.
    pub fn delete_refresh_token(&self, cancel: &CancelToken, user_id: &str) -> StoreResult<()> {
        let key = keys::refresh_token(user_id);
        self.ctx.mutate(cancel, "delete_refresh_token", |txn| {
            txn.delete(key.clone());
            Ok(())
        })?;
        debug!(user_id, "refresh token deleted");
        Ok(())
    }

    /// Deletes every token issued more than `max_age` ago, in one
    /// transaction, and returns how many were deleted.
    ///
    /// Running it again right away deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if a stored token cannot be decoded; nothing is
    /// deleted in that case.
    pub fn cleanup_expired_tokens(
        &self,
        cancel: &CancelToken,
        max_age: Duration,
    ) -> StoreResult<usize> {
        let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        let cutoff = now_millis().saturating_sub(max_age_ms);

        let deleted = self.ctx.mutate(cancel, "cleanup_expired_tokens", |txn| {
            let mut deleted = 0;
            for (key, bytes) in txn.scan_prefix(keys::REFRESH_TOKEN_PREFIX)? {
                let token: RefreshToken = decode_record(RecordKind::RefreshToken, &bytes)
                    .map_err(|e| StoreError::malformed(ENTITY, e))?;
                if token.created_at < cutoff {
                    txn.delete(key);
                    deleted += 1;
                }
            }
            Ok(deleted)
        })?;

        info!(deleted, cutoff, "expired refresh tokens swept");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StoreConfig;

    const HOUR_MS: u64 = 60 * 60 * 1000;

    fn ctx() -> StoreContext {
        StoreContext::in_memory(StoreConfig::default()).unwrap()
    }

    #[test]
    fn store_get_overwrite_delete() {
        let ctx = ctx();
        let cancel = CancelToken::new();
        let auth = ctx.auth();

        auth.store_refresh_token(&cancel, "u1", "t1").unwrap();
        assert_eq!(auth.get_refresh_token("u1").unwrap(), "t1");

        auth.update_refresh_token(&cancel, "u1", "t2").unwrap();
        assert_eq!(auth.get_refresh_token("u1").unwrap(), "t2");

        auth.delete_refresh_token(&cancel, "u1").unwrap();
        assert!(auth.get_refresh_token("u1").unwrap_err().is_not_found());
        auth.delete_refresh_token(&cancel, "u1").unwrap();
    }

    #[test]
    fn sweep_deletes_only_old_tokens() {
        let ctx = ctx();
        let cancel = CancelToken::new();
        let auth = ctx.auth();
        let now = now_millis();

        auth.store_refresh_token_at(&cancel, "old", "t-old", now - 2 * HOUR_MS).unwrap();
        auth.store_refresh_token_at(&cancel, "new", "t-new", now).unwrap();

        let deleted = auth
            .cleanup_expired_tokens(&cancel, Duration::from_secs(3600))
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(auth.get_refresh_token("old").unwrap_err().is_not_found());
        assert_eq!(auth.get_refresh_token("new").unwrap(), "t-new");

        assert_eq!(
            auth.cleanup_expired_tokens(&cancel, Duration::from_secs(3600)).unwrap(),
            0
        );
    }

    #[test]
    fn sweep_on_empty_store() {
        let ctx = ctx();
        let deleted = ctx
            .auth()
            .cleanup_expired_tokens(&CancelToken::new(), Duration::from_secs(1))
            .unwrap();
        assert_eq!(deleted, 0);
    }
}
