//! User store with a unique, case-insensitive email index.

use crate::access::{encode, load};
use crate::context::StoreContext;
use crate::error::{StoreError, StoreResult};
use crate::model::User;
use listenup_codec::{keys, CodecError, RecordKind};
use listenup_core::retry::CancelToken;
use listenup_core::{ReadOps, WriteTxn};
use tracing::{debug, info};

const ENTITY: &str = "user";
const EMAIL_ENTITY: &str = "user email";

/// Store for users and their email index.
///
/// Every user record has exactly one index entry at
/// `email:<lower(email)>\0<id>`. Record and entry are always written,
/// moved and checked in the same transaction; the uniqueness check scans
/// the email's index prefix, and the engine fails the commit if anyone
/// else wrote under that prefix in the meantime.
#[derive(Debug, Clone, Copy)]
pub struct UserStore<'a> {
    ctx: &'a StoreContext,
}

fn validate(user: &User) -> StoreResult<()> {
    if user.id.is_empty() {
        return Err(StoreError::invalid("user id must not be empty"));
    }
    if user.email.is_empty() {
        return Err(StoreError::invalid("user email must not be empty"));
    }
    if user.email.contains('\0') {
        return Err(StoreError::invalid("user email must not contain NUL"));
    }
    Ok(())
}

/// Fails with `AlreadyExists` if any index entry exists for `email`.
fn ensure_email_free(txn: &mut WriteTxn<'_>, email: &str) -> StoreResult<()> {
    let prefix = keys::email_index_prefix(email);
    if txn.first_with_prefix(&prefix)?.is_some() {
        return Err(StoreError::already_exists(
            EMAIL_ENTITY,
            keys::normalize_email(email),
        ));
    }
    Ok(())
}

fn put_index(txn: &mut WriteTxn<'_>, user: &User) -> StoreResult<()> {
    let value = encode(RecordKind::EmailIndex, &user.id, EMAIL_ENTITY)?;
    txn.put(keys::email_index(&user.email, &user.id), value);
    Ok(())
}

impl<'a> UserStore<'a> {
    pub(crate) fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    /// Creates a user and its email index entry.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the id is taken, or the email is taken in any
    ///   letter case
    /// - `Invalid` if the id or email is empty
    pub fn create_user(&self, cancel: &CancelToken, user: &User) -> StoreResult<()> {
        validate(user)?;
        let key = keys::user(&user.id);
        let value = encode(RecordKind::User, user, ENTITY)?;

        self.ctx.mutate(cancel, "create_user", |txn| {
            if txn.contains(&key)? {
                return Err(StoreError::already_exists(ENTITY, user.id.clone()));
            }
            ensure_email_free(txn, &user.email)?;

            txn.put(key.clone(), value.clone());
            put_index(txn, user)
        })?;

        info!(user_id = %user.id, "user created");
        Ok(())
    }

    /// Returns the user with `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such user.
    pub fn get_user_by_id(&self, id: &str) -> StoreResult<User> {
        self.ctx
            .database()
            .view(|txn| load::<User, _>(txn, &keys::user(id), RecordKind::User, ENTITY))?
            .ok_or_else(|| StoreError::not_found(ENTITY, id))
    }

    /// Returns the user registered under `email`, in any letter case.
    ///
    /// The index lookup and the record read share one snapshot.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no user has this email
    /// - `Malformed` if the index entry is unreadable or points at a
    ///   missing record
    pub fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        let prefix = keys::email_index_prefix(email);

        self.ctx.database().view(|txn| {
            let (index_key, _) = txn
                .first_with_prefix(&prefix)?
                .ok_or_else(|| StoreError::not_found(ENTITY, email))?;
            let id = keys::id_from_email_index(&index_key, &prefix).ok_or_else(|| {
                StoreError::malformed(EMAIL_ENTITY, CodecError::malformed("index key is not UTF-8"))
            })?;

            load::<User, _>(txn, &keys::user(&id), RecordKind::User, ENTITY)?.ok_or_else(|| {
                StoreError::malformed(
                    EMAIL_ENTITY,
                    CodecError::malformed(format!("index entry points at missing user {id}")),
                )
            })
        })
    }

    /// Replaces a stored user.
    ///
    /// If the email changed (ignoring case), the old index entry is removed
    /// and a new one written after checking the new email is free, all in
    /// the same transaction as the record itself.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `AlreadyExists` if the new email belongs to another user
    /// - `Invalid` if the id or email is empty
    pub fn update_user(&self, cancel: &CancelToken, user: &User) -> StoreResult<()> {
        validate(user)?;
        let key = keys::user(&user.id);
        let value = encode(RecordKind::User, user, ENTITY)?;

        self.ctx.mutate(cancel, "update_user", |txn| {
            let existing: User = load(txn, &key, RecordKind::User, ENTITY)?
                .ok_or_else(|| StoreError::not_found(ENTITY, user.id.clone()))?;

            if keys::normalize_email(&existing.email) != keys::normalize_email(&user.email) {
                txn.delete(keys::email_index(&existing.email, &existing.id));
                ensure_email_free(txn, &user.email)?;
                put_index(txn, user)?;
                debug!(user_id = %user.id, "email index moved");
            }

            txn.put(key.clone(), value.clone());
            Ok(())
        })
    }

    /// Sets the user's last login time.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub fn record_login(&self, cancel: &CancelToken, id: &str, at: u64) -> StoreResult<User> {
        let key = keys::user(id);

        self.ctx.mutate(cancel, "record_login", |txn| {
            let mut user: User = load(txn, &key, RecordKind::User, ENTITY)?
                .ok_or_else(|| StoreError::not_found(ENTITY, id))?;
            user.last_login = Some(at);
            txn.put(key.clone(), encode(RecordKind::User, &user, ENTITY)?);
            Ok(user)
        })
    }
}
