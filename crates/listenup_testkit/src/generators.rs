//! Property-based test generators using proptest.
//!
//! Strategies produce values the request layer could hand to a store:
//! non-empty ids, well-formed emails, printable names.

use listenup_store::{Directory, Library, RefreshToken, Role, Server, ServerConfig, User};
use proptest::prelude::*;

/// Strategy for primary identifiers.
pub fn id_strategy() -> impl Strategy<Value = String> {
    "[a-f0-9]{8,32}"
}

/// Strategy for emails in mixed case.
pub fn email_strategy() -> impl Strategy<Value = String> {
    ("[a-zA-Z][a-zA-Z0-9._]{0,15}", "[a-zA-Z]{1,10}", "[a-z]{2,4}")
        .prop_map(|(local, domain, tld)| format!("{local}@{domain}.{tld}"))
}

/// Strategy for a different capitalisation of `email`.
pub fn case_variant_strategy(email: String) -> impl Strategy<Value = String> {
    let len = email.chars().count();
    prop::collection::vec(any::<bool>(), len).prop_map(move |upper| {
        email
            .chars()
            .zip(upper)
            .map(|(c, up)| {
                if up {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect::<String>()
    })
}

/// Strategy for display names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,30}"
}

/// Strategy for roles.
pub fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::Member)]
}

/// Strategy for Unix-millisecond timestamps in a plausible range.
pub fn timestamp_strategy() -> impl Strategy<Value = u64> {
    1_500_000_000_000u64..2_500_000_000_000u64
}

/// Strategy for users.
pub fn user_strategy() -> impl Strategy<Value = User> {
    (
        id_strategy(),
        email_strategy(),
        name_strategy(),
        "[a-zA-Z0-9$./]{20,60}",
        role_strategy(),
        prop::collection::vec(id_strategy(), 0..4),
        timestamp_strategy(),
        prop::option::of(timestamp_strategy()),
    )
        .prop_map(
            |(id, email, display_name, hashed_password, role, library_ids, created_at, last_login)| {
                User {
                    id,
                    email,
                    display_name,
                    hashed_password,
                    role,
                    current_library_id: library_ids.first().cloned(),
                    library_ids,
                    created_at,
                    last_login,
                }
            },
        )
}

/// Strategy for directories.
pub fn directory_strategy() -> impl Strategy<Value = Directory> {
    (id_strategy(), name_strategy(), "(/[a-z0-9_]{1,12}){1,4}", 0u32..10_000).prop_map(
        |(id, name, path, book_count)| Directory {
            id,
            name,
            path,
            book_count,
        },
    )
}

/// Strategy for libraries with up to five directories.
pub fn library_strategy() -> impl Strategy<Value = Library> {
    (
        id_strategy(),
        name_strategy(),
        prop::collection::vec(directory_strategy(), 0..5),
        timestamp_strategy(),
    )
        .prop_map(|(id, name, directories, created_at)| Library {
            id,
            name,
            directories,
            created_at,
        })
}

/// Strategy for refresh tokens.
pub fn refresh_token_strategy() -> impl Strategy<Value = RefreshToken> {
    (id_strategy(), "[A-Za-z0-9_-]{16,64}", timestamp_strategy()).prop_map(
        |(user_id, token, created_at)| RefreshToken {
            user_id,
            token,
            created_at,
        },
    )
}

/// Strategy for server records.
pub fn server_strategy() -> impl Strategy<Value = Server> {
    (
        any::<bool>(),
        name_strategy(),
        prop::collection::vec(any::<u8>(), 32),
    )
        .prop_map(|(is_set_up, name, signing_secret)| Server {
            is_set_up,
            config: ServerConfig { name },
            signing_secret,
        })
}
