use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::auth::model::User;
use crate::store::Collection;

/// Reset tokens live for 15 minutes. Not configurable.
const RESET_TOKEN_TTL_MS: i64 = 15 * 60 * 1000;

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Generates an opaque reset token for the user and persists only its
/// SHA-256 digest plus expiry on the record. The plaintext token is
/// returned once, to be delivered by email.
pub async fn issue_reset_token(
    users: &dyn Collection<User>,
    mut user: User,
) -> anyhow::Result<String> {
    let mut raw = [0u8; 20];
    OsRng.fill_bytes(&mut raw);
    let token = hex::encode(raw);

    user.reset_password_token = Some(digest(&token));
    user.reset_password_expire = Some(now_millis() + RESET_TOKEN_TTL_MS);
    users.put(user).await?;

    Ok(token)
}

/// Finds the user whose persisted digest matches the token and whose
/// expiry is still in the future (expiry exactly at now is rejected).
/// The caller must clear both reset fields after use.
pub async fn consume_reset_token(
    users: &dyn Collection<User>,
    token: &str,
) -> anyhow::Result<Option<User>> {
    let wanted = digest(token);
    let now = now_millis();
    let user = users.list().await?.into_iter().find(|u| {
        u.reset_password_token.as_deref() == Some(wanted.as_str())
            && u.reset_password_expire.map_or(false, |exp| exp > now)
    });
    Ok(user)
}

/// Clears the reset fields, either after a successful reset or to
/// roll back a token whose email could not be delivered.
pub async fn clear_reset_token(
    users: &dyn Collection<User>,
    mut user: User,
) -> anyhow::Result<User> {
    user.reset_password_token = None;
    user.reset_password_expire = None;
    users.put(user.clone()).await?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::model::Role;
    use crate::store::JsonCollection;
    use uuid::Uuid;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Test".into(),
            last_name: "User".into(),
            email: email.into(),
            role: Role::User,
            password: "$argon2id$fake".into(),
            reset_password_token: None,
            reset_password_expire: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    async fn store(dir: &tempfile::TempDir) -> JsonCollection<User> {
        JsonCollection::open(dir.path().join("users.json"))
            .await
            .expect("open")
    }

    #[tokio::test]
    async fn issue_then_consume_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let users = store(&dir).await;
        let u = user("reset@example.com");
        users.put(u.clone()).await.expect("put");

        let token = issue_reset_token(&users, u.clone()).await.expect("issue");
        let found = consume_reset_token(&users, &token)
            .await
            .expect("consume")
            .expect("should match");
        assert_eq!(found.id, u.id);
        // Only the digest is persisted, never the plaintext token.
        assert_ne!(found.reset_password_token.as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn token_is_single_use() {
        let dir = tempfile::tempdir().expect("tempdir");
        let users = store(&dir).await;
        let u = user("once@example.com");
        users.put(u.clone()).await.expect("put");

        let token = issue_reset_token(&users, u).await.expect("issue");
        let found = consume_reset_token(&users, &token)
            .await
            .expect("consume")
            .expect("first use matches");
        clear_reset_token(&users, found).await.expect("clear");

        assert!(consume_reset_token(&users, &token)
            .await
            .expect("consume")
            .is_none());
    }

    #[tokio::test]
    async fn expired_token_is_rejected_at_the_boundary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let users = store(&dir).await;
        let u = user("late@example.com");
        users.put(u.clone()).await.expect("put");

        let token = issue_reset_token(&users, u.clone()).await.expect("issue");

        // Expiry exactly at now must fail; strictly in the future passes.
        let mut stored = users.get(u.id).await.expect("get").expect("exists");
        stored.reset_password_expire = Some(now_millis());
        users.put(stored.clone()).await.expect("put");
        assert!(consume_reset_token(&users, &token)
            .await
            .expect("consume")
            .is_none());

        stored.reset_password_expire = Some(now_millis() + 60_000);
        users.put(stored).await.expect("put");
        assert!(consume_reset_token(&users, &token)
            .await
            .expect("consume")
            .is_some());
    }

    #[tokio::test]
    async fn unknown_token_matches_nobody() {
        let dir = tempfile::tempdir().expect("tempdir");
        let users = store(&dir).await;
        let u = user("someone@example.com");
        users.put(u.clone()).await.expect("put");
        issue_reset_token(&users, u).await.expect("issue");

        assert!(consume_reset_token(&users, "deadbeef")
            .await
            .expect("consume")
            .is_none());
    }
}
