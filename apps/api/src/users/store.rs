use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::user::{NotificationPreference, User};

pub struct NewUser<'a> {
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub is_admin: bool,
    pub notification_preference: NotificationPreference,
    pub communication_style: Option<&'a str>,
}

pub async fn insert_user<'e>(executor: impl PgExecutor<'e>, new: NewUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, phone, is_admin, notification_preference, communication_style)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(new.email)
    .bind(new.phone)
    .bind(new.is_admin)
    .bind(new.notification_preference.as_str())
    .bind(new.communication_style)
    .fetch_one(executor)
    .await
}

/// Inserts a user by email, or returns the existing id. The flag is true when a row was created.
pub async fn upsert_user_by_email<'e>(
    executor: impl PgExecutor<'e>,
    email: &str,
) -> Result<(Uuid, bool), sqlx::Error> {
    // xmax = 0 only for freshly inserted tuples
    sqlx::query_as::<_, (Uuid, bool)>(
        r#"
        INSERT INTO users (email) VALUES ($1)
        ON CONFLICT (email) DO UPDATE SET updated_at = now()
        RETURNING id, (xmax = 0) AS inserted
        "#,
    )
    .bind(email)
    .fetch_one(executor)
    .await
}

pub async fn user_exists<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(executor)
        .await
}

pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn set_pod_leader<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET is_pod_leader = TRUE, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Binds a device to a user. Returns false when the user does not exist.
pub async fn bind_device(pool: &PgPool, user_id: Uuid, device_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET device_id = $1, updated_at = now() WHERE id = $2")
        .bind(device_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_users(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
}

/// Lifetime totals behind a user's performance rates.
#[derive(Debug, Clone, Default, FromRow)]
pub struct UserTotals {
    pub commitments: i64,
    pub completed: i64,
    pub calls: i64,
    pub attended: i64,
}

impl UserTotals {
    pub fn commitment_success_rate(&self) -> Option<f64> {
        (self.commitments > 0).then(|| self.completed as f64 / self.commitments as f64)
    }

    pub fn attendance_rate(&self) -> Option<f64> {
        (self.calls > 0).then(|| self.attended as f64 / self.calls as f64)
    }
}

pub async fn user_totals(pool: &PgPool, user_id: Uuid) -> Result<UserTotals, sqlx::Error> {
    sqlx::query_as::<_, UserTotals>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM commitments WHERE user_id = $1) AS commitments,
            (SELECT COUNT(*) FROM commitments WHERE user_id = $1 AND is_completed) AS completed,
            (SELECT COUNT(*) FROM call_attendance
              WHERE user_id = $1 AND scheduled_at <= now()) AS calls,
            (SELECT COUNT(*) FROM call_attendance
              WHERE user_id = $1 AND scheduled_at <= now() AND attended) AS attended
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_absent_without_history() {
        let totals = UserTotals::default();
        assert_eq!(totals.commitment_success_rate(), None);
        assert_eq!(totals.attendance_rate(), None);
    }

    #[test]
    fn test_rates_from_totals() {
        let totals = UserTotals {
            commitments: 8,
            completed: 6,
            calls: 4,
            attended: 1,
        };
        assert_eq!(totals.commitment_success_rate(), Some(0.75));
        assert_eq!(totals.attendance_rate(), Some(0.25));
    }

    #[cfg(feature = "live-db-tests")]
    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn test_bind_device_and_upsert_by_email() {
        use crate::test_support::{integration_pool, seed_user};

        let pool = integration_pool().await;
        let user = seed_user(&pool, NotificationPreference::HighTouch).await;

        assert!(bind_device(&pool, user.id, "ios-4F2A").await.unwrap());
        assert!(!bind_device(&pool, Uuid::new_v4(), "ios-4F2A").await.unwrap());
        let reloaded = get_user(&pool, user.id).await.unwrap().expect("user should exist");
        assert_eq!(reloaded.device_id.as_deref(), Some("ios-4F2A"));

        let (id, created) = upsert_user_by_email(&pool, &user.email).await.unwrap();
        assert_eq!(id, user.id);
        assert!(!created);
        let (_, created) = upsert_user_by_email(&pool, "new.member@scoreboards.import")
            .await
            .unwrap();
        assert!(created);
        assert_eq!(count_users(&pool).await.unwrap(), 2);
    }
}
