use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::info;

use shared::domain::{ParticipantId, Role, RoomId, RoomStatus};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: ParticipantId,
    pub room_id: RoomId,
    pub role: Role,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Seeds the demo rooms and users when the database holds no users yet.
    /// Returns whether anything was inserted.
    pub async fn seed_defaults_if_empty(&self) -> Result<bool> {
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        if users > 0 {
            return Ok(false);
        }

        self.upsert_room(&RoomId::from("r1"), RoomStatus::Open)
            .await?;
        self.upsert_room(&RoomId::from("r2"), RoomStatus::Closed)
            .await?;
        self.create_user(&ParticipantId::from("u1"), &RoomId::from("r1"), Role::Admin)
            .await?;
        self.create_user(&ParticipantId::from("u2"), &RoomId::from("r1"), Role::Member)
            .await?;
        self.create_user(&ParticipantId::from("u3"), &RoomId::from("r2"), Role::Admin)
            .await?;
        info!("seeded default rooms and users");
        Ok(true)
    }

    pub async fn upsert_room(&self, room_id: &RoomId, status: RoomStatus) -> Result<()> {
        sqlx::query(
            "INSERT INTO rooms (id, status) VALUES (?, ?)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status",
        )
        .bind(room_id.as_str())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store room {room_id}"))?;
        Ok(())
    }

    /// Unknown rooms read as closed so nothing can be removed from them.
    pub async fn room_status(&self, room_id: &RoomId) -> Result<RoomStatus> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM rooms WHERE id = ?")
            .bind(room_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match status {
            Some(raw) => Ok(raw.parse::<RoomStatus>()?),
            None => Ok(RoomStatus::Closed),
        }
    }

    pub async fn create_user(
        &self,
        user_id: &ParticipantId,
        room_id: &RoomId,
        role: Role,
    ) -> Result<()> {
        sqlx::query("INSERT INTO users (id, room_id, role) VALUES (?, ?, ?)")
            .bind(user_id.as_str())
            .bind(room_id.as_str())
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to create user {user_id}"))?;
        Ok(())
    }

    pub async fn find_user(&self, user_id: &ParticipantId) -> Result<Option<StoredUser>> {
        let row = sqlx::query("SELECT id, room_id, role FROM users WHERE id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(stored_user_from_row).transpose()
    }

    pub async fn list_users_in_room(&self, room_id: &RoomId) -> Result<Vec<StoredUser>> {
        let rows =
            sqlx::query("SELECT id, room_id, role FROM users WHERE room_id = ? ORDER BY seq ASC")
                .bind(room_id.as_str())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(stored_user_from_row).collect()
    }

    pub async fn delete_user(&self, user_id: &ParticipantId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_users_in_room(&self, room_id: &RoomId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE room_id = ?")
            .bind(room_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn stored_user_from_row(row: SqliteRow) -> Result<StoredUser> {
    let role: String = row.try_get("role")?;
    Ok(StoredUser {
        id: ParticipantId(row.try_get("id")?),
        room_id: RoomId(row.try_get("room_id")?),
        role: role.parse::<Role>()?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
