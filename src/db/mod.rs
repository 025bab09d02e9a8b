use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use thiserror::Error;

use self::models::{DeadLetter, Email, Relation, RelationMark, User};

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("json serialization: {0}")]
    Json(#[from] serde_json::Error),

    #[error("filesystem: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Config(String),
}

pub mod migrations;
pub mod models;
pub mod schema;

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let mut db = Self {
            conn,
            path: path.to_path_buf(),
        };
        db.initialize()?;
        Ok(db)
    }

    pub fn initialize(&mut self) -> Result<(), DbError> {
        self.run_migrations()
    }

    fn run_migrations(&mut self) -> Result<(), DbError> {
        migrations::migrate(&self.conn)
            .map_err(|e| DbError::Config(format!("migration failed: {e}")))
    }

    pub fn default_db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir()
            .ok_or_else(|| DbError::Config("failed to determine home directory".to_string()))?;
        Ok(home.join(".mailfeed").join("mailfeed.db"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn upsert_user(&self, user: &User) -> Result<(), DbError> {
        self.conn.execute(
            r#"
            INSERT INTO users (user_id, name, email)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email
            "#,
            params![user.user_id, user.name, user.email],
        )?;

        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<User>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, name, email FROM users WHERE user_id = ? LIMIT 1",
        )?;

        let mut rows = stmt.query([user_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(User::from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn insert_email(&self, email: &Email) -> Result<(), DbError> {
        let attachments = serde_json::to_string(&email.attachments)?;
        let links = serde_json::to_string(&email.links)?;

        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO emails (
                email_id, sender_email, sender_name, subject, has_attachment, attachments,
                content, links, relevant_dates, venue, email_url, is_read, is_flagged,
                time_received
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                email.email_id,
                email.sender_email,
                email.sender_name,
                email.subject,
                email.has_attachment,
                attachments,
                email.content,
                links,
                email.relevant_dates,
                email.venue,
                email.email_url,
                email.is_read,
                email.is_flagged,
                email.time_received,
            ],
        )?;

        Ok(())
    }

    pub fn get_email(&self, email_id: &str) -> Result<Option<Email>, DbError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT email_id, sender_email, sender_name, subject, has_attachment, attachments,
                   content, links, relevant_dates, venue, email_url, is_read, is_flagged,
                   time_received
            FROM emails
            WHERE email_id = ?
            "#,
        )?;

        let mut rows = stmt.query([email_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Email::from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// All persisted emails, newest first.
    pub fn list_emails(&self) -> Result<Vec<Email>, DbError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT email_id, sender_email, sender_name, subject, has_attachment, attachments,
                   content, links, relevant_dates, venue, email_url, is_read, is_flagged,
                   time_received
            FROM emails
            ORDER BY time_received DESC
            "#,
        )?;

        let emails = stmt
            .query_map([], Email::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(emails)
    }

    /// Appends unconditionally: no existence check, repeated calls grow the
    /// relation. Membership queries collapse duplicates.
    pub fn mark_relation(&self, relation: Relation, mark: &RelationMark) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO {} (user_id, email_id, subject, marked_at) VALUES (?, ?, ?, ?)",
            relation.table()
        );
        self.conn.execute(
            &sql,
            params![mark.user_id, mark.email_id, mark.subject, mark.marked_at],
        )?;

        Ok(())
    }

    /// Email ids for which at least one mark exists. `None` skips user
    /// scoping (legacy unauthenticated path); production callers always
    /// scope.
    pub fn relation_ids(
        &self,
        relation: Relation,
        user_id: Option<&str>,
    ) -> Result<Vec<String>, DbError> {
        let ids = match user_id {
            Some(user_id) => {
                let sql = format!(
                    "SELECT DISTINCT email_id FROM {} WHERE user_id = ?",
                    relation.table()
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let ids = stmt
                    .query_map([user_id], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                ids
            }
            None => {
                let sql = format!("SELECT DISTINCT email_id FROM {}", relation.table());
                let mut stmt = self.conn.prepare(&sql)?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                ids
            }
        };

        Ok(ids)
    }

    /// Raw mark rows for one user, oldest first. Duplicates included.
    pub fn list_marks(
        &self,
        relation: Relation,
        user_id: &str,
    ) -> Result<Vec<RelationMark>, DbError> {
        let sql = format!(
            "SELECT user_id, email_id, subject, marked_at FROM {} WHERE user_id = ? ORDER BY id ASC",
            relation.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let marks = stmt
            .query_map([user_id], RelationMark::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(marks)
    }

    pub fn insert_dead_letter(&self, letter: &DeadLetter) -> Result<(), DbError> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO dead_letters (
                id, action, email_id, attempts, last_error, failed_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                letter.id,
                letter.action,
                letter.email_id,
                letter.attempts,
                letter.last_error,
                letter.failed_at,
            ],
        )?;

        Ok(())
    }

    pub fn list_dead_letters(&self) -> Result<Vec<DeadLetter>, DbError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, action, email_id, attempts, last_error, failed_at
            FROM dead_letters
            ORDER BY failed_at ASC
            "#,
        )?;

        let letters = stmt
            .query_map([], DeadLetter::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(letters)
    }

}
