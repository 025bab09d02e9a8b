use anyhow::Result;
use rusqlite::Connection;

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS emails (
            email_id TEXT PRIMARY KEY,
            sender_email TEXT NOT NULL,
            sender_name TEXT NOT NULL,
            subject TEXT NOT NULL,
            has_attachment BOOLEAN NOT NULL,
            attachments TEXT NOT NULL,
            content TEXT NOT NULL,
            links TEXT NOT NULL,
            relevant_dates TEXT NOT NULL,
            venue TEXT NOT NULL,
            email_url TEXT NOT NULL,
            is_read BOOLEAN NOT NULL,
            is_flagged BOOLEAN NOT NULL,
            time_received TEXT NOT NULL
        );

        -- Append-only: duplicate (user_id, email_id) rows are expected and
        -- collapsed at query time, so no uniqueness constraint here.
        CREATE TABLE IF NOT EXISTS read_marks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            email_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            marked_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS flagged_marks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            email_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            marked_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS dead_letters (
            id TEXT PRIMARY KEY,
            action TEXT NOT NULL,
            email_id TEXT NOT NULL,
            attempts INTEGER NOT NULL,
            last_error TEXT NOT NULL,
            failed_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_read_marks_user_id ON read_marks(user_id);
        CREATE INDEX IF NOT EXISTS idx_flagged_marks_user_id ON flagged_marks(user_id);
        CREATE INDEX IF NOT EXISTS idx_emails_time_received ON emails(time_received);
        "#,
    )?;

    Ok(())
}
