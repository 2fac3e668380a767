use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (catalog, playlists, collaborations)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                fullname    TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE authentications (
                token       TEXT PRIMARY KEY
            );

            CREATE TABLE albums (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                year        INTEGER NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE songs (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                year        INTEGER NOT NULL,
                performer   TEXT NOT NULL,
                genre       TEXT NOT NULL,
                duration    INTEGER,
                album_id    TEXT REFERENCES albums(id) ON DELETE SET NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_songs_album ON songs(album_id);

            CREATE TABLE playlists (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                owner       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_playlists_owner ON playlists(owner);

            CREATE TABLE playlist_songs (
                id          TEXT PRIMARY KEY,
                playlist_id TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                song_id     TEXT NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(playlist_id, song_id)
            );

            CREATE TABLE playlist_song_activities (
                id          TEXT PRIMARY KEY,
                playlist_id TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                song_id     TEXT NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                action      TEXT NOT NULL CHECK (action IN ('add', 'delete')),
                time        TEXT NOT NULL
            );

            CREATE INDEX idx_activities_playlist
                ON playlist_song_activities(playlist_id, time);

            CREATE TABLE collaborations (
                id          TEXT PRIMARY KEY,
                playlist_id TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(playlist_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (album covers, likes, durable queue)");
        conn.execute_batch(
            "
            ALTER TABLE albums ADD COLUMN cover TEXT;

            CREATE TABLE user_album_likes (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                album_id    TEXT NOT NULL REFERENCES albums(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, album_id)
            );

            CREATE INDEX idx_likes_album ON user_album_likes(album_id);

            CREATE TABLE queues (
                name        TEXT PRIMARY KEY,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE queue_messages (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                queue        TEXT NOT NULL REFERENCES queues(name) ON DELETE CASCADE,
                payload      BLOB NOT NULL,
                enqueued_at  TEXT NOT NULL,
                leased_until INTEGER
            );

            CREATE INDEX idx_queue_messages_queue ON queue_messages(queue, id);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }
}
