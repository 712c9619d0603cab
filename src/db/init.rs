/// Database schema initialization.
/// Sets up SQLite WAL mode, foreign keys and creates tables on startup.
use rusqlite::{Connection, Result as SqliteResult};

/// Initialize database connection with WAL mode and schema
pub fn initialize_database(conn: &Connection) -> SqliteResult<()> {
    // Enable WAL mode (for file-based DB only, ignore error for in-memory)
    let _ = conn.execute_batch("PRAGMA journal_mode = WAL");
    let _ = conn.execute_batch("PRAGMA synchronous = NORMAL");
    conn.execute_batch("PRAGMA foreign_keys = ON")?;

    create_schema(conn)?;

    Ok(())
}

/// Create all database tables
fn create_schema(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            account_id INTEGER PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            username TEXT UNIQUE NOT NULL,
            phone_number TEXT NOT NULL DEFAULT '',
            fname TEXT NOT NULL DEFAULT '',
            lname TEXT NOT NULL DEFAULT '',
            join_date TEXT NOT NULL,
            profile_image TEXT,
            push_token TEXT
        );

        CREATE TABLE IF NOT EXISTS posts (
            post_id INTEGER PRIMARY KEY,
            account_id INTEGER NOT NULL REFERENCES accounts(account_id),
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            visibility TEXT NOT NULL DEFAULT 'public'
                CHECK (visibility IN ('public', 'friends', 'private')),
            image TEXT,
            location TEXT
        );

        CREATE TABLE IF NOT EXISTS comments (
            comment_id INTEGER PRIMARY KEY,
            post_id INTEGER NOT NULL REFERENCES posts(post_id),
            account_id INTEGER NOT NULL REFERENCES accounts(account_id),
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS post_reactions (
            post_id INTEGER NOT NULL REFERENCES posts(post_id),
            account_id INTEGER NOT NULL REFERENCES accounts(account_id),
            kind TEXT NOT NULL CHECK (kind IN ('like', 'dislike')),
            reacted_at TEXT NOT NULL,
            PRIMARY KEY (post_id, account_id)
        );

        CREATE TABLE IF NOT EXISTS comment_reactions (
            comment_id INTEGER NOT NULL REFERENCES comments(comment_id),
            account_id INTEGER NOT NULL REFERENCES accounts(account_id),
            kind TEXT NOT NULL CHECK (kind IN ('like', 'dislike')),
            reacted_at TEXT NOT NULL,
            PRIMARY KEY (comment_id, account_id)
        );

        CREATE TABLE IF NOT EXISTS friends (
            account_id1 INTEGER NOT NULL REFERENCES accounts(account_id),
            account_id2 INTEGER NOT NULL REFERENCES accounts(account_id),
            since TEXT NOT NULL,
            PRIMARY KEY (account_id1, account_id2),
            CHECK (account_id1 < account_id2)
        );

        CREATE TABLE IF NOT EXISTS friend_requests (
            sender_id INTEGER NOT NULL REFERENCES accounts(account_id),
            receiver_id INTEGER NOT NULL REFERENCES accounts(account_id),
            sent_at TEXT NOT NULL,
            PRIMARY KEY (sender_id, receiver_id),
            CHECK (sender_id <> receiver_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            message_id INTEGER PRIMARY KEY,
            sender_id INTEGER NOT NULL REFERENCES accounts(account_id),
            receiver_id INTEGER NOT NULL REFERENCES accounts(account_id),
            content TEXT NOT NULL,
            sent_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_accounts_phone ON accounts(phone_number);
        CREATE INDEX IF NOT EXISTS idx_posts_account ON posts(account_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_comments_account ON comments(account_id);
        CREATE INDEX IF NOT EXISTS idx_post_reactions_account ON post_reactions(account_id);
        CREATE INDEX IF NOT EXISTS idx_comment_reactions_account ON comment_reactions(account_id);
        CREATE INDEX IF NOT EXISTS idx_friends_second ON friends(account_id2);
        CREATE INDEX IF NOT EXISTS idx_friend_requests_receiver ON friend_requests(receiver_id);
        CREATE INDEX IF NOT EXISTS idx_messages_pair ON messages(sender_id, receiver_id, sent_at);
        CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver_id);
        "#,
    )?;

    Ok(())
}
