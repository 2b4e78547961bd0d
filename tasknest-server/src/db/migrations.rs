use lazy_static::lazy_static;
use rusqlite_migration::{Migrations, M};

lazy_static! {
    pub static ref MIGRATIONS: Migrations<'static> = Migrations::new(vec![
        M::up(
            r#"
            CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,

                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#
        ),
        M::up(
            r#"
            CREATE TABLE notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,

                title TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                creation_date DATETIME NOT NULL,
                is_pinned BOOLEAN NOT NULL DEFAULT FALSE,

                user_id INTEGER NOT NULL,

                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE INDEX notes_user_id ON notes (user_id);
        "#
        ),
        M::up(
            r#"
            CREATE TABLE tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,

                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                creation_date DATETIME NOT NULL,
                due_date DATETIME,
                completed BOOLEAN NOT NULL DEFAULT FALSE,
                is_pinned BOOLEAN NOT NULL DEFAULT FALSE,
                priority TEXT NOT NULL DEFAULT 'Medium', -- Low | Medium | High
                category TEXT NOT NULL DEFAULT 'Personal',

                user_id INTEGER NOT NULL,

                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE INDEX tasks_user_id ON tasks (user_id);
        "#
        ),
    ]);
}
