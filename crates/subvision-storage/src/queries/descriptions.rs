// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-description reads and upserts.

use rusqlite::{OptionalExtension, params};
use subvision_core::{SubvisionError, UserDescription};

use crate::database::{Database, map_tr_err};

pub async fn get(db: &Database, user_id: &str) -> Result<Option<UserDescription>, SubvisionError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<UserDescription>, rusqlite::Error> {
            conn.query_row(
                "SELECT user_id, description, last_updated
                 FROM user_descriptions WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UserDescription {
                        user_id: row.get(0)?,
                        description: row.get(1)?,
                        last_updated: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a description, stamping `last_updated` with the current
/// UTC time.
pub async fn put(db: &Database, user_id: &str, description: &str) -> Result<(), SubvisionError> {
    let user_id = user_id.to_string();
    let description = description.to_string();
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO user_descriptions (user_id, description, last_updated)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                    description = excluded.description,
                    last_updated = excluded.last_updated",
                params![user_id, description, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
