// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations with SQS-style semantics.
//!
//! A message is visible when `visible_at <= now`. Receiving stamps a fresh
//! receipt and pushes `visible_at` out by the visibility timeout; only the
//! holder of the current receipt can delete it. Timestamps are unix
//! milliseconds.

use std::collections::HashMap;
use std::time::Duration;

use rusqlite::{OptionalExtension, params};
use subvision_core::{QueueMessage, SendRequest, SubvisionError};

use crate::database::{Database, map_tr_err};

/// How long a dedup id suppresses repeated sends on the same queue.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Outcome of a send: the message id, and whether it was a new message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub message_id: String,
    pub deduplicated: bool,
}

/// Number of messages in a queue, split by visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueDepth {
    pub available: u64,
    pub in_flight: u64,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Insert a message unless its dedup id was seen within [`DEDUP_WINDOW`].
pub async fn send(
    db: &Database,
    queue_name: &str,
    request: SendRequest,
) -> Result<SendOutcome, SubvisionError> {
    let queue_name = queue_name.to_string();
    let attributes = serde_json::to_string(&request.attributes)?;
    let message_id = uuid::Uuid::new_v4().to_string();

    db.connection()
        .call(move |conn| -> Result<SendOutcome, rusqlite::Error> {
            let now = now_ms();
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM queue_dedup WHERE expires_at <= ?1",
                params![now],
            )?;

            if let Some(dedup_id) = &request.dedup_id {
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT message_id FROM queue_dedup
                         WHERE queue_name = ?1 AND dedup_id = ?2",
                        params![queue_name, dedup_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if let Some(existing) = existing {
                    tx.commit()?;
                    return Ok(SendOutcome {
                        message_id: existing,
                        deduplicated: true,
                    });
                }
                tx.execute(
                    "INSERT INTO queue_dedup (queue_name, dedup_id, message_id, expires_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![queue_name, dedup_id, message_id, now + millis(DEDUP_WINDOW)],
                )?;
            }

            tx.execute(
                "INSERT INTO queue_messages
                    (message_id, queue_name, body, attributes, group_id, visible_at, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    message_id,
                    queue_name,
                    request.body,
                    attributes,
                    request.group_id,
                    now
                ],
            )?;
            tx.commit()?;

            Ok(SendOutcome {
                message_id,
                deduplicated: false,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Claim up to `max_messages` visible messages in send order.
///
/// A message whose group already has a message in flight is skipped, which
/// keeps each group strictly ordered. Does not wait.
pub async fn claim(
    db: &Database,
    queue_name: &str,
    max_messages: u32,
    visibility_timeout: Duration,
) -> Result<Vec<QueueMessage>, SubvisionError> {
    let queue_name = queue_name.to_string();
    let hidden_for = millis(visibility_timeout);

    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<(QueueMessage, String)>, rusqlite::Error> {
            let now = now_ms();
            let tx = conn.transaction()?;

            let candidates = {
                let mut stmt = tx.prepare(
                    "SELECT seq, message_id, body, attributes, receive_count
                     FROM queue_messages
                     WHERE queue_name = ?1 AND visible_at <= ?2
                       AND (group_id IS NULL OR group_id NOT IN (
                            SELECT group_id FROM queue_messages
                            WHERE queue_name = ?1 AND group_id IS NOT NULL
                              AND receipt IS NOT NULL AND visible_at > ?2))
                     ORDER BY seq ASC
                     LIMIT ?3",
                )?;
                stmt.query_map(params![queue_name, now, max_messages], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, u32>(4)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?
            };

            let mut claimed = Vec::with_capacity(candidates.len());
            for (seq, message_id, body, attributes, receive_count) in candidates {
                let receipt = uuid::Uuid::new_v4().to_string();
                tx.execute(
                    "UPDATE queue_messages
                     SET receipt = ?1, receive_count = receive_count + 1, visible_at = ?2
                     WHERE seq = ?3",
                    params![receipt, now + hidden_for, seq],
                )?;
                claimed.push((
                    QueueMessage {
                        message_id,
                        receipt,
                        body,
                        attributes: HashMap::new(),
                        receive_count: receive_count + 1,
                    },
                    attributes,
                ));
            }
            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)?;

    rows.into_iter()
        .map(|(mut message, attributes)| -> Result<QueueMessage, SubvisionError> {
            message.attributes = serde_json::from_str(&attributes)?;
            Ok(message)
        })
        .collect()
}

/// Delete the message currently held under `receipt`.
///
/// Returns `false` when the receipt is stale or unknown.
pub async fn delete(db: &Database, queue_name: &str, receipt: &str) -> Result<bool, SubvisionError> {
    let queue_name = queue_name.to_string();
    let receipt = receipt.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let deleted = conn.execute(
                "DELETE FROM queue_messages WHERE queue_name = ?1 AND receipt = ?2",
                params![queue_name, receipt],
            )?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Count available and in-flight messages in a queue.
pub async fn depth(db: &Database, queue_name: &str) -> Result<QueueDepth, SubvisionError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| -> Result<QueueDepth, rusqlite::Error> {
            let now = now_ms();
            conn.query_row(
                "SELECT
                    COALESCE(SUM(CASE WHEN visible_at <= ?2 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN visible_at > ?2 THEN 1 ELSE 0 END), 0)
                 FROM queue_messages WHERE queue_name = ?1",
                params![queue_name, now],
                |row| {
                    let available: i64 = row.get(0)?;
                    let in_flight: i64 = row.get(1)?;
                    Ok(QueueDepth {
                        available: available.unsigned_abs(),
                        in_flight: in_flight.unsigned_abs(),
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}
