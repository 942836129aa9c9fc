use rusqlite::Connection;

use ltm_core::LtmResult;

use crate::to_internal_err;

/// Idempotent schema creation, run once per connection pool at
/// startup. Mirrors the pgvector schema's shape so the two providers
/// stay interchangeable from the orchestrator's point of view.
pub fn initialize(conn: &Connection) -> LtmResult<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS vector_memories (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL,
            dimensions INTEGER NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            user_id TEXT,
            conversation_id TEXT,
            importance_score REAL NOT NULL DEFAULT 0.5,
            created_at TEXT NOT NULL,
            last_accessed TEXT NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_vector_memories_user ON vector_memories(user_id);
        CREATE INDEX IF NOT EXISTS idx_vector_memories_conversation ON vector_memories(conversation_id);
        CREATE INDEX IF NOT EXISTS idx_vector_memories_created_at ON vector_memories(created_at DESC);

        CREATE TABLE IF NOT EXISTS memory_content_hashes (
            content_hash TEXT PRIMARY KEY,
            memory_id TEXT NOT NULL REFERENCES vector_memories(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS dedup_audit (
            audit_id TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL,
            matched_id TEXT,
            is_duplicate INTEGER NOT NULL,
            confidence REAL NOT NULL,
            similarity_score REAL,
            reason TEXT NOT NULL,
            automatic INTEGER NOT NULL,
            reviewed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| to_internal_err("local schema initialization", e))
}
