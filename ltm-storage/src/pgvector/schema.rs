use ltm_core::config::{DistanceMetric, VectorIndexType};

/// Maps the configured metric to the pgvector operator and operator
/// class used both for the index and the per-query distance
/// expression, so the two never drift out of sync.
pub fn operator(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::Cosine => "<=>",
        DistanceMetric::L2 => "<->",
        DistanceMetric::InnerProduct => "<#>",
    }
}

fn operator_class(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::Cosine => "vector_cosine_ops",
        DistanceMetric::L2 => "vector_l2_ops",
        DistanceMetric::InnerProduct => "vector_ip_ops",
    }
}

/// Builds the idempotent DDL for one table + its indexes. Executed as
/// a single batch at provider startup.
pub fn ddl(table: &str, dimension: usize, index_type: VectorIndexType, metric: DistanceMetric) -> String {
    let index_clause = match index_type {
        VectorIndexType::Hnsw => format!(
            "CREATE INDEX IF NOT EXISTS {table}_embedding_idx ON {table} \
             USING hnsw (embedding {opclass}) WITH (m = 16, ef_construction = 64);",
            opclass = operator_class(metric),
        ),
        VectorIndexType::IvfFlat => format!(
            "CREATE INDEX IF NOT EXISTS {table}_embedding_idx ON {table} \
             USING ivfflat (embedding {opclass}) WITH (lists = 1000);",
            opclass = operator_class(metric),
        ),
    };

    format!(
        "
        CREATE EXTENSION IF NOT EXISTS vector;

        CREATE TABLE IF NOT EXISTS {table} (
            id uuid PRIMARY KEY,
            content text NOT NULL,
            embedding vector({dimension}),
            metadata jsonb DEFAULT '{{}}',
            user_id text,
            conversation_id text,
            importance_score float8 DEFAULT 0.5,
            created_at timestamptz DEFAULT now(),
            last_accessed timestamptz DEFAULT now(),
            access_count integer DEFAULT 0
        );

        {index_clause}

        CREATE INDEX IF NOT EXISTS {table}_user_id_idx ON {table} (user_id);
        CREATE INDEX IF NOT EXISTS {table}_conversation_id_idx ON {table} (conversation_id);
        CREATE INDEX IF NOT EXISTS {table}_created_at_idx ON {table} (created_at);
        CREATE INDEX IF NOT EXISTS {table}_importance_score_idx ON {table} (importance_score);
        CREATE INDEX IF NOT EXISTS {table}_user_created_idx ON {table} (user_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS {table}_metadata_gin_idx ON {table} USING gin (metadata);

        CREATE TABLE IF NOT EXISTS memory_content_hashes (
            content_hash text PRIMARY KEY,
            memory_id uuid NOT NULL REFERENCES {table}(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS dedup_audit (
            audit_id uuid PRIMARY KEY,
            candidate_id uuid NOT NULL,
            matched_id uuid,
            is_duplicate boolean NOT NULL,
            confidence float8 NOT NULL,
            similarity_score float8,
            reason text NOT NULL,
            automatic boolean NOT NULL,
            reviewed boolean NOT NULL DEFAULT false,
            created_at timestamptz DEFAULT now()
        );
        "
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_includes_chosen_index_type() {
        let hnsw = ddl("memories", 1536, VectorIndexType::Hnsw, DistanceMetric::Cosine);
        assert!(hnsw.contains("USING hnsw"));
        assert!(hnsw.contains("vector_cosine_ops"));

        let ivf = ddl("memories", 1536, VectorIndexType::IvfFlat, DistanceMetric::L2);
        assert!(ivf.contains("USING ivfflat"));
        assert!(ivf.contains("vector_l2_ops"));
    }
}
