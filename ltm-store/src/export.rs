use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use ltm_core::memory::Memory;
use ltm_core::traits::FullProvider;

/// Pages every memory out of the primary, newest first.
///
/// The underlying recency access is offset-paged, which skips or
/// repeats rows when writes land mid-export. The cursor compensates by
/// remembering the oldest `(created_at, id)` boundary it has emitted
/// and dropping any row at or above it: a concurrent insert can shift
/// offsets, but a shifted row is always one the cursor already served.
pub struct ExportCursor {
    provider: Arc<dyn FullProvider>,
    page_size: usize,
    offset: usize,
    boundary: Option<(DateTime<Utc>, BTreeSet<String>)>,
    done: bool,
}

impl ExportCursor {
    pub(crate) fn new(provider: Arc<dyn FullProvider>, page_size: usize) -> Self {
        Self {
            provider,
            page_size: page_size.max(1),
            offset: 0,
            boundary: None,
            done: false,
        }
    }

    /// Next page of not-yet-emitted memories, newest first. Empty once
    /// the corpus is exhausted.
    pub async fn next_batch(&mut self) -> Vec<Memory> {
        while !self.done {
            let page = self.provider.get_recent(self.page_size, self.offset).await;
            if page.is_empty() {
                self.done = true;
                break;
            }
            self.offset += page.len();

            let fresh: Vec<Memory> = page.into_iter().filter(|m| self.not_yet_emitted(m)).collect();
            for memory in &fresh {
                self.advance_boundary(memory);
            }
            if !fresh.is_empty() {
                return fresh;
            }
            // Whole page was already emitted (offsets shifted under a
            // concurrent write burst); keep paging.
        }
        Vec::new()
    }

    fn not_yet_emitted(&self, memory: &Memory) -> bool {
        match &self.boundary {
            None => true,
            Some((boundary_at, ids_at_boundary)) => {
                memory.created_at < *boundary_at
                    || (memory.created_at == *boundary_at && !ids_at_boundary.contains(&memory.id))
            }
        }
    }

    fn advance_boundary(&mut self, memory: &Memory) {
        match &mut self.boundary {
            None => {
                let mut ids = BTreeSet::new();
                ids.insert(memory.id.clone());
                self.boundary = Some((memory.created_at, ids));
            }
            Some((boundary_at, ids)) => {
                if memory.created_at < *boundary_at {
                    *boundary_at = memory.created_at;
                    ids.clear();
                    ids.insert(memory.id.clone());
                } else if memory.created_at == *boundary_at {
                    ids.insert(memory.id.clone());
                }
            }
        }
    }
}
