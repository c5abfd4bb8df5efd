use crate::agent::IterationRecord;
use crate::traits::MemoryEntry;

/// Short-term memory for a single run: the goal, what each iteration did,
/// and what long-term memory recalled at the start.
#[derive(Debug, Clone)]
pub struct SessionMemory {
    goal: String,
    records: Vec<IterationRecord>,
    recalled: Vec<MemoryEntry>,
}

impl SessionMemory {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            records: Vec::new(),
            recalled: Vec::new(),
        }
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn push(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// The last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> &[IterationRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    pub fn set_recalled(&mut self, entries: Vec<MemoryEntry>) {
        self.recalled = entries;
    }

    pub fn recalled(&self) -> &[MemoryEntry] {
        &self.recalled
    }

    pub fn into_records(self) -> Vec<IterationRecord> {
        self.records
    }
}
