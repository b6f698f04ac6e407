use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPlan {
    pub total: usize,
    pub batch_size: usize,
    pub batches: Vec<BatchRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRange {
    pub offset: usize, // 0-based inclusive
    pub end: usize,    // exclusive
}

impl BatchRange {
    pub fn len(&self) -> usize {
        self.end - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.offset
    }

    pub fn as_range(&self) -> Range<usize> {
        self.offset..self.end
    }
}

impl BatchPlan {
    pub fn new(total: usize, batch_size: usize) -> BatchPlan {
        let batch_size = batch_size.max(1);
        let mut batches = Vec::with_capacity(total.div_ceil(batch_size));
        let mut offset = 0usize;

        while offset < total {
            let end = (offset + batch_size).min(total);
            batches.push(BatchRange { offset, end });
            offset = end;
        }

        BatchPlan {
            total,
            batch_size,
            batches,
        }
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
