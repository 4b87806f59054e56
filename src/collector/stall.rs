/// Counts consecutive scrolls that did not grow the page.
#[derive(Debug, Clone)]
pub struct StallDetector {
    last_height: u64,
    stalls: u32,
    limit: u32,
}

impl StallDetector {
    pub fn new(initial_height: u64, limit: u32) -> Self {
        Self {
            last_height: initial_height,
            stalls: 0,
            limit,
        }
    }

    /// Record the height after a scroll. Returns `true` once the page has
    /// stopped growing for more than `limit` consecutive scrolls.
    pub fn observe(&mut self, height: u64) -> bool {
        if height == self.last_height {
            self.stalls += 1;
        } else {
            self.stalls = 0;
            self.last_height = height;
        }
        self.stalls > self.limit
    }

    pub fn stalls(&self) -> u32 {
        self.stalls
    }

    pub fn last_height(&self) -> u64 {
        self.last_height
    }
}
