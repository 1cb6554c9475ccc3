//! Offset-based pagination cursor.
//!
//! Termination relies on the short-page condition: a page with fewer rows
//! than the batch size is the last one. Pages must therefore be fetched
//! strictly sequentially.

#[derive(Debug)]
pub(crate) struct Pager {
    batch: usize,
    offset: usize,
    done: bool,
}

impl Pager {
    pub(crate) fn new(batch: usize) -> Self {
        // batch 0 would never observe a short page
        Self { batch: batch.max(1), offset: 0, done: false }
    }

    /// `(limit, offset)` for the next page, or `None` after a short page.
    pub(crate) fn next_page(&self) -> Option<(usize, usize)> {
        if self.done { None } else { Some((self.batch, self.offset)) }
    }

    pub(crate) fn record_fetched(&mut self, fetched: usize) {
        self.offset += fetched;
        if fetched < self.batch {
            self.done = true;
        }
    }
}
