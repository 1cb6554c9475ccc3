pub(crate) mod backfill;
pub(crate) mod migrate;
pub(crate) mod sync;
