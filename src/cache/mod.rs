pub mod memo_cache;

pub use memo_cache::MemoCache;
