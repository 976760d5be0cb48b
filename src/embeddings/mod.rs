// embeddings/: Skip-gram embedding table training and storage, on candle.
//
// Provides:
// - The two-input cosine classifier over a shared (V+1, D) table
// - The epoch/batch training loop (AdamW)
// - safetensors persistence and nearest-neighbour lookup

pub mod model;
pub mod neighbors;
pub mod store;
pub mod train;
