pub mod embedder;
pub mod memory;
pub mod provider;
pub mod speech;
pub mod tool;

pub use embedder::Embedder;
pub use memory::{Memory, MemoryEntry, select_relevant};
pub use provider::{ChatMessage, ChatRequest, ChatResponse, Provider};
pub use speech::{AudioStream, Speech};
pub use tool::{Tool, ToolResult, ToolSpec};
