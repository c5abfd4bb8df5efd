pub mod agent;
pub mod config;
pub mod error;
pub mod memory;
pub mod providers;
pub mod tools;
pub mod traits;

pub use agent::{AgentLoop, ContextBuilder, Plan, RunOutcome, StopReason, ToolRegistry};
pub use config::{Config, Credentials};
pub use error::{ConfigError, RegistryError, ServiceError};
pub use memory::{SessionMemory, SupabaseMemory, create_memory};
pub use providers::{create_provider, create_speech};
pub use tools::{KnowledgeBaseTool, register_builtin_tools};
pub use traits::{
    ChatMessage, ChatRequest, ChatResponse, Embedder, Memory, MemoryEntry, Provider, Speech, Tool,
    ToolResult, ToolSpec,
};
