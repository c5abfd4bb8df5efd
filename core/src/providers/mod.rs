pub mod elevenlabs;
pub mod embeddings;
pub mod factory;
pub mod openai;
pub mod retry;

pub use elevenlabs::ElevenLabsVoice;
pub use embeddings::OpenAIEmbedder;
pub use factory::{create_provider, create_speech, required_env_keys};
pub use openai::OpenAIProvider;
pub use retry::{RetryPolicy, RetryingProvider};
