pub mod live;

// Re-export commonly used types for convenience
pub use live::{
    ControlMessage, FunctionCall, FunctionResult, GeminiConnector, LiveError, LiveEvent,
    LiveResult, SetupConfig, UpstreamConnector, UpstreamHandle, UpstreamSession,
};
