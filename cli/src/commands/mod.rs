pub mod builtins;
pub mod edicts;
pub mod functions;
pub mod inspect;
