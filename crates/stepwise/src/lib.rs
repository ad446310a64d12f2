//! stepwise: a tool-using chat agent
//!
//! The agent loop sends the running transcript to a chat model, reads back
//! one declared step per reply and runs local tools for action steps.

pub mod agent;
pub mod tools;
