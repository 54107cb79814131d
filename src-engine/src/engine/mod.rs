//! Transcription engine core: invocation safety, output capture, and the
//! service facade.

pub mod capture;
pub mod invoker;
pub mod service;
