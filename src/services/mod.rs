//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own frame acquisition and bookkeeping so route handlers
//! can stay focused on protocol translation.

pub mod capture;
