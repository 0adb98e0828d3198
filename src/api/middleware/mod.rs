//! API middleware stack.
//!
//! Execution order on protected routes (outermost → innermost):
//! 1. Audit: logs every request, rejected ones included
//! 2. Auth: token verification, caller lookup
//! 3. Role gate: per route group allow-list

pub mod audit;
pub mod auth;
pub mod role;
