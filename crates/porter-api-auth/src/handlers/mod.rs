//! Console API route handlers

pub mod auth;
pub mod command;
pub mod logout;
pub mod session_info;
