//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

pub mod contacts;
pub mod disasters;
pub mod health;
pub mod internal;
pub mod resources;
pub mod rooms;
pub mod tasks;
pub mod ws;
