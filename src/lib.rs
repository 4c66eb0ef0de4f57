//! Desktop uploader that sends research data files to project storage on a
//! data streamer server.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod files;
pub mod selection;
pub mod upload;
