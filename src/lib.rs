//! Thin, retry-aware client for the Google Drive v3 file API.
//!
//! The [`drive::DriveClient`] facade exposes upload, list, metadata,
//! download, update, delete and create-folder operations over a narrow
//! [`drive::port::DrivePort`] trait, with every call routed through a
//! bounded fixed-delay retry executor. Authentication and transport are
//! delegated to yup-oauth2 and reqwest; nothing here reimplements the
//! provider's wire protocol.

pub mod cli;
pub mod config;
pub mod drive;
pub mod error;
pub mod server;
