//! feedwatch — a chat-bot feed watcher.
//!
//! Polls a set of RSS/Atom feeds on an adaptive interval, detects entries
//! published since the last observation per feed, and delivers newly found
//! entries to every subscribed destination in global chronological order.
//!
//! The crate is organized around one shared mutable resource, the
//! [`registry::Registry`], mutated by the command surface ([`commands`]) and
//! the background poller ([`poller`]). Everything else is a collaborator at a
//! seam: [`feed`] fetches and parses documents, [`auth`] resolves per-URL
//! credentials, and [`transport`] abstracts the chat layer that receives the
//! delivered messages.

pub mod auth;
pub mod commands;
pub mod config;
pub mod feed;
pub mod poller;
pub mod registry;
pub mod transport;
pub mod util;
