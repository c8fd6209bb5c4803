//! Cuts app icons out of phone home-screen screenshots.
//!
//! The work happens in three stages: [`detect`] finds icon-shaped regions,
//! [`extract`] cuts each one out with a reference [`mask`], and [`background`]
//! makes the leftover background transparent. [`pipeline`] ties them together and can
//! put the results on a new icon background with [`compose`].

#![forbid(unsafe_code)]

#[cfg(feature = "hardened_malloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod args;
pub mod background;
pub mod compose;
pub mod config;
pub mod decode;
pub mod detect;
pub mod encode;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod help;
pub mod logger;
pub mod mask;
pub mod pipeline;
pub mod utils;
