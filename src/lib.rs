#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod chat;
pub mod client;
pub mod clock;
pub mod engine;
pub mod event;
pub mod force;
pub mod game;
pub mod highlight;
pub mod history;
pub mod network;
pub mod notification;
pub mod piece;
pub mod session;
pub mod test_util;
pub mod util;
