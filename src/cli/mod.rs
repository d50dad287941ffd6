//! # Command Layer
//!
//! Turns parsed [`Options`](crate::options::Options) into one command and
//! reports its outcome to the user. The configuration core never prints.

pub mod dispatcher;
pub mod handlers;
