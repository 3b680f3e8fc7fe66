// Copyright 2025 Cornell University
// released under MIT License

//! Names of the generated channels, locations and buffer instances.
//!
//! Every derived name embeds the signal name followed by a fixed suffix, and
//! the suffixes used for one kind of name never end the same way. Because
//! signal names are unique, no two (signal, role, value) triples can map to
//! the same name.

use crate::config::ChannelScheme;
use crate::ir::Bit;
use crate::signal::{Dir, Role, Signal};

/// The channel that the stub for `role` synchronizes on for `signal`
pub fn channel_name(signal: &str, scheme: ChannelScheme, role: Role) -> String {
    match (scheme, role) {
        (ChannelScheme::Direct, _) => format!("ch_{signal}"),
        (ChannelScheme::Buffered, Role::Environment) => format!("ch_{signal}_env"),
        (ChannelScheme::Buffered, Role::Controller) => format!("ch_{signal}_ctl"),
    }
}

/// The side that publishes a signal's value
pub fn driver(dir: Dir) -> Role {
    match dir {
        Dir::In => Role::Environment,
        Dir::Out => Role::Controller,
    }
}

/// `(upstream, downstream)` channels bridged by the delay buffer of `signal`.
/// Inputs travel from the environment to the controller, outputs the other way.
pub fn relay(signal: &Signal) -> (String, String) {
    let from = driver(signal.dir());
    let upstream = channel_name(signal.name(), ChannelScheme::Buffered, from);
    let downstream = channel_name(signal.name(), ChannelScheme::Buffered, from.mirror());
    (upstream, downstream)
}

/// All channels declared for `signal`, in declaration order
pub fn channels(signal: &Signal, scheme: ChannelScheme) -> Vec<String> {
    match scheme {
        ChannelScheme::Direct => vec![channel_name(signal.name(), scheme, Role::Controller)],
        ChannelScheme::Buffered => {
            let (upstream, downstream) = relay(signal);
            vec![upstream, downstream]
        }
    }
}

/// Committed location visited after `signal` takes `value`
pub fn location_name(signal: &str, value: Bit) -> String {
    match value {
        Bit::Zero => format!("{signal}_off"),
        Bit::One => format!("{signal}_on"),
    }
}

pub fn buffer_instance_name(signal: &str) -> String {
    format!("dly_{signal}")
}
