// Copyright 2025 Cornell University
// released under MIT License

use crate::signal::Role;

/// How stub automata are connected to each other
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ChannelScheme {
    /// Both stubs share one channel per signal; events are instantaneous
    Direct,
    /// Every signal is relayed through its own delay buffer instance
    #[default]
    Buffered,
}

/// Name of the constant bounding the latency of a delay buffer
pub const DELAY_CONSTANT: &str = "DELAY";
/// Local clock of the delay buffer template
pub const BUFFER_CLOCK: &str = "x";
/// Channel parameters of the delay buffer template
pub const BUFFER_IN: &str = "in";
pub const BUFFER_OUT: &str = "out";

/// Settings shared by every stage of the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub scheme: ChannelScheme,
    /// Worst-case latency of a delay buffer, in model time units
    pub delay: u32,
    pub controller_name: String,
    pub environment_name: String,
    pub buffer_name: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            scheme: ChannelScheme::default(),
            delay: 1000,
            controller_name: "iut".to_string(),
            environment_name: "env".to_string(),
            buffer_name: "dly".to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn with_scheme(scheme: ChannelScheme) -> Self {
        Self {
            scheme,
            ..Default::default()
        }
    }

    pub fn template_name(&self, role: Role) -> &str {
        match role {
            Role::Controller => &self.controller_name,
            Role::Environment => &self.environment_name,
        }
    }

    pub fn is_buffered(&self) -> bool {
        self.scheme == ChannelScheme::Buffered
    }
}
