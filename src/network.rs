// Copyright 2025 Cornell University
// released under MIT License

use crate::buffer::build_buffer_template;
use crate::config::GeneratorConfig;
use crate::decls::{build_declarations, DeclarationBlock};
use crate::errors::GenerateResult;
use crate::ir::Template;
use crate::signal::{Role, SignalInterface};
use crate::static_checks::check_network;
use crate::stub::build_stub;
use itertools::Itertools;
use log::info;

/// The automaton instances that run concurrently, in `system` line order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemComposition {
    instances: Vec<String>,
}

impl SystemComposition {
    pub fn instances(&self) -> &[String] {
        &self.instances
    }

    pub fn render(&self) -> String {
        format!("system {};\n", self.instances.iter().join(", "))
    }
}

/// A complete, validated automaton network ready to be serialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub controller: Template,
    pub environment: Template,
    pub buffer: Option<Template>,
    pub declarations: DeclarationBlock,
    pub system: SystemComposition,
}

impl Network {
    /// Templates in document order: controller, environment, buffer
    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        [&self.controller, &self.environment]
            .into_iter()
            .chain(self.buffer.as_ref())
    }

    /// The `<system>` text: buffer instantiations followed by the system line
    pub fn render_system(&self) -> String {
        let mut out = String::new();
        if !self.declarations.instances().is_empty() {
            out.push_str("// delay buffers\n");
            out.push_str(&self.declarations.render_instances());
            out.push('\n');
        }
        out.push_str("// templates in the system\n");
        out.push_str(&self.system.render());
        out
    }
}

/// Composes the stubs, the optional buffer template and the declarations
/// into a network. Instances are composed as: environment, controller, then
/// one buffer instance per signal in declaration order. The result is
/// validated before it is returned.
pub fn assemble(
    controller: Template,
    environment: Template,
    buffer: Option<Template>,
    declarations: DeclarationBlock,
) -> GenerateResult<Network> {
    let instances = [environment.name.clone(), controller.name.clone()]
        .into_iter()
        .chain(declarations.instances().iter().map(|i| i.name.clone()))
        .collect();
    let network = Network {
        controller,
        environment,
        buffer,
        declarations,
        system: SystemComposition { instances },
    };
    check_network(&network)?;
    Ok(network)
}

/// Generates the full network for `signals`
pub fn generate(signals: &SignalInterface, config: &GeneratorConfig) -> GenerateResult<Network> {
    info!(
        "generating {:?} network for {} inputs and {} outputs",
        config.scheme,
        signals.inputs().len(),
        signals.outputs().len()
    );
    let controller = build_stub(signals, Role::Controller, config);
    let environment = build_stub(signals, Role::Environment, config);
    let buffer = config.is_buffered().then(|| build_buffer_template(config));
    let declarations = build_declarations(signals, config)?;
    let network = assemble(controller, environment, buffer, declarations)?;
    info!(
        "network has {} templates, {} transitions and {} instances",
        network.templates().count(),
        network
            .templates()
            .map(|t| t.num_transitions())
            .sum::<usize>(),
        network.system.instances().len()
    );
    Ok(network)
}
