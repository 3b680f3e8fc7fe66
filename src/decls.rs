// Copyright 2025 Cornell University
// released under MIT License

use crate::config::{GeneratorConfig, DELAY_CONSTANT};
use crate::errors::{GenerateError, GenerateResult};
use crate::naming::{buffer_instance_name, channels, relay};
use crate::signal::{Dir, SignalInterface};
use itertools::Itertools;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// `int[lo,hi]`
    BoundedInt { lo: i64, hi: i64 },
    BroadcastChan,
}

/// One declaration statement listing several names of the same type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclGroup {
    pub comment: String,
    pub kind: DeclKind,
    pub names: Vec<String>,
}

/// `name = template(args...);`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub template: String,
    pub args: Vec<String>,
}

/// Typed global declarations of a network. Entries are accumulated as data
/// and only turned into UPPAAL text by the `render_*` methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationBlock {
    constants: Vec<Constant>,
    groups: Vec<DeclGroup>,
    instances: Vec<Instance>,
}

impl DeclarationBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(&mut self, name: impl Into<String>, value: i64) {
        self.constants.push(Constant {
            name: name.into(),
            value,
        });
    }

    pub fn group(&mut self, comment: impl Into<String>, kind: DeclKind, names: Vec<String>) {
        self.groups.push(DeclGroup {
            comment: comment.into(),
            kind,
            names,
        });
    }

    pub fn instance(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn groups(&self) -> &[DeclGroup] {
        &self.groups
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Names of all declared value variables, in declaration order
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.names_of(|k| matches!(k, DeclKind::BoundedInt { .. }))
    }

    /// Names of all declared channels, in declaration order
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.names_of(|k| *k == DeclKind::BroadcastChan)
    }

    fn names_of(&self, pred: impl Fn(&DeclKind) -> bool) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .filter(move |g| pred(&g.kind))
            .flat_map(|g| g.names.iter().map(|n| n.as_str()))
    }

    /// A declaration statement needs at least one name
    pub fn check(&self) -> GenerateResult<()> {
        match self.groups.iter().find(|g| g.names.is_empty()) {
            Some(group) => Err(GenerateError::EmptyDeclarationList {
                group: group.comment.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Renders the global `<declaration>` text: constants, then every group
    pub fn render_global(&self) -> GenerateResult<String> {
        self.check()?;
        let mut sections = vec![];
        if !self.constants.is_empty() {
            sections.push(format!(
                "// constants\n{}",
                self.constants
                    .iter()
                    .map(|c| format!("const int {} = {};\n", c.name, c.value))
                    .join("")
            ));
        }
        for group in &self.groups {
            let tpe = match group.kind {
                DeclKind::BoundedInt { lo, hi } => format!("int[{lo},{hi}]"),
                DeclKind::BroadcastChan => "broadcast chan".to_string(),
            };
            sections.push(format!(
                "// {}\n{} {};\n",
                group.comment,
                tpe,
                group.names.iter().join(", ")
            ));
        }
        Ok(sections.join("\n"))
    }

    /// Renders one instantiation statement per instance
    pub fn render_instances(&self) -> String {
        self.instances
            .iter()
            .map(|i| format!("{} = {}({});\n", i.name, i.template, i.args.iter().join(", ")))
            .collect()
    }
}

/// Builds the declarations for `signals`: one `int[0,1]` value variable per
/// signal and the broadcast channels of the configured scheme, grouped by
/// direction. The buffered scheme additionally declares the `DELAY` bound
/// and one buffer instance per signal, inputs first.
///
/// Both directions must contain at least one signal.
pub fn build_declarations(
    signals: &SignalInterface,
    config: &GeneratorConfig,
) -> GenerateResult<DeclarationBlock> {
    for (dir, group) in [(Dir::In, "inputs"), (Dir::Out, "outputs")] {
        if signals.by_dir(dir).is_empty() {
            return Err(GenerateError::EmptyDeclarationList {
                group: group.to_string(),
            });
        }
    }

    let mut block = DeclarationBlock::new();
    if config.is_buffered() {
        block.constant(DELAY_CONSTANT, i64::from(config.delay));
    }

    let names = |dir: Dir| {
        signals
            .by_dir(dir)
            .iter()
            .map(|s| s.name().to_string())
            .collect::<Vec<_>>()
    };
    block.group("inputs", DeclKind::BoundedInt { lo: 0, hi: 1 }, names(Dir::In));
    block.group("outputs", DeclKind::BoundedInt { lo: 0, hi: 1 }, names(Dir::Out));

    let chans = |dir: Dir| {
        signals
            .by_dir(dir)
            .iter()
            .flat_map(|s| channels(s, config.scheme))
            .collect::<Vec<_>>()
    };
    block.group("input sync channels", DeclKind::BroadcastChan, chans(Dir::In));
    block.group("output sync channels", DeclKind::BroadcastChan, chans(Dir::Out));

    if config.is_buffered() {
        for signal in signals.iter() {
            let (upstream, downstream) = relay(signal);
            block.instance(Instance {
                name: buffer_instance_name(signal.name()),
                template: config.buffer_name.clone(),
                args: vec![upstream, downstream],
            });
        }
    }

    Ok(block)
}
