// Copyright 2025 Cornell University
// released under MIT License

//! Consistency checks run on every assembled network before it can be
//! serialized. The builders are expected to satisfy all of them; a failure
//! here is a generator bug and aborts the run.

use crate::errors::{GenerateError, GenerateResult};
use crate::ir::{Bit, Polarity, SyncLabel, Template};
use crate::network::Network;
use rustc_hash::{FxHashMap, FxHashSet};

pub fn check_network(network: &Network) -> GenerateResult<()> {
    network.declarations.check()?;
    check_global_names(network)?;
    for tpl in network.templates() {
        check_template_structure(tpl)?;
    }
    check_channel_vocabulary(network)?;
    check_system(network)?;
    check_single_writer(network)?;
    check_duality(network)
}

/// Exactly one valid initial location, no dangling transition endpoints,
/// and every other location can be entered and left. Two locations sharing a
/// name are a `NameCollision`.
pub fn check_template_structure(tpl: &Template) -> GenerateResult<()> {
    let malformed = |reason: String| GenerateError::MalformedTemplate {
        template: tpl.name.clone(),
        reason,
    };

    if !tpl.is_valid_location(tpl.init()) {
        return Err(malformed("initial location does not exist".to_string()));
    }
    for (id, t) in tpl.transitions() {
        if !tpl.is_valid_location(t.source) || !tpl.is_valid_location(t.target) {
            return Err(malformed(format!("{id} connects unknown locations")));
        }
    }

    // the first location carrying a name owns it
    for (id, loc) in tpl.locations() {
        if tpl.location_by_name(loc.name()) != Some(id) {
            return Err(GenerateError::NameCollision {
                name: loc.name().to_string(),
                first: "location".to_string(),
                second: "location".to_string(),
            });
        }
    }

    let degrees = tpl.degrees();
    for (id, loc) in tpl.locations().filter(|(id, _)| *id != tpl.init()) {
        let reason = match degrees[id] {
            (0, _) => "is unreachable",
            (_, 0) => "is a dead end",
            _ => continue,
        };
        return Err(malformed(format!("location `{}` {reason}", loc.name())));
    }
    Ok(())
}

/// Templates, constants, variables, channels and buffer instances share
/// UPPAAL's global scope, so all of their names must be distinct. A clash can
/// come from a valid configuration (a signal named `env` or `ch_start`); the
/// error carries no source location.
pub fn check_global_names(network: &Network) -> GenerateResult<()> {
    let decls = &network.declarations;
    let named = network
        .templates()
        .map(|t| (t.name.as_str(), "template"))
        .chain(decls.constants().iter().map(|c| (c.name.as_str(), "constant")))
        .chain(decls.variables().map(|v| (v, "variable")))
        .chain(decls.channels().map(|c| (c, "channel")))
        .chain(
            decls
                .instances()
                .iter()
                .map(|i| (i.name.as_str(), "buffer instance")),
        );

    let mut seen: FxHashMap<&str, &str> = FxHashMap::default();
    for (name, kind) in named {
        if let Some(first) = seen.insert(name, kind) {
            return Err(GenerateError::NameCollision {
                name: name.to_string(),
                first: first.to_string(),
                second: kind.to_string(),
            });
        }
    }
    Ok(())
}

/// Stub transitions may only use declared channels; the buffer template may
/// only use its own parameters; every declared channel must be used.
pub fn check_channel_vocabulary(network: &Network) -> GenerateResult<()> {
    let declared: FxHashSet<&str> = network.declarations.channels().collect();
    let mut used: FxHashSet<&str> = FxHashSet::default();

    for tpl in [&network.controller, &network.environment] {
        for (_, t) in tpl.transitions() {
            let Some(sync) = &t.sync else { continue };
            if !declared.contains(sync.channel.as_str()) {
                return Err(GenerateError::UndeclaredChannel {
                    template: tpl.name.clone(),
                    channel: sync.channel.clone(),
                });
            }
            used.insert(sync.channel.as_str());
        }
    }

    if let Some(buffer) = &network.buffer {
        for (_, t) in buffer.transitions() {
            let Some(sync) = &t.sync else { continue };
            if !buffer.parameters.contains(&sync.channel) {
                return Err(GenerateError::UndeclaredChannel {
                    template: buffer.name.clone(),
                    channel: sync.channel.clone(),
                });
            }
        }
    }

    for instance in network.declarations.instances() {
        for arg in &instance.args {
            if !declared.contains(arg.as_str()) {
                return Err(GenerateError::UndeclaredChannel {
                    template: instance.name.clone(),
                    channel: arg.clone(),
                });
            }
            used.insert(arg.as_str());
        }
    }

    match network.declarations.channels().find(|c| !used.contains(c)) {
        Some(channel) => Err(GenerateError::UnusedChannel {
            channel: channel.to_string(),
        }),
        None => Ok(()),
    }
}

/// Buffer instances must instantiate the buffer template with one argument
/// per parameter, and the system line must list exactly the environment,
/// the controller and every buffer instance.
pub fn check_system(network: &Network) -> GenerateResult<()> {
    let instances = network.declarations.instances();
    if !instances.is_empty() && network.buffer.is_none() {
        return Err(GenerateError::MalformedSystem(
            "buffer instances declared without a buffer template".to_string(),
        ));
    }
    if let Some(buffer) = &network.buffer {
        for instance in instances {
            if instance.template != buffer.name {
                return Err(GenerateError::MalformedSystem(format!(
                    "`{}` instantiates unknown template `{}`",
                    instance.name, instance.template
                )));
            }
            if instance.args.len() != buffer.parameters.len() {
                return Err(GenerateError::MalformedSystem(format!(
                    "`{}` binds {} channels but `{}` takes {}",
                    instance.name,
                    instance.args.len(),
                    buffer.name,
                    buffer.parameters.len()
                )));
            }
        }
    }

    let expected: Vec<&str> = [
        network.environment.name.as_str(),
        network.controller.name.as_str(),
    ]
    .into_iter()
    .chain(instances.iter().map(|i| i.name.as_str()))
    .collect();
    let actual: Vec<&str> = network.system.instances().iter().map(|s| s.as_str()).collect();
    if expected != actual {
        return Err(GenerateError::MalformedSystem(format!(
            "expected `{}`, found `{}`",
            expected.join(", "),
            actual.join(", ")
        )));
    }
    Ok(())
}

/// Every value variable is assigned by exactly one stub and tested only by
/// the other one.
pub fn check_single_writer(network: &Network) -> GenerateResult<()> {
    let stubs = [&network.controller, &network.environment];
    for var in network.declarations.variables() {
        let writes = |tpl: &Template| {
            tpl.transitions()
                .any(|(_, t)| t.assigned().is_some_and(|(v, _)| v == var))
        };
        let reads = |tpl: &Template| {
            tpl.transitions()
                .any(|(_, t)| t.tested().is_some_and(|(v, _)| v == var))
        };
        let writers = stubs.iter().filter(|t| writes(**t)).count();
        let readers = stubs.iter().filter(|t| reads(**t)).count();
        let writer_also_reads = stubs.iter().any(|t| writes(*t) && reads(*t));
        if writers != 1 || readers != 1 || writer_also_reads {
            return Err(GenerateError::WriterConflict {
                var: var.to_string(),
                writers,
                readers,
            });
        }
    }
    Ok(())
}

/// Send/receive duality between the two stubs. A send of value `v` on `c` in
/// one stub must meet exactly one receive guarded on `v` in the other stub,
/// on `c` itself or, in the buffered scheme, on the channel a buffer relays
/// `c` to. The same holds in reverse for every receive.
pub fn check_duality(network: &Network) -> GenerateResult<()> {
    let mut downstream: FxHashMap<&str, &str> = FxHashMap::default();
    let mut upstream: FxHashMap<&str, &str> = FxHashMap::default();
    for instance in network.declarations.instances() {
        if let [from, to] = instance.args.as_slice() {
            downstream.insert(from.as_str(), to.as_str());
            upstream.insert(to.as_str(), from.as_str());
        }
    }

    let pairs = [
        (&network.controller, &network.environment),
        (&network.environment, &network.controller),
    ];
    for (this, other) in pairs {
        for t in this.syncs(Polarity::Send) {
            let (channel, value) = sync_value(this, t.sync.as_ref(), t.assigned())?;
            let partner = downstream.get(channel).copied().unwrap_or(channel);
            let matches = count_partners(other, Polarity::Receive, partner, value);
            if matches != 1 {
                return Err(unmatched(this, channel, Polarity::Send, value, matches));
            }
        }
        for t in this.syncs(Polarity::Receive) {
            let (channel, value) = sync_value(this, t.sync.as_ref(), t.tested())?;
            let partner = upstream.get(channel).copied().unwrap_or(channel);
            let matches = count_partners(other, Polarity::Send, partner, value);
            if matches != 1 {
                return Err(unmatched(this, channel, Polarity::Receive, value, matches));
            }
        }
    }
    Ok(())
}

fn sync_value<'a>(
    tpl: &Template,
    sync: Option<&'a SyncLabel>,
    value: Option<(&str, Bit)>,
) -> GenerateResult<(&'a str, Bit)> {
    match (sync, value) {
        (Some(sync), Some((_, value))) => Ok((sync.channel.as_str(), value)),
        _ => Err(GenerateError::MalformedTemplate {
            template: tpl.name.clone(),
            reason: "synchronizing transition carries no signal value".to_string(),
        }),
    }
}

fn count_partners(tpl: &Template, polarity: Polarity, channel: &str, value: Bit) -> usize {
    tpl.syncs(polarity)
        .filter(|t| t.sync.as_ref().is_some_and(|s| s.channel == channel))
        .filter(|t| {
            let v = match polarity {
                Polarity::Send => t.assigned(),
                Polarity::Receive => t.tested(),
            };
            v.is_some_and(|(_, v)| v == value)
        })
        .count()
}

fn unmatched(
    tpl: &Template,
    channel: &str,
    polarity: Polarity,
    value: Bit,
    matches: usize,
) -> GenerateError {
    GenerateError::UnmatchedSync {
        template: tpl.name.clone(),
        channel: channel.to_string(),
        polarity,
        value: value.as_int().to_string(),
        matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelScheme, GeneratorConfig};
    use crate::ir::{Location, Transition, Update};
    use crate::network::generate;
    use crate::signal::SignalInterface;

    fn network(scheme: ChannelScheme) -> Network {
        let sigs = SignalInterface::new(
            vec!["start".to_string(), "estop".to_string()],
            vec!["ready".to_string()],
        )
        .unwrap();
        generate(&sigs, &GeneratorConfig::with_scheme(scheme)).unwrap()
    }

    #[test]
    fn generated_networks_pass() {
        for scheme in [ChannelScheme::Direct, ChannelScheme::Buffered] {
            assert_eq!(check_network(&network(scheme)), Ok(()));
        }
    }

    #[test]
    fn dead_end_is_reported() {
        let mut tpl = Template::new("broken", Location::new("idle"));
        let stuck = tpl.add_location(Location::committed("stuck"));
        tpl.add_transition(Transition::new(tpl.init(), stuck));
        let err = check_template_structure(&tpl).unwrap_err();
        assert_eq!(
            err,
            GenerateError::MalformedTemplate {
                template: "broken".to_string(),
                reason: "location `stuck` is a dead end".to_string()
            }
        );
    }

    #[test]
    fn unreachable_location_is_reported() {
        let mut tpl = Template::new("broken", Location::new("idle"));
        let island = tpl.add_location(Location::new("island"));
        tpl.add_transition(Transition::new(island, tpl.init()));
        assert!(matches!(
            check_template_structure(&tpl),
            Err(GenerateError::MalformedTemplate { reason, .. }) if reason.contains("unreachable")
        ));
    }

    #[test]
    fn duplicate_location_name_is_reported() {
        let mut tpl = Template::new("broken", Location::new("idle"));
        let twin = tpl.add_location(Location::committed("idle"));
        tpl.add_transition(Transition::new(tpl.init(), twin));
        tpl.add_transition(Transition::new(twin, tpl.init()));
        assert_eq!(
            check_template_structure(&tpl),
            Err(GenerateError::NameCollision {
                name: "idle".to_string(),
                first: "location".to_string(),
                second: "location".to_string(),
            })
        );
    }

    #[test]
    fn missing_receive_breaks_duality() {
        let mut net = network(ChannelScheme::Direct);
        // drop every receive of `ready` from the environment
        let env = &net.environment;
        let mut pruned = Template::new(env.name.clone(), Location::new("idle"));
        let mut map = FxHashMap::default();
        map.insert(env.init(), pruned.init());
        for (id, loc) in env.locations().filter(|(id, _)| *id != env.init()) {
            if !loc.name().starts_with("ready") {
                map.insert(id, pruned.add_location(loc.clone()));
            }
        }
        for (_, t) in env.transitions() {
            if let (Some(&s), Some(&d)) = (map.get(&t.source), map.get(&t.target)) {
                pruned.add_transition(Transition {
                    source: s,
                    target: d,
                    ..t.clone()
                });
            }
        }
        net.environment = pruned;

        let err = check_duality(&net).unwrap_err();
        assert_eq!(
            err,
            GenerateError::UnmatchedSync {
                template: "iut".to_string(),
                channel: "ch_ready".to_string(),
                polarity: Polarity::Send,
                value: "0".to_string(),
                matches: 0,
            }
        );
        assert!(matches!(
            check_single_writer(&net),
            Err(GenerateError::WriterConflict { var, writers: 1, readers: 0 }) if var == "ready"
        ));
    }

    #[test]
    fn buffer_relay_is_followed() {
        let mut net = network(ChannelScheme::Buffered);
        assert_eq!(check_duality(&net), Ok(()));

        // swap one relay around so the controller never hears `start`
        let relay = &net.declarations;
        let mut rebuilt = crate::decls::DeclarationBlock::new();
        for group in relay.groups() {
            rebuilt.group(group.comment.clone(), group.kind, group.names.clone());
        }
        for instance in relay.instances() {
            let mut instance = instance.clone();
            if instance.name == "dly_start" {
                instance.args.reverse();
            }
            rebuilt.instance(instance);
        }
        net.declarations = rebuilt;
        assert!(matches!(
            check_duality(&net),
            Err(GenerateError::UnmatchedSync { channel, .. }) if channel == "ch_start_ctl"
        ));
    }

    #[test]
    fn second_writer_is_reported() {
        let mut net = network(ChannelScheme::Direct);
        let idle = net.controller.init();
        let extra = net.controller.add_location(Location::committed("hijack"));
        net.controller.add_transition(
            Transition::new(idle, extra)
                .with_update(Update::Assign {
                    var: "start".to_string(),
                    value: Bit::One,
                })
                .with_sync(SyncLabel::send("ch_start")),
        );
        net.controller.add_transition(Transition::new(extra, idle));
        assert!(matches!(
            check_single_writer(&net),
            Err(GenerateError::WriterConflict { var, writers: 2, .. }) if var == "start"
        ));
    }

    #[test]
    fn undeclared_channel_is_reported() {
        let mut net = network(ChannelScheme::Direct);
        let idle = net.environment.init();
        let extra = net.environment.add_location(Location::committed("ghost"));
        net.environment.add_transition(
            Transition::new(idle, extra).with_sync(SyncLabel::send("ch_ghost")),
        );
        net.environment.add_transition(Transition::new(extra, idle));
        assert_eq!(
            check_channel_vocabulary(&net),
            Err(GenerateError::UndeclaredChannel {
                template: "env".to_string(),
                channel: "ch_ghost".to_string()
            })
        );
    }

    #[test]
    fn system_line_must_list_every_instance() {
        let mut net = network(ChannelScheme::Direct);
        net.buffer = None;
        assert_eq!(check_system(&net), Ok(()));
        let mut broken = net.clone();
        broken.controller.name = "plc".to_string();
        assert!(matches!(
            check_system(&broken),
            Err(GenerateError::MalformedSystem(_))
        ));
    }
}
