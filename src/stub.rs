// Copyright 2025 Cornell University
// released under MIT License

use crate::config::GeneratorConfig;
use crate::ir::*;
use crate::naming::{channel_name, location_name};
use crate::signal::{Role, SignalInterface};
use log::debug;

/// Labels of a single signal event
struct Event {
    guard: Option<Guard>,
    update: Option<Update>,
    sync: SyncLabel,
}

/// Adds `source -> location -> source`, where `location` is a fresh committed
/// location and the first transition carries the event's labels. The
/// committed location keeps every event a separate, traceable step.
fn add_event(tpl: &mut Template, source: LocationId, name: String, event: Event) -> LocationId {
    let location = tpl.add_location(Location::committed(name));
    let mut arrive = Transition::new(source, location).with_sync(event.sync);
    arrive.guard = event.guard;
    arrive.update = event.update;
    tpl.add_transition(arrive);
    tpl.add_transition(Transition::new(location, source));
    location
}

/// Builds the stub automaton for one side of the interface.
///
/// For every signal, in interface order, two events are generated (value 0,
/// then value 1). Signals the role drives are assigned and announced with a
/// send; signals the role reacts to are tested in a guard and received.
/// Calling this with both roles on the same interface yields send/receive
/// duals.
pub fn build_stub(signals: &SignalInterface, role: Role, config: &GeneratorConfig) -> Template {
    let mut tpl = Template::new(config.template_name(role), Location::new("idle"));
    let idle = tpl.init();

    for signal in signals.iter() {
        let name = signal.name();
        let channel = channel_name(name, config.scheme, role);
        let drives = role.drives(signal.dir());
        for value in Bit::ALL {
            let event = if drives {
                Event {
                    guard: None,
                    update: Some(Update::Assign {
                        var: name.to_string(),
                        value,
                    }),
                    sync: SyncLabel::send(channel.clone()),
                }
            } else {
                Event {
                    guard: Some(Guard::Equals {
                        var: name.to_string(),
                        value,
                    }),
                    update: None,
                    sync: SyncLabel::receive(channel.clone()),
                }
            };
            add_event(&mut tpl, idle, location_name(name, value), event);
        }
        debug!(
            "{}: {} {} `{}` on `{}`",
            tpl.name,
            if drives { "drives" } else { "reacts to" },
            signal.dir(),
            name,
            channel
        );
    }

    tpl
}
