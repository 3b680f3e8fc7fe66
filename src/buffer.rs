// Copyright 2025 Cornell University
// released under MIT License

use crate::config::{GeneratorConfig, BUFFER_CLOCK, BUFFER_IN, BUFFER_OUT, DELAY_CONSTANT};
use crate::ir::*;

/// Builds the reusable delay buffer: a relay that accepts an event on its
/// `in` channel and re-emits it on `out` at most `DELAY` time units later.
/// There is no lower bound, so the relay may also forward immediately.
///
/// One definition is shared by all buffer instances; each instance binds its
/// own channel pair and gets its own copy of the local clock.
pub fn build_buffer_template(config: &GeneratorConfig) -> Template {
    let mut tpl = Template::new(config.buffer_name.as_str(), Location::new("idle"));
    tpl.parameters = vec![BUFFER_IN.to_string(), BUFFER_OUT.to_string()];
    tpl.clocks = vec![BUFFER_CLOCK.to_string()];

    let idle = tpl.init();
    let in_transit = tpl.add_location(Location::new("in_transit").with_invariant(
        Invariant::ClockAtMost {
            clock: BUFFER_CLOCK.to_string(),
            bound: DELAY_CONSTANT.to_string(),
        },
    ));

    tpl.add_transition(
        Transition::new(idle, in_transit)
            .with_update(Update::ResetClock {
                clock: BUFFER_CLOCK.to_string(),
            })
            .with_sync(SyncLabel::receive(BUFFER_IN)),
    );
    tpl.add_transition(Transition::new(in_transit, idle).with_sync(SyncLabel::send(BUFFER_OUT)));

    tpl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_shape() {
        let tpl = build_buffer_template(&GeneratorConfig::default());
        assert_eq!(tpl.name, "dly");
        assert_eq!(tpl.parameters, vec!["in", "out"]);
        assert_eq!(tpl.clocks, vec!["x"]);
        assert_eq!(tpl.num_locations(), 2);
        assert_eq!(tpl.num_transitions(), 2);

        let idle = tpl.init();
        let in_transit = tpl.location_by_name("in_transit").unwrap();
        assert_eq!(tpl[idle].invariant(), None);
        assert!(!tpl[in_transit].is_committed());
        assert_eq!(
            tpl[in_transit].invariant(),
            Some(&Invariant::ClockAtMost {
                clock: "x".to_string(),
                bound: "DELAY".to_string()
            })
        );

        let receive: Vec<_> = tpl.syncs(Polarity::Receive).collect();
        assert_eq!(receive.len(), 1);
        assert_eq!(receive[0].source, idle);
        assert_eq!(receive[0].target, in_transit);
        assert_eq!(
            receive[0].update,
            Some(Update::ResetClock {
                clock: "x".to_string()
            })
        );
        assert_eq!(receive[0].guard, None);

        let send: Vec<_> = tpl.syncs(Polarity::Send).collect();
        assert_eq!(send.len(), 1);
        assert_eq!(send[0].source, in_transit);
        assert_eq!(send[0].target, idle);
        assert_eq!(send[0].guard, None);
        assert_eq!(send[0].sync, Some(SyncLabel::send("out")));
    }
}
