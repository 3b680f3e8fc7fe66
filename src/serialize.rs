// Copyright 2025 Cornell University
// released under MIT License

use crate::errors::SerializeError;
use crate::ir::*;
use crate::network::Network;
use crate::signal::Dir;
use crate::static_checks::check_network;
use cranelift_entity::{EntityRef, SecondaryMap};
use itertools::Itertools;
use std::io::Write;

/// Horizontal distance between event locations
const SPACING: i64 = 150;
/// Vertical distance between the initial location and the event row
const ROW: i64 = 200;
/// Horizontal offset of the nail that bends a return transition
const BEND: i64 = 40;

/// Serializes a validated network to a UPPAAL document in a `String`
pub fn serialize_to_string(network: &Network) -> Result<String, SerializeError> {
    let mut out = Vec::new();
    serialize(&mut out, network)?;
    let out = String::from_utf8(out)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(out)
}

/// Writes `network` as a UPPAAL flat-system XML document. The network is
/// checked again first; nothing is written if it is inconsistent.
pub fn serialize(out: &mut impl Write, network: &Network) -> Result<(), SerializeError> {
    check_network(network)?;
    let global = network.declarations.render_global()?;

    writeln!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
    writeln!(
        out,
        "<!DOCTYPE nta PUBLIC '-//Uppaal Team//DTD Flat System 1.1//EN' \
         'http://www.it.uu.se/research/group/darts/uppaal/flat-1_2.dtd'>"
    )?;
    writeln!(out, "<nta>")?;
    writeln!(out, "\t<declaration>{}</declaration>", escape(&global))?;

    // location ids are unique across the whole document
    let mut next_id = 0;
    for tpl in network.templates() {
        serialize_template(out, tpl, next_id)?;
        next_id += tpl.num_locations();
    }

    writeln!(out, "\t<system>{}</system>", escape(&network.render_system()))?;
    writeln!(out, "\t<queries/>")?;
    writeln!(out, "</nta>")?;
    Ok(())
}

fn serialize_template(out: &mut impl Write, tpl: &Template, base: usize) -> std::io::Result<()> {
    let id = |loc: LocationId| format!("id{}", base + loc.index());
    let pos = layout(tpl);

    writeln!(out, "\t<template>")?;
    writeln!(out, "\t\t<name x=\"5\" y=\"5\">{}</name>", escape(&tpl.name))?;
    if !tpl.parameters.is_empty() {
        let params = tpl
            .parameters
            .iter()
            .map(|p| format!("broadcast chan &{p}"))
            .join(", ");
        writeln!(out, "\t\t<parameter>{}</parameter>", escape(&params))?;
    }
    if !tpl.clocks.is_empty() {
        writeln!(
            out,
            "\t\t<declaration>clock {};</declaration>",
            tpl.clocks.iter().join(", ")
        )?;
    }

    for (loc_id, loc) in tpl.locations() {
        let (x, y) = pos[loc_id];
        writeln!(out, "\t\t<location id=\"{}\" x=\"{x}\" y=\"{y}\">", id(loc_id))?;
        writeln!(
            out,
            "\t\t\t<name x=\"{}\" y=\"{}\">{}</name>",
            x - 20,
            y + 12,
            escape(loc.name())
        )?;
        if let Some(inv) = loc.invariant() {
            writeln!(
                out,
                "\t\t\t<label kind=\"invariant\" x=\"{}\" y=\"{}\">{}</label>",
                x - 20,
                y + 29,
                escape(&inv.to_string())
            )?;
        }
        if loc.is_committed() {
            writeln!(out, "\t\t\t<committed/>")?;
        }
        writeln!(out, "\t\t</location>")?;
    }
    writeln!(out, "\t\t<init ref=\"{}\"/>", id(tpl.init()))?;

    for (_, t) in tpl.transitions() {
        let (sx, sy) = pos[t.source];
        let (tx, ty) = pos[t.target];
        // transitions back to the initial location are bent so they do not
        // overlap the way out
        let nail = (t.target == tpl.init()).then(|| ((sx + tx) / 2 + BEND, (sy + ty) / 2));
        let (ax, ay) = nail.unwrap_or((tx + 5, ty - 85));

        writeln!(out, "\t\t<transition>")?;
        writeln!(out, "\t\t\t<source ref=\"{}\"/>", id(t.source))?;
        writeln!(out, "\t\t\t<target ref=\"{}\"/>", id(t.target))?;
        let labels = [
            ("guard", t.guard.as_ref().map(|g| g.to_string())),
            ("synchronisation", t.sync.as_ref().map(|s| s.to_string())),
            ("assignment", t.update.as_ref().map(|u| u.to_string())),
        ];
        for (row, (kind, text)) in labels
            .into_iter()
            .filter_map(|(kind, text)| text.map(|text| (kind, text)))
            .enumerate()
        {
            writeln!(
                out,
                "\t\t\t<label kind=\"{kind}\" x=\"{ax}\" y=\"{}\">{}</label>",
                ay + 17 * row as i64,
                escape(&text)
            )?;
        }
        if let Some((nx, ny)) = nail {
            writeln!(out, "\t\t\t<nail x=\"{nx}\" y=\"{ny}\"/>")?;
        }
        writeln!(out, "\t\t</transition>")?;
    }
    writeln!(out, "\t</template>")?;
    Ok(())
}

/// The initial location sits at the origin, every other location in one row
/// below it, centered.
fn layout(tpl: &Template) -> SecondaryMap<LocationId, (i64, i64)> {
    let mut pos = SecondaryMap::new();
    let others = tpl
        .locations()
        .map(|(id, _)| id)
        .filter(|id| *id != tpl.init())
        .collect::<Vec<_>>();
    let width = (others.len() as i64 - 1).max(0) * SPACING;
    for (i, id) in others.into_iter().enumerate() {
        pos[id] = (i as i64 * SPACING - width / 2, ROW);
    }
    pos[tpl.init()] = (0, 0);
    pos
}

/// Escapes character data for use inside an XML element
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

impl std::fmt::Display for Bit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_int())
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Send => write!(f, "send"),
            Polarity::Receive => write!(f, "receive"),
        }
    }
}

/// Pretty-printer for sync labels in UPPAAL syntax: `ch!` or `ch?`
impl std::fmt::Display for SyncLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.polarity {
            Polarity::Send => write!(f, "{}!", self.channel),
            Polarity::Receive => write!(f, "{}?", self.channel),
        }
    }
}

impl std::fmt::Display for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Guard::Equals { var, value } => write!(f, "{var} == {value}"),
        }
    }
}

impl std::fmt::Display for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Update::Assign { var, value } => write!(f, "{var} := {value}"),
            Update::ResetClock { clock } => write!(f, "{clock} := 0"),
        }
    }
}

impl std::fmt::Display for Invariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invariant::ClockAtMost { clock, bound } => write!(f, "{clock} <= {bound}"),
        }
    }
}

/// Pretty prints a `Direction`
impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dir::In => write!(f, "input"),
            Dir::Out => write!(f, "output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelScheme, GeneratorConfig};
    use crate::errors::GenerateError;
    use crate::network::generate;
    use crate::signal::SignalInterface;

    fn start_ready(scheme: ChannelScheme) -> String {
        let sigs =
            SignalInterface::new(vec!["start".to_string()], vec!["ready".to_string()]).unwrap();
        let network = generate(&sigs, &GeneratorConfig::with_scheme(scheme)).unwrap();
        serialize_to_string(&network).unwrap()
    }

    #[test]
    fn labels_use_uppaal_syntax() {
        assert_eq!(SyncLabel::send("ch_a").to_string(), "ch_a!");
        assert_eq!(SyncLabel::receive("ch_a").to_string(), "ch_a?");
        let guard = Guard::Equals {
            var: "a".to_string(),
            value: Bit::One,
        };
        assert_eq!(guard.to_string(), "a == 1");
        let update = Update::Assign {
            var: "a".to_string(),
            value: Bit::Zero,
        };
        assert_eq!(update.to_string(), "a := 0");
        let reset = Update::ResetClock {
            clock: "x".to_string(),
        };
        assert_eq!(reset.to_string(), "x := 0");
        let inv = Invariant::ClockAtMost {
            clock: "x".to_string(),
            bound: "DELAY".to_string(),
        };
        assert_eq!(inv.to_string(), "x <= DELAY");
        assert_eq!(Polarity::Receive.to_string(), "receive");
    }

    #[test]
    fn escape_markup() {
        assert_eq!(escape("x <= DELAY && y > 0"), "x &lt;= DELAY &amp;&amp; y &gt; 0");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn direct_document() {
        let xml = start_ready(ChannelScheme::Direct);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE nta"));
        assert!(xml.contains("flat-1_2.dtd"));
        assert_eq!(xml.matches("<template>").count(), 2);
        assert_eq!(xml.matches("<location ").count(), 10);
        assert_eq!(xml.matches("<committed/>").count(), 8);
        assert_eq!(xml.matches("<transition>").count(), 16);
        assert_eq!(xml.matches("<nail ").count(), 8);
        assert!(xml.contains("<init ref=\"id0\"/>"));
        assert!(xml.contains("<init ref=\"id5\"/>"));
        assert!(!xml.contains("id10"));
        assert!(xml.contains(">start == 0</label>"));
        assert!(xml.contains(">ch_start?</label>"));
        assert!(xml.contains(">ch_ready!</label>"));
        assert!(xml.contains(">ready := 1</label>"));
        assert!(xml.contains("<name x=\"5\" y=\"5\">iut</name>"));
        assert!(xml.contains("<system>// templates in the system\nsystem env, iut;\n</system>"));
        assert!(xml.ends_with("\t<queries/>\n</nta>\n"));
        assert!(!xml.contains("DELAY"));
    }

    #[test]
    fn buffered_document() {
        let xml = start_ready(ChannelScheme::Buffered);
        assert_eq!(xml.matches("<template>").count(), 3);
        assert!(xml.contains("const int DELAY = 1000;"));
        assert!(xml.contains(
            "<parameter>broadcast chan &amp;in, broadcast chan &amp;out</parameter>"
        ));
        assert!(xml.contains("<declaration>clock x;</declaration>"));
        assert!(xml.contains(">x &lt;= DELAY</label>"));
        assert!(xml.contains(">x := 0</label>"));
        assert!(xml.contains("<init ref=\"id10\"/>"));
        assert!(xml.contains("id=\"id11\""));
        assert!(!xml.contains("id12"));
        assert!(xml.contains("dly_start = dly(ch_start_env, ch_start_ctl);"));
        assert!(xml.contains("system env, iut, dly_start, dly_ready;"));
    }

    #[test]
    fn output_is_deterministic() {
        for scheme in [ChannelScheme::Direct, ChannelScheme::Buffered] {
            assert_eq!(start_ready(scheme), start_ready(scheme));
        }
    }

    #[test]
    fn event_row_is_centered() {
        let sigs =
            SignalInterface::new(vec!["start".to_string()], vec!["ready".to_string()]).unwrap();
        let network = generate(&sigs, &GeneratorConfig::default()).unwrap();
        let pos = layout(&network.controller);
        let row: Vec<_> = network
            .controller
            .locations()
            .filter(|(id, _)| *id != network.controller.init())
            .map(|(id, _)| pos[id])
            .collect();
        assert_eq!(pos[network.controller.init()], (0, 0));
        assert_eq!(row, vec![(-225, 200), (-75, 200), (75, 200), (225, 200)]);
    }

    #[test]
    fn inconsistent_network_is_not_written() {
        let sigs =
            SignalInterface::new(vec!["start".to_string()], vec!["ready".to_string()]).unwrap();
        let mut network = generate(&sigs, &GeneratorConfig::default()).unwrap();
        network.buffer = None;
        let mut out = Vec::new();
        let err = serialize(&mut out, &network).unwrap_err();
        assert!(matches!(
            err,
            SerializeError::Generate(GenerateError::MalformedSystem(_))
        ));
        assert!(out.is_empty());
    }
}
