// Copyright 2025 Cornell University
// released under MIT License

use crate::diagnostic::{DiagnosticHandler, Level};
use crate::errors::ConfigError;
use crate::signal::{check_identifier, SignalInterface};
use log::{debug, info};
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use rustc_hash::FxHashMap;
use std::path::Path;

#[derive(Parser)]
#[grammar = "config.pest"]
struct ConfigParser;

/// Element path of the controller inputs, below the root element
pub const INPUT_PATH: [&str; 3] = ["STIMPARMS", "PARM", "TAG"];
/// Element path of the controller outputs, below the root element
pub const OUTPUT_PATH: [&str; 3] = ["OBSPARMS", "PARM", "TAG"];

type Span = (usize, usize);

fn span_of(pair: &Pair<'_, Rule>) -> Span {
    let span = pair.as_span();
    (span.start(), span.end())
}

/// Returns the last component of a dot-separated hierarchical tag,
/// e.g. `sensor1` for `a.b.sensor1`
pub fn short_name(path: &str) -> &str {
    path.rsplit_once('.').map_or(path, |(_, leaf)| leaf)
}

#[derive(Debug)]
struct Element<'i> {
    name: &'i str,
    name_span: Span,
    /// Concatenated, unescaped character data of this element
    text: String,
    text_span: Option<Span>,
    children: Vec<Element<'i>>,
}

impl<'i> Element<'i> {
    /// All descendants reached by following `path`, in document order
    fn find_all<'e>(&'e self, path: &[&str]) -> Vec<&'e Element<'i>> {
        match path.split_first() {
            None => vec![self],
            Some((head, rest)) => self
                .children
                .iter()
                .filter(|c| c.name == *head)
                .flat_map(|c| c.find_all(rest))
                .collect(),
        }
    }
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = match entity.strip_prefix("#x") {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => entity.strip_prefix('#')?.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Replaces predefined and numeric character references. Unknown references
/// are kept verbatim.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

struct ConfigContext<'a> {
    source: &'a str,
    fileid: usize,
    handler: &'a mut DiagnosticHandler,
}

impl ConfigContext<'_> {
    fn error(&mut self, err: ConfigError, span: Span) -> ConfigError {
        self.handler
            .emit_diagnostic_span(&err.to_string(), self.fileid, span, Level::Error);
        err
    }

    // Helper for pairs the grammar guarantees
    fn expect_pair<'i>(
        &mut self,
        pair: Option<Pair<'i, Rule>>,
        context: Span,
        message: &str,
    ) -> Result<Pair<'i, Rule>, ConfigError> {
        pair.ok_or_else(|| self.error(ConfigError::Syntax(message.to_string()), context))
    }

    /// Span of the non-whitespace part of `span`
    fn trim_span(&self, (start, end): Span) -> Span {
        let raw = &self.source[start..end];
        if raw.trim().is_empty() {
            return (start, end);
        }
        let leading = raw.len() - raw.trim_start().len();
        let trailing = raw.len() - raw.trim_end().len();
        (start + leading, end - trailing)
    }

    fn element<'i>(&mut self, pair: Pair<'i, Rule>) -> Result<Element<'i>, ConfigError> {
        let context = span_of(&pair);
        let mut inner = pair.into_inner();
        let open = self.expect_pair(inner.next(), context, "expected an opening tag")?;
        let self_closing = open.as_rule() == Rule::empty_elem;
        let name = self.expect_pair(open.into_inner().next(), context, "expected a tag name")?;
        let mut element = Element {
            name: name.as_str(),
            name_span: span_of(&name),
            text: String::new(),
            text_span: None,
            children: vec![],
        };
        if self_closing {
            return Ok(element);
        }

        for child in inner {
            match child.as_rule() {
                Rule::element => element.children.push(self.element(child)?),
                Rule::text | Rule::cdata_text => {
                    let span = span_of(&child);
                    element.text_span = Some(match element.text_span {
                        Some((start, _)) => (start, span.1),
                        None => span,
                    });
                    if child.as_rule() == Rule::text {
                        element.text.push_str(&unescape(child.as_str()));
                    } else {
                        element.text.push_str(child.as_str());
                    }
                }
                Rule::end_tag => {
                    let close =
                        self.expect_pair(child.into_inner().next(), context, "expected a tag name")?;
                    if close.as_str() != element.name {
                        let err = ConfigError::MismatchedTag {
                            expected: element.name.to_string(),
                            found: close.as_str().to_string(),
                        };
                        return Err(self.error(err, span_of(&close)));
                    }
                }
                _ => {}
            }
        }
        Ok(element)
    }

    /// Warns about every `PARM` under `path` that has no `TAG`; such
    /// parameters contribute no signal
    fn warn_untagged(&mut self, root: &Element, path: &[&str]) {
        let Some((tag, parm_path)) = path.split_last() else {
            return;
        };
        for parm in root.find_all(parm_path) {
            if parm.children.iter().all(|c| c.name != *tag) {
                let msg = format!("`{}` has no `{}` and is ignored", parm.name, tag);
                self.handler
                    .emit_diagnostic_span(&msg, self.fileid, parm.name_span, Level::Warning);
            }
        }
    }

    /// Short names of every tag under `path`. `seen` spans all directions so
    /// that a leaf shared by an input and an output is caught as well.
    fn signal_names(
        &mut self,
        root: &Element,
        path: &[&str],
        seen: &mut FxHashMap<String, Span>,
    ) -> Result<Vec<String>, ConfigError> {
        let mut names = vec![];
        for tag in root.find_all(path) {
            let span = match tag.text_span {
                Some(span) => self.trim_span(span),
                None => tag.name_span,
            };
            let full = tag.text.trim();
            let name = short_name(full);
            if name.is_empty() {
                let err = ConfigError::EmptyName {
                    path: full.to_string(),
                };
                return Err(self.error(err, span));
            }
            if let Err(err) = check_identifier(name) {
                return Err(self.error(err, span));
            }
            if let Some(first) = seen.get(name) {
                let err = ConfigError::DuplicateSignal {
                    name: name.to_string(),
                };
                self.handler
                    .emit_diagnostic_duplicate(&err.to_string(), self.fileid, *first, span);
                return Err(err);
            }
            seen.insert(name.to_string(), span);
            debug!("{} `{}` -> `{}`", path.join("/"), full, name);
            names.push(name.to_string());
        }
        Ok(names)
    }
}

/// Reads the signal interface from the configuration `source`, which must
/// already be registered with `handler` as `fileid`. Every error is also
/// reported as a diagnostic pointing into the source.
pub fn parse_interface(
    source: &str,
    fileid: usize,
    handler: &mut DiagnosticHandler,
) -> Result<SignalInterface, ConfigError> {
    let mut ctx = ConfigContext {
        source,
        fileid,
        handler,
    };

    let mut pairs = match ConfigParser::parse(Rule::document, source) {
        Ok(pairs) => pairs,
        Err(err) => {
            let span = match err.location {
                InputLocation::Pos(pos) => (pos, pos),
                InputLocation::Span(span) => span,
            };
            let err = ConfigError::Syntax(err.variant.message().into_owned());
            return Err(ctx.error(err, span));
        }
    };
    let document = ctx.expect_pair(pairs.next(), (0, 0), "expected a document")?;
    let root = document.into_inner().find(|p| p.as_rule() == Rule::element);
    let root = ctx.expect_pair(root, (0, 0), "expected a root element")?;
    let root = ctx.element(root)?;

    ctx.warn_untagged(&root, &INPUT_PATH);
    ctx.warn_untagged(&root, &OUTPUT_PATH);

    let mut seen = FxHashMap::default();
    let inputs = ctx.signal_names(&root, &INPUT_PATH, &mut seen)?;
    let outputs = ctx.signal_names(&root, &OUTPUT_PATH, &mut seen)?;
    if inputs.is_empty() {
        return Err(ctx.error(ConfigError::NoInputs, root.name_span));
    }
    if outputs.is_empty() {
        return Err(ctx.error(ConfigError::NoOutputs, root.name_span));
    }

    info!(
        "configuration `{}` declares {} inputs and {} outputs",
        root.name,
        inputs.len(),
        outputs.len()
    );
    SignalInterface::new(inputs, outputs)
}

/// Loads `filename`, registers it with `handler` and reads its signal interface
pub fn parse_file(
    filename: impl AsRef<Path>,
    handler: &mut DiagnosticHandler,
) -> Result<SignalInterface, ConfigError> {
    let path = filename.as_ref();
    let name = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: name.clone(),
        reason: e.to_string(),
    })?;
    let fileid = handler.add_file(name, source.clone());
    parse_interface(&source, fileid, handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Signal;
    use strip_ansi_escapes::strip_str;

    fn parse_str(source: &str) -> (Result<SignalInterface, ConfigError>, String) {
        let mut handler = DiagnosticHandler::default();
        let fileid = handler.add_file("test.xml".to_string(), source.to_string());
        let res = parse_interface(source, fileid, &mut handler);
        (res, strip_str(handler.error_string()))
    }

    fn names(signals: &[Signal]) -> Vec<&str> {
        signals.iter().map(|s| s.name()).collect()
    }

    fn wrap(inputs: &str, outputs: &str) -> String {
        format!(
            "<CFG><STIMPARMS><PARM><TAG>{inputs}</TAG></PARM></STIMPARMS>\
             <OBSPARMS><PARM><TAG>{outputs}</TAG></PARM></OBSPARMS></CFG>"
        )
    }

    #[test]
    fn short_name_keeps_last_component() {
        assert_eq!(short_name("a.b.sensor1"), "sensor1");
        assert_eq!(short_name("sensor1"), "sensor1");
        assert_eq!(short_name("a.b."), "");
    }

    #[test]
    fn unescape_entities() {
        assert_eq!(unescape("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(unescape("&quot;&apos;&#65;&#x42;"), "\"'AB");
        assert_eq!(unescape("&unknown; & done"), "&unknown; & done");
    }

    #[test]
    fn parse_start_ready() {
        let mut handler = DiagnosticHandler::default();
        let signals = parse_file("tests/configs/start_ready.xml", &mut handler).unwrap();
        assert_eq!(names(signals.inputs()), vec!["start"]);
        assert_eq!(names(signals.outputs()), vec!["ready"]);
        assert_eq!(handler.error_string(), "");
    }

    #[test]
    fn parse_hierarchical_tags() {
        let (res, errors) = parse_str(include_str!("../tests/configs/conveyor.xml"));
        let signals = res.unwrap();
        assert_eq!(names(signals.inputs()), vec!["sensor1", "start_btn"]);
        assert_eq!(names(signals.outputs()), vec!["run", "lamp_green"]);
        assert_eq!(errors, "");
    }

    #[test]
    fn parameter_without_tag_is_skipped_with_warning() {
        let source = "<CFG>\n<STIMPARMS><PARM kind=\"spare\"/><PARM><TAG>a.start</TAG></PARM>\
                      </STIMPARMS>\n<OBSPARMS><PARM><TAG>ready</TAG></PARM></OBSPARMS></CFG>";
        let (res, errors) = parse_str(source);
        let signals = res.unwrap();
        assert_eq!(names(signals.inputs()), vec!["start"]);
        assert_eq!(names(signals.outputs()), vec!["ready"]);
        assert!(errors.contains("warning: `PARM` has no `TAG` and is ignored"), "{errors}");
        assert!(errors.contains("test.xml:2:"), "{errors}");
        assert!(!errors.contains("error"), "{errors}");
    }

    #[test]
    fn hierarchical_name_is_shortened() {
        let (res, _) = parse_str(&wrap("a.b.sensor1", "lamp"));
        assert_eq!(names(res.unwrap().inputs()), vec!["sensor1"]);
    }

    #[test]
    fn duplicate_leaf_is_rejected() {
        let (res, errors) = parse_str(include_str!("../tests/configs/duplicate_leaf.xml"));
        assert_eq!(
            res,
            Err(ConfigError::DuplicateSignal {
                name: "start".to_string()
            })
        );
        assert!(errors.contains("first defined here"), "{errors}");
        assert!(errors.contains("defined again here"), "{errors}");
    }

    #[test]
    fn missing_outputs_are_rejected() {
        let (res, errors) = parse_str(include_str!("../tests/configs/no_outputs.xml"));
        assert_eq!(res, Err(ConfigError::NoOutputs));
        assert!(errors.contains("declares no output signals"), "{errors}");

        let (res, _) = parse_str("<CFG><OBSPARMS><PARM><TAG>x.y</TAG></PARM></OBSPARMS></CFG>");
        assert_eq!(res, Err(ConfigError::NoInputs));
    }

    #[test]
    fn bad_names_are_rejected() {
        let (res, errors) = parse_str(&wrap("a.b.", "lamp"));
        assert_eq!(
            res,
            Err(ConfigError::EmptyName {
                path: "a.b.".to_string()
            })
        );
        assert!(errors.contains("test.xml:1:"), "{errors}");

        let (res, _) = parse_str(&wrap("a.2fast", "lamp"));
        assert_eq!(
            res,
            Err(ConfigError::InvalidIdentifier {
                name: "2fast".to_string()
            })
        );

        let (res, _) = parse_str(&wrap("start", "plant.int"));
        assert_eq!(
            res,
            Err(ConfigError::ReservedIdentifier {
                name: "int".to_string()
            })
        );
    }

    #[test]
    fn mismatched_tag_is_rejected() {
        let source = "<CFG>\n<STIMPARMS><PARM><TAG>a</TAG></PRAM></STIMPARMS>\n</CFG>";
        let (res, errors) = parse_str(source);
        assert_eq!(
            res,
            Err(ConfigError::MismatchedTag {
                expected: "PARM".to_string(),
                found: "PRAM".to_string()
            })
        );
        assert!(errors.contains("test.xml:2:"), "{errors}");
    }

    #[test]
    fn syntax_error_is_located() {
        let (res, errors) = parse_str("<CFG>\n  <STIMPARMS>\n");
        assert!(matches!(res, Err(ConfigError::Syntax(_))), "{res:?}");
        assert!(errors.contains("failed to parse configuration"), "{errors}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut handler = DiagnosticHandler::default();
        let res = parse_file("tests/configs/does_not_exist.xml", &mut handler);
        assert!(
            matches!(&res, Err(ConfigError::Io { path, .. }) if path.ends_with("does_not_exist.xml")),
            "{res:?}"
        );
    }
}
