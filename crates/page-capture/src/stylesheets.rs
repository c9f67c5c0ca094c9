//! Recovers `<style>` sheets that scripts changed after they were parsed.

use cssparser::{
    AtRuleParser, CowRcStr, ParseError, Parser, ParserInput, ParserState, QualifiedRuleParser,
    StyleSheetParser,
};
use page_dom::Document;
use tracing::debug;

use crate::context::CaptureContext;
use crate::markers::Marker;
use crate::ports::RenderPort;

/// Counts the top-level rules a CSSOM would build from `css`.
///
/// `@charset` never becomes a rule and qualified rules need a prelude; everything else that
/// parses into a rule is counted.
pub fn count_rules(css: &str) -> usize {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut counter = RuleCounter;
    StyleSheetParser::new(&mut parser, &mut counter)
        .filter(Result::is_ok)
        .count()
}

struct RuleCounter;

fn skip_all(input: &mut Parser<'_, '_>) {
    while input.next_including_whitespace_and_comments().is_ok() {}
}

impl<'i> AtRuleParser<'i> for RuleCounter {
    type Prelude = ();
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        if name.eq_ignore_ascii_case("charset") {
            return Err(input.new_custom_error(()));
        }
        skip_all(input);
        Ok(())
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        skip_all(input);
        Ok(())
    }

    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        Ok(())
    }
}

impl<'i> QualifiedRuleParser<'i> for RuleCounter {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        skip_all(input);
        if input.slice_from(start).trim().is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(())
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        skip_all(input);
        Ok(())
    }
}

/// Compares each `<style>` element's static rule count with its live sheet and captures the
/// live rules where they differ. Returns the sparse table indexed by `<style>` position.
pub fn extract_stylesheets(
    doc: &mut Document,
    render: &dyn RenderPort,
    ctx: &mut CaptureContext,
) -> Vec<Option<String>> {
    let mut contents: Vec<Option<String>> = Vec::new();
    let styles = doc.elements_by_local_name(doc.root(), "style");
    for (index, style) in styles.into_iter().enumerate() {
        let live_rules = match render.stylesheet_rules(style) {
            Ok(rules) => rules,
            Err(err) => {
                debug!(index, %err, "stylesheet not inspected");
                continue;
            }
        };
        let static_count = count_rules(&doc.text_content(style));
        if static_count == live_rules.len() {
            continue;
        }
        debug!(index, static_count, live = live_rules.len(), "stylesheet changed at runtime");
        ctx.mark(doc, style, Marker::Stylesheet, &index.to_string());
        if contents.len() <= index {
            contents.resize(index + 1, None);
        }
        contents[index] = Some(live_rules.join("\n"));
    }
    contents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_top_level_rules() {
        assert_eq!(count_rules("a{color:red}"), 1);
        assert_eq!(count_rules("a{color:red} b, i { margin: 0 }"), 2);
        assert_eq!(
            count_rules("@charset \"utf-8\"; @import url(x.css); @media print { a { } }"),
            2
        );
        assert_eq!(count_rules("/* only a comment */"), 0);
        assert_eq!(count_rules(""), 0);
    }
}
