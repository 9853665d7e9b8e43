//! The update cycle run after every edit.

use crate::reporter::{ErrorReporter, OutputSink};
use crate::transform::XmlEngine;
use crate::types::{EditorId, ParseResult};
use serde::Serialize;

/// Where the last update cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateState {
    Idle,
    Parsing,
    ParseError,
    Transforming,
    TransformError,
    Rendered,
}

impl UpdateState {
    pub fn is_error(self) -> bool {
        matches!(self, UpdateState::ParseError | UpdateState::TransformError)
    }
}

/// Parses both panes, reports errors, transforms and renders.
#[derive(Debug)]
pub struct UpdateOrchestrator<E> {
    engine: E,
    state: UpdateState,
}

impl<E: XmlEngine> UpdateOrchestrator<E> {
    pub fn new(engine: E) -> Self {
        UpdateOrchestrator {
            engine,
            state: UpdateState::Idle,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The terminal state of the last cycle.
    pub fn state(&self) -> UpdateState {
        self.state
    }

    fn enter(&mut self, state: UpdateState) {
        log::debug!("Update: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Runs one cycle and returns its terminal state.
    ///
    /// On a parse error the sink is left untouched. On a transform error the
    /// previous output stays in the sink and the message goes to the output pane's
    /// error region.
    pub fn update(
        &mut self,
        xml: &str,
        xslt: &str,
        reporter: &mut dyn ErrorReporter,
        sink: &mut dyn OutputSink,
    ) -> UpdateState {
        self.enter(UpdateState::Idle);
        self.enter(UpdateState::Parsing);
        reporter.clear_all();

        let source = self.engine.parse(xml);
        let stylesheet = self.engine.parse(xslt);
        let (source, stylesheet) = match (source, stylesheet) {
            (ParseResult::Document(source), ParseResult::Document(stylesheet)) => (source, stylesheet),
            (source, stylesheet) => {
                reporter.report(EditorId::Xml, source.error());
                reporter.report(EditorId::Xslt, stylesheet.error());
                self.enter(UpdateState::ParseError);
                return self.state;
            }
        };

        self.enter(UpdateState::Transforming);
        match self.engine.transform(&source, &stylesheet) {
            Ok(result) => {
                log::debug!("Rendered {} bytes of {}", result.text.len(), result.kind_label);
                sink.render(&result);
                self.enter(UpdateState::Rendered);
            }
            Err(e) => {
                log::info!("Transform failed: {}", e);
                reporter.report(EditorId::Output, Some(&e.to_string()));
                self.enter(UpdateState::TransformError);
            }
        }
        self.state
    }
}
