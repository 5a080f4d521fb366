//! Navigation state and its reducer.
//!
//! The state is replaced wholesale on each event: `reduce` consumes the old
//! state and returns the next one. History, if any, lives outside.

use std::mem;

use cardmark::{Document, ParseOptions, Section, parse};
use serde::Deserialize;

use crate::projector::{FormatConfig, project_current};
use crate::resolver::resolve_position;
use crate::view::RenderModel;

/// Label selected after a document loads.
pub const DEFAULT_LABEL: &str = "The beginning";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    pub default_label: String,
    pub format: FormatConfig,
    pub parse: ParseOptions,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        NavigatorConfig {
            default_label: DEFAULT_LABEL.to_string(),
            format: FormatConfig::default(),
            parse: ParseOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Replace the document with a freshly parsed one.
    LoadDocument(String),
    /// Go to the section with this label.
    Navigate(String),
}

/// The parsed document and the index of the current section, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    document: Document,
    current: Option<usize>,
}

impl NavigationState {
    pub fn new(document: Document, current: Option<usize>) -> Self {
        NavigationState { document, current }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.current.and_then(|index| self.document.sections.get(index))
    }

    /// The next state after `event`. A navigation miss clears the current
    /// section; the document is kept.
    pub fn reduce(self, event: Event, config: &NavigatorConfig) -> Self {
        match event {
            Event::LoadDocument(text) => {
                let document = parse(&config.parse, &text);
                let current = resolve_position(&document, &config.default_label);
                log::info!(
                    "loaded document with {} sections, current: {:?}",
                    document.sections.len(),
                    current.map(|index| document.sections[index].label.display_title())
                );
                NavigationState { document, current }
            }
            Event::Navigate(label) => {
                let current = resolve_position(&self.document, &label);
                log::debug!("navigate to '{}' -> {:?}", label, current);
                NavigationState {
                    document: self.document,
                    current,
                }
            }
        }
    }
}

/// A navigation state paired with the configuration that drives it.
#[derive(Debug, Default)]
pub struct Navigator {
    state: NavigationState,
    config: NavigatorConfig,
}

impl Navigator {
    pub fn new(config: NavigatorConfig) -> Self {
        Navigator {
            state: NavigationState::default(),
            config,
        }
    }

    /// A navigator with `source` already loaded.
    pub fn from_source(source: impl Into<String>, config: NavigatorConfig) -> Self {
        let mut navigator = Navigator::new(config);
        navigator.dispatch(Event::LoadDocument(source.into()));
        navigator
    }

    pub fn dispatch(&mut self, event: Event) {
        let state = mem::take(&mut self.state);
        self.state = state.reduce(event, &self.config);
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Replace the state with an earlier snapshot, e.g. when walking back
    /// through a history kept by the caller.
    pub fn restore(&mut self, state: NavigationState) {
        self.state = state;
    }

    pub fn document(&self) -> &Document {
        self.state.document()
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.state.current_section()
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Project the current section. Called after every state change.
    pub fn render(&self) -> RenderModel {
        project_current(&self.config.format, self.current_section())
    }
}
