//! Maps state changes to render actions.

use serde::Serialize;

use crate::state::{AppState, StatePath, Store, Subscriber};

/// Something a renderer must redo after a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    /// Redraw submission feedback
    RenderForm,
    /// Redraw the feed list
    RenderFeeds,
    /// Redraw the entry list, including visited styling
    RenderEntries,
    /// Open or refresh the entry detail view
    ShowDetail,
}

/// Routing table, evaluated top to bottom on every change
const ROUTES: &[(&str, Action)] = &[
    ("form", Action::RenderForm),
    ("feeds", Action::RenderFeeds),
    ("posts", Action::RenderEntries),
    ("uiState.modal", Action::ShowDetail),
    ("uiState.visitedPosts", Action::RenderEntries),
];

/// Actions required by a change at `path`, in table order.
///
/// Unknown paths yield no actions.
pub fn route(path: &str) -> Vec<Action> {
    ROUTES
        .iter()
        .filter(|(route, _)| *route == path)
        .map(|(_, action)| *action)
        .collect()
}

pub fn route_path(path: StatePath) -> Vec<Action> {
    route(path.as_str())
}

/// Consumer of routed actions. Must not write to the store.
pub trait Renderer: Send + Sync {
    fn render(&self, action: Action, state: &AppState);
}

/// Store subscriber that forwards every change through [`route`] to a renderer
pub struct ChangeRouter<R> {
    renderer: R,
}

impl<R: Renderer> ChangeRouter<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }
}

impl<R: Renderer> Subscriber for ChangeRouter<R> {
    fn on_change(&self, path: StatePath, store: &Store) {
        let actions = route_path(path);
        if actions.is_empty() {
            return;
        }

        let state = store.snapshot();
        for action in actions {
            tracing::debug!(path = %path, ?action, "Routing state change");
            self.renderer.render(action, &state);
        }
    }
}
