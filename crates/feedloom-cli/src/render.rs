use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Mutex;

use uuid::Uuid;

use feedloom_core::router::{Action, Renderer};
use feedloom_core::state::AppState;

/// Renders routed actions as a scrolling text log.
///
/// Feeds and entries are printed once, the first time they are seen;
/// later list renders only report what is new since the previous one.
pub struct ConsoleRenderer<W> {
    inner: Mutex<Inner<W>>,
}

struct Inner<W> {
    out: W,
    feeds: HashSet<Uuid>,
    entries: HashSet<Uuid>,
    visited: HashSet<Uuid>,
}

impl ConsoleRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            inner: Mutex::new(Inner {
                out,
                feeds: HashSet::new(),
                entries: HashSet::new(),
                visited: HashSet::new(),
            }),
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner()).out
    }
}

impl<W: Write + Send> Renderer for ConsoleRenderer<W> {
    fn render(&self, action: Action, state: &AppState) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let result = match action {
            Action::RenderForm => inner.write_form(state),
            Action::RenderFeeds => inner.write_feeds(state),
            Action::RenderEntries => inner.write_entries(state),
            Action::ShowDetail => inner.write_detail(state),
        };

        if let Err(e) = result.and_then(|_| inner.out.flush()) {
            tracing::warn!("Failed to write output: {}", e);
        }
    }
}

impl<W: Write> Inner<W> {
    fn write_form(&mut self, state: &AppState) -> io::Result<()> {
        let form = &state.form;
        match (form.error, form.success) {
            (Some(kind), _) => writeln!(self.out, "✗ {}: {}", form.url, kind),
            (None, Some(true)) => writeln!(self.out, "✓ Feed added: {}", form.url),
            _ => Ok(()),
        }
    }

    fn write_feeds(&mut self, state: &AppState) -> io::Result<()> {
        for feed in &state.feeds {
            if !self.feeds.insert(feed.id) {
                continue;
            }
            writeln!(self.out, "\n== {} ==", feed.title)?;
            if !feed.description.is_empty() {
                writeln!(self.out, "   {}", feed.description)?;
            }
            writeln!(self.out, "   {}", feed.url)?;
        }
        Ok(())
    }

    fn write_entries(&mut self, state: &AppState) -> io::Result<()> {
        for entry in &state.entries {
            if self.entries.insert(entry.id) {
                let feed = state
                    .feeds
                    .iter()
                    .find(|feed| feed.id == entry.feed_id)
                    .map(|feed| feed.title.as_str())
                    .unwrap_or("?");
                let date = entry
                    .published_at
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "----------------".to_string());
                let marker = if state.is_visited(entry.id) { ' ' } else { '*' };

                writeln!(self.out, " {} {}  [{}] {}", marker, date, feed, entry.title)?;
                if !entry.link.is_empty() {
                    writeln!(self.out, "     {}", entry.link)?;
                }
            }

            if state.is_visited(entry.id) && self.visited.insert(entry.id) {
                writeln!(self.out, "   read: {}", entry.title)?;
            }
        }
        Ok(())
    }

    fn write_detail(&mut self, state: &AppState) -> io::Result<()> {
        let Some(modal) = &state.ui.modal else {
            return Ok(());
        };

        writeln!(self.out, "\n--- {} ---", modal.title)?;
        if !modal.description.is_empty() {
            writeln!(self.out, "{}", modal.description)?;
        }
        writeln!(self.out, "Read more: {}", modal.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use feedloom_core::feed::{Entry, Feed, ParsedEntry, ParsedFeed};
    use feedloom_core::state::FormState;
    use feedloom_core::ErrorKind;

    fn state_with_entry() -> AppState {
        let feed = Feed::new(
            "https://example.com/rss",
            &ParsedFeed {
                title: "Example".to_string(),
                description: "Things".to_string(),
                entries: Vec::new(),
            },
        );
        let entry = Entry::from_parsed(
            feed.id,
            ParsedEntry {
                title: "Hello".to_string(),
                link: "https://example.com/hello".to_string(),
                description: "Body".to_string(),
                published_at: None,
            },
        );

        AppState {
            feeds: vec![feed],
            entries: vec![entry],
            ..AppState::default()
        }
    }

    fn output(renderer: ConsoleRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_output()).unwrap()
    }

    #[test]
    fn test_form_feedback() {
        let renderer = ConsoleRenderer::new(Vec::new());
        let mut state = AppState::default();

        state.form = FormState::rejected("nope", ErrorKind::InvalidUrl);
        renderer.render(Action::RenderForm, &state);
        state.form = FormState::accepted("https://example.com/rss");
        renderer.render(Action::RenderForm, &state);

        let text = output(renderer);
        assert!(text.contains("✗ nope: Link must be a valid URL"));
        assert!(text.contains("✓ Feed added: https://example.com/rss"));
    }

    #[test]
    fn test_entries_print_once() {
        let renderer = ConsoleRenderer::new(Vec::new());
        let state = state_with_entry();

        renderer.render(Action::RenderFeeds, &state);
        renderer.render(Action::RenderEntries, &state);
        renderer.render(Action::RenderEntries, &state);

        let text = output(renderer);
        assert_eq!(text.matches("[Example] Hello").count(), 1);
        assert_eq!(text.matches("== Example ==").count(), 1);
        assert!(text.contains(" * "));
    }

    #[test]
    fn test_visited_and_detail() {
        let renderer = ConsoleRenderer::new(Vec::new());
        let mut state = state_with_entry();
        renderer.render(Action::RenderEntries, &state);

        let entry = state.entries[0].clone();
        state.ui.modal = Some(entry.summary());
        state.ui.visited.insert(entry.id);
        renderer.render(Action::ShowDetail, &state);
        renderer.render(Action::RenderEntries, &state);

        let text = output(renderer);
        assert!(text.contains("--- Hello ---"));
        assert!(text.contains("Read more: https://example.com/hello"));
        assert!(text.contains("read: Hello"));
    }
}
