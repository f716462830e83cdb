use std::{io::Write, time::Duration};

use catalog::{
    ApiError,
    foods::{FoodSummary, HistoryEntry, SearchResults},
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::{
    search::ResultConsumer,
    views::{self, Toast},
};

/// What the terminal currently shows: the last result list, the error banner,
/// the cached history and the spinner while something is loading.
pub struct Screen<W: Write> {
    out: W,
    progress: bool,
    spinner: Option<ProgressBar>,
    query: String,
    results: Vec<FoodSummary>,
    total_hits: u64,
    error: Option<String>,
    last_toast: Option<Toast>,
    history: Vec<HistoryEntry>,
}

impl<W: Write> Screen<W> {
    pub fn new(out: W, progress: bool) -> Self {
        Self {
            out,
            progress,
            spinner: None,
            query: String::new(),
            results: Vec::new(),
            total_hits: 0,
            error: None,
            last_toast: None,
            history: Vec::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[FoodSummary] {
        &self.results
    }

    /// Result by its 1-based position in the list.
    pub fn result(&self, number: usize) -> Option<&FoodSummary> {
        number
            .checked_sub(1)
            .and_then(|index| self.results.get(index))
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_toast(&self) -> Option<&Toast> {
        self.last_toast.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn set_history(&mut self, history: Vec<HistoryEntry>) {
        self.history = history;
    }

    pub fn show(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            warn!("Failed to write to terminal: {e}");
        }
    }

    pub fn toast(&mut self, toast: Toast) {
        self.show(&toast.to_string());
        self.last_toast = Some(toast);
    }

    pub fn start_spinner(&mut self, message: String) {
        self.stop_spinner();

        if !self.progress {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(120));

        self.spinner = Some(spinner);
    }

    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn into_inner(mut self) -> W {
        self.stop_spinner();
        self.out
    }
}

impl<W: Write> ResultConsumer<SearchResults> for Screen<W> {
    fn on_dispatch(&mut self, query: &str) {
        self.error = None;
        self.start_spinner(format!("Searching for \"{query}\"..."));
    }

    fn on_cancel(&mut self, _query: &str) {
        self.stop_spinner();
    }

    fn on_results(&mut self, query: &str, results: SearchResults) {
        self.stop_spinner();

        self.query = query.to_string();
        self.results = results.foods;
        self.total_hits = results.total_hits;

        let list = views::results_list(query, &self.results, self.total_hits);
        self.show(&list);

        if self.results.is_empty() {
            self.toast(Toast::warning("No foods found for your search query"));
        } else {
            self.toast(Toast::success(format!(
                "Found {} food items",
                self.results.len()
            )));
        }
    }

    fn on_error(&mut self, _query: &str, error: ApiError) {
        self.stop_spinner();
        self.error = Some(error.to_string());

        let toast = match &error {
            ApiError::RateLimited {
                retry_after,
                message,
            } => Toast::error(format!("{message} Retry in {retry_after}s.")),
            ApiError::Transport(_) => Toast::error("Search error. Please check your connection."),
            _ => Toast::error(format!("Search failed. {error}")),
        };

        self.toast(toast);
    }

    fn on_clear(&mut self) {
        self.stop_spinner();
        self.query.clear();
        self.results.clear();
        self.total_hits = 0;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use catalog::error::DEFAULT_RATE_LIMIT_MESSAGE;

    use super::*;
    use crate::views::ToastKind;

    fn results(names: &[&str]) -> SearchResults {
        SearchResults {
            foods: names
                .iter()
                .enumerate()
                .map(|(i, name)| FoodSummary {
                    fdc_id: i as u64 + 1,
                    description: name.to_string(),
                    data_type: None,
                    brand_owner: None,
                    nutrients: Vec::new(),
                })
                .collect(),
            total_hits: names.len() as u64,
        }
    }

    #[test]
    fn test_results_replace_list() {
        let mut screen = Screen::new(Vec::new(), false);

        screen.on_dispatch("apple");
        screen.on_results("apple", results(&["Apple, raw", "Apple juice"]));

        assert_eq!(screen.results().len(), 2);
        assert_eq!(screen.result(2).unwrap().description, "Apple juice");
        assert!(screen.result(0).is_none());
        assert_eq!(
            screen.last_toast(),
            Some(&Toast::success("Found 2 food items"))
        );

        let text = String::from_utf8(screen.into_inner()).unwrap();
        assert!(text.contains("Results for \"apple\""));
    }

    #[test]
    fn test_empty_results_warn() {
        let mut screen = Screen::new(Vec::new(), false);

        screen.on_results("zzzz", results(&[]));

        assert_eq!(screen.last_toast().unwrap().kind, ToastKind::Warning);
    }

    #[test]
    fn test_errors_and_clear() {
        let mut screen = Screen::new(Vec::new(), false);

        screen.on_results("apple", results(&["Apple, raw"]));
        screen.on_error(
            "apples",
            ApiError::RateLimited {
                retry_after: 60,
                message: DEFAULT_RATE_LIMIT_MESSAGE.to_string(),
            },
        );

        assert_eq!(screen.error(), Some(DEFAULT_RATE_LIMIT_MESSAGE));
        assert!(screen.last_toast().unwrap().message.ends_with("Retry in 60s."));

        screen.on_clear();

        assert!(screen.results().is_empty());
        assert!(screen.error().is_none());
        assert_eq!(screen.query(), "");
    }
}
