// Local plots corpus: a `titles` file (one encyclopedia title per line) and a
// parallel `plots` file whose entries are separated by `<EOS>` lines.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{ResolveError, Result};

const END_OF_STORY: &str = "<EOS>";

#[derive(Debug, Default)]
pub struct WikiPlots {
    plots: HashMap<String, String>,
}

impl WikiPlots {
    pub fn load(dir: &Path) -> Result<Self> {
        let titles_path = dir.join("titles");
        let plots_path = dir.join("plots");
        let titles = fs::read_to_string(&titles_path).map_err(|e| ResolveError::storage(&titles_path, e))?;
        let plots = fs::read_to_string(&plots_path).map_err(|e| ResolveError::storage(&plots_path, e))?;

        let titles: Vec<&str> = titles.lines().map(str::trim).collect();
        let plots = split_plots(&plots);
        if titles.len() != plots.len() {
            return Err(ResolveError::corrupt(
                dir.display().to_string(),
                format!("{} titles but {} plots", titles.len(), plots.len()),
            ));
        }

        let plots: HashMap<String, String> = titles
            .into_iter()
            .map(str::to_string)
            .zip(plots)
            .collect();
        info!(path = %dir.display(), plots = plots.len(), "wikiplots: loaded");
        Ok(Self { plots })
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.plots.get(title).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.plots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }
}

fn split_plots(raw: &str) -> Vec<String> {
    let mut plots = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in raw.lines().map(str::trim) {
        if line == END_OF_STORY {
            plots.push(current.join("\n"));
            current.clear();
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        plots.push(current.join("\n"));
    }
    plots
}
