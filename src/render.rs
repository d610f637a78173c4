//! Turns gallery state into a declarative grid for the rendering surface.
//!
//! Rendering never touches the state; the same state always produces the
//! same [`GridView`].

use std::fmt::Write as _;

use crate::state::{GalleryPhase, GalleryState};

pub const LOADING_MORE_TEXT: &str = "Loading more photos...";
pub const INITIAL_FAILED_TEXT: &str = "Could not load photos.";

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Placeholders shown while the first page is outstanding.
    pub initial_placeholders: usize,
    /// Placeholders appended while a later page is outstanding.
    pub per_page: usize,
    pub columns: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            initial_placeholders: 20,
            per_page: 10,
            columns: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Placeholder { key: String },
    Image { src: String, alt: String },
}

impl Block {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Block::Placeholder { .. })
    }
}

/// What the surface should show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridView {
    pub columns: usize,
    /// Photos, or the initial placeholders.
    pub main: Vec<Block>,
    /// Placeholders below the photos while the next page loads.
    pub pending: Vec<Block>,
    /// Text line shown under the pending grid.
    pub indicator: Option<String>,
    /// Set when the first page failed and can be retried.
    pub notice: Option<String>,
}

fn placeholders(prefix: &str, count: usize) -> Vec<Block> {
    (0..count)
        .map(|idx| Block::Placeholder {
            key: format!("{prefix}-skeleton-{idx}"),
        })
        .collect()
}

pub fn render(state: &GalleryState, opts: &RenderOptions) -> GridView {
    let mut view = GridView {
        columns: opts.columns,
        ..GridView::default()
    };

    match state.phase() {
        GalleryPhase::InitialLoading if state.loading() => {
            view.main = placeholders("initial", opts.initial_placeholders);
            return view;
        }
        GalleryPhase::InitialFailed => {
            view.notice = Some(INITIAL_FAILED_TEXT.to_string());
            return view;
        }
        _ => {}
    }

    view.main = state
        .photos()
        .iter()
        .map(|photo| Block::Image {
            src: photo.urls.small.clone(),
            alt: photo.alt_description.clone().unwrap_or_default(),
        })
        .collect();

    if state.loading() && !state.initial_load() {
        view.pending = placeholders("scroll", opts.per_page);
        view.indicator = Some(LOADING_MORE_TEXT.to_string());
    }
    view
}

impl GridView {
    pub fn image_count(&self) -> usize {
        self.main.iter().filter(|b| !b.is_placeholder()).count()
    }

    pub fn placeholder_count(&self) -> usize {
        self.main
            .iter()
            .chain(self.pending.iter())
            .filter(|b| b.is_placeholder())
            .count()
    }

    /// Number of grid rows the view occupies.
    pub fn rows(&self) -> usize {
        let columns = self.columns.max(1);
        self.main.len().div_ceil(columns) + self.pending.len().div_ceil(columns)
    }

    /// Serialise the view as an HTML fragment.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let columns = self.columns.max(1);
        let _ = writeln!(out, "<div class=\"gallery\">");
        write_grid(&mut out, "grid", columns, &self.main);
        if !self.pending.is_empty() {
            write_grid(&mut out, "grid pending", columns, &self.pending);
        }
        if let Some(text) = &self.indicator {
            let _ = writeln!(out, "  <p class=\"loading-more\">{}</p>", escape(text));
        }
        if let Some(text) = &self.notice {
            let _ = writeln!(
                out,
                "  <p class=\"error\">{} <button class=\"retry\">Retry</button></p>",
                escape(text)
            );
        }
        out.push_str("</div>\n");
        out
    }
}

fn write_grid(out: &mut String, class: &str, columns: usize, blocks: &[Block]) {
    let _ = writeln!(
        out,
        "  <div class=\"{class}\" style=\"display:grid;grid-template-columns:repeat({columns},1fr)\">"
    );
    for block in blocks {
        match block {
            Block::Placeholder { key } => {
                let _ = writeln!(
                    out,
                    "    <div class=\"skeleton\" data-key=\"{}\"></div>",
                    escape(key)
                );
            }
            Block::Image { src, alt } => {
                let _ = writeln!(
                    out,
                    "    <div class=\"tile\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\"></div>",
                    escape(src),
                    escape(alt)
                );
            }
        }
    }
    out.push_str("  </div>\n");
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
