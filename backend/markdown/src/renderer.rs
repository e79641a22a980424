//! Markdown Renderers
//!
//! Small builders for the markdown emitted in reports. Output is a pure
//! function of the input so rendered documents diff cleanly.

pub struct Renderer;

impl Renderer {
    /// Escapes text for use inside a table cell.
    pub fn escape_cell(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for line in text.trim().lines() {
            if !out.is_empty() {
                out.push_str("<br>");
            }
            out.push_str(&line.trim().replace('|', "\\|"));
        }
        out
    }

    /// Escapes text for use inside a single-line inline code span.
    pub fn inline_code(text: &str) -> String {
        let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.contains('`') {
            format!("`` {flat} ``")
        } else {
            format!("`{flat}`")
        }
    }

    pub fn heading(level: usize, text: &str) -> String {
        format!("{} {}\n", "#".repeat(level.clamp(1, 6)), text.trim())
    }

    /// Wraps text in a fenced block, lengthening the fence if the text has one.
    pub fn fenced(lang: &str, text: &str) -> String {
        let mut fence = "```".to_string();
        while text.contains(fence.as_str()) {
            fence.push('`');
        }
        format!("{fence}{lang}\n{}\n{fence}\n", text.trim_end())
    }
}

/// A GitHub-flavoured markdown table.
pub struct MarkdownTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|h| Renderer::escape_cell(h.as_ref()))
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Adds a row; missing cells are left blank and extra cells dropped.
    pub fn row<I, S>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut row: Vec<String> = cells
            .into_iter()
            .take(self.headers.len())
            .map(|c| Renderer::escape_cell(c.as_ref()))
            .collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("| {} |\n", self.headers.join(" | ")));
        let rule: Vec<&str> = self.headers.iter().map(|_| "---").collect();
        out.push_str(&format!("| {} |\n", rule.join(" | ")));
        for row in &self.rows {
            out.push_str(&format!("| {} |\n", row.join(" | ")));
        }
        out
    }
}
