//! Standalone HTML rendering of a [`CardsView`] for `gossipview snapshot --html`.
//!
//! Every piece of text taken from a gossip payload is escaped before it is
//! interpolated into markup.

use std::fmt::Write;

use crate::view::{Badge, CardsView, NodeCard, RepoRow, TaskRow, EMPTY_MESSAGE};

/// Escape `& < > " '` for use in element content and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_html(view: &CardsView) -> String {
    let mut out = String::new();
    out.push_str("<section id=\"cards\">\n");
    match view {
        CardsView::Empty => {
            let _ = writeln!(out, "<div class=\"muted\">{}</div>", escape_html(EMPTY_MESSAGE));
        }
        CardsView::Cards(cards) => {
            for card in cards {
                write_card(&mut out, card);
            }
        }
    }
    out.push_str("</section>\n");
    out
}

fn write_card(out: &mut String, card: &NodeCard) {
    out.push_str("<div class=\"card\">\n");
    let _ = write!(
        out,
        "<div class=\"node-title\" title=\"{}\">{}",
        escape_html(&card.tooltip),
        escape_html(&card.title)
    );
    write_badges(out, &card.badges);
    out.push_str("</div>\n");

    if !card.last_updated.is_empty() {
        let _ = writeln!(
            out,
            "<div class=\"muted\">{}</div>",
            escape_html(&card.last_updated)
        );
    }
    if let Some(err) = &card.error {
        let _ = writeln!(out, "<div class=\"error\">{}</div>", escape_html(err));
    }

    for repo in &card.repos {
        write_repo(out, repo);
    }

    if let Some(more) = card.show_more {
        let _ = writeln!(
            out,
            "<button class=\"show-more\">{}</button>",
            escape_html(&more.label())
        );
    }
    out.push_str("</div>\n");
}

fn write_repo(out: &mut String, repo: &RepoRow) {
    out.push_str("<div class=\"repo\">\n");
    let _ = write!(out, "<div class=\"repo-title\">{}", escape_html(&repo.title));
    write_badges(out, &repo.badges);
    out.push_str("</div>\n");

    if !repo.meta.is_empty() {
        let _ = writeln!(out, "<div class=\"muted\">{}</div>", escape_html(&repo.meta));
    }
    if let Some(err) = &repo.error {
        let _ = writeln!(out, "<div class=\"error\">{}</div>", escape_html(err));
    }

    if let Some(disclosure) = &repo.tasks {
        let open = if disclosure.expanded { " open" } else { "" };
        let _ = writeln!(
            out,
            "<details{open}><summary>{}</summary>",
            escape_html(&disclosure.label())
        );
        for task in &disclosure.tasks {
            write_task(out, task);
        }
        out.push_str("</details>\n");
    }
    out.push_str("</div>\n");
}

fn write_task(out: &mut String, task: &TaskRow) {
    out.push_str("<div class=\"task\">");
    let _ = write!(out, "<span class=\"task-name\">{}</span>", escape_html(&task.name));
    write_badges(out, &[task.badge]);
    if !task.command.is_empty() {
        let _ = write!(out, " <code>{}</code>", escape_html(&task.command));
    }
    if let Some(output) = &task.output {
        let _ = write!(out, "<pre>{}</pre>", escape_html(output));
    }
    out.push_str("</div>\n");
}

fn write_badges(out: &mut String, badges: &[Badge]) {
    for badge in badges {
        let _ = write!(
            out,
            " <span class=\"badge {}\">{}</span>",
            badge.class(),
            badge.label()
        );
    }
}
