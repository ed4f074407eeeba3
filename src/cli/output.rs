// Plain-text rendering for CLI output

use std::fmt::Write;
use crate::engine::{Advance, AnnotationStep, PhaseProgress, TaskOverview};
use crate::models::AnnotationStats;
use crate::workflow::{Task, TaskGraph};

pub const ALL_DONE: &str = "All annotations are done!";

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate, with fallback to the COLUMNS environment
/// variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

/// Proportional bar: `=` completed, `-` pending, `x` filtered, `.` not reached
pub fn format_progress_bar(progress: &PhaseProgress, width: usize) -> String {
    if progress.total == 0 || width == 0 {
        return format!("[{}]", " ".repeat(width));
    }

    let parts = [
        (progress.completed, '='),
        (progress.pending, '-'),
        (progress.filtered_wrong_class, 'x'),
        (progress.not_yet_annotated, '.'),
    ];

    // Largest-remainder rounding keeps the bar exactly `width` wide
    let mut cells: Vec<(usize, usize, char)> = parts
        .iter()
        .enumerate()
        .map(|(i, (count, ch))| (count * width / progress.total, i, *ch))
        .collect();
    let used: usize = cells.iter().map(|(n, _, _)| n).sum();
    let mut remainders: Vec<(usize, usize)> = parts
        .iter()
        .enumerate()
        .map(|(i, (count, _))| ((count * width) % progress.total, i))
        .collect();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, i) in remainders.into_iter().take(width.saturating_sub(used)) {
        cells[i].0 += 1;
    }

    cells.sort_by_key(|(_, i, _)| *i);
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    for (n, _, ch) in cells {
        bar.extend(std::iter::repeat(ch).take(n));
    }
    bar.push(']');
    bar
}

pub fn format_phase_progress(task: &Task, progress: &PhaseProgress, bar_width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", task.name, task.id);
    let _ = writeln!(out, "{}", format_progress_bar(progress, bar_width));
    let _ = writeln!(
        out,
        "  Completed:          {:>6}  {:>5.1}%",
        progress.completed, progress.completed_percent
    );
    let _ = writeln!(
        out,
        "  Pending:            {:>6}  {:>5.1}%",
        progress.pending, progress.pending_percent
    );
    let _ = writeln!(
        out,
        "  Filtered out:       {:>6}  {:>5.1}%",
        progress.filtered_wrong_class, progress.filtered_percent
    );
    let _ = writeln!(
        out,
        "  Not yet reached:    {:>6}  {:>5.1}%",
        progress.not_yet_annotated, progress.not_yet_annotated_percent
    );
    let _ = write!(out, "  Total:              {:>6}", progress.total);
    out
}

pub fn format_dashboard(rows: &[TaskOverview]) -> String {
    let id_width = rows
        .iter()
        .map(|r| r.task_id.len())
        .chain(std::iter::once("Task".len()))
        .max()
        .unwrap_or(4);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<id_width$}  {:>9}  {:>8}  {:>9}  {:>8}  {:>9}",
        "Task", "Available", "Eligible", "Completed", "Filtered", "Not yet",
        id_width = id_width
    );
    let _ = write!(out, "{}", "-".repeat(id_width + 2 + 9 + 2 + 8 + 2 + 9 + 2 + 8 + 2 + 9));
    for row in rows {
        let _ = write!(
            out,
            "\n{:<id_width$}  {:>9}  {:>8}  {:>9}  {:>8}  {:>9}",
            row.task_id,
            row.available,
            row.eligible,
            row.completed,
            row.progress.filtered_wrong_class,
            row.progress.not_yet_annotated,
            id_width = id_width
        );
    }
    out
}

pub fn format_step(step: &AnnotationStep, task: Option<&Task>) -> String {
    let mut out = String::new();
    match task {
        Some(task) => {
            let _ = writeln!(out, "Task:  {} ({})", task.name, step.task_id);
        }
        None => {
            let _ = writeln!(out, "Task:  {}", step.task_id);
        }
    }
    let _ = writeln!(out, "Image: {}", step.image_sha256);
    let _ = write!(out, "File:  {}", step.image_filename);

    if let Some(task) = task {
        for button in task.class_buttons() {
            let key = button.key.map(|k| k.to_string()).unwrap_or_else(|| " ".to_string());
            let _ = write!(out, "\n  [{}] {:<10} {}", key, button.id, button.name);
        }
    }
    out
}

pub fn format_advance(advance: &Advance) -> String {
    match advance {
        Advance::SameTask(step) => format!("Next: {} {}", step.task_id, step.image_sha256),
        Advance::NextTask(step) => format!(
            "Task complete. Next task: {} {}",
            step.task_id, step.image_sha256
        ),
        Advance::AllDone => ALL_DONE.to_string(),
    }
}

pub fn format_task_list(graph: &TaskGraph) -> String {
    let mut lines = Vec::with_capacity(graph.len());
    for (index, task) in graph.tasks().iter().enumerate() {
        let mut line = format!("{:>2}  {:<16} {:<9} {}", index, task.id, task.kind.as_str(), task.name);
        if !task.dependencies.is_empty() {
            let conditions: Vec<String> = task
                .dependencies
                .iter()
                .map(|(dep, value)| format!("{}={}", dep, value))
                .collect();
            let _ = write!(line, "  [if {}]", conditions.join(", "));
        }
        let classes: Vec<&str> = task.classes.keys().map(|c| c.as_str()).collect();
        let _ = write!(line, "\n    classes: {}", classes.join(", "));
        lines.push(line);
    }
    lines.join("\n")
}

pub fn format_stats(images: usize, stats: &AnnotationStats) -> String {
    format!(
        "Images:            {}\nAnnotated images:  {}\nAnnotations:       {}\nAnnotators:        {}",
        images, stats.annotated_images, stats.total_annotations, stats.total_users
    )
}
