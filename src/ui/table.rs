use crate::core::state::{StepOutcome, StepResult};
use crate::utils::time::format_millis;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn outcome_cell(outcome: &StepOutcome) -> Cell {
    let color = match outcome {
        StepOutcome::Completed => Color::Green,
        StepOutcome::Failed { .. } => Color::Red,
        StepOutcome::TimedOut => Color::Yellow,
        StepOutcome::Skipped { .. } => Color::DarkGrey,
    };
    let text = match outcome {
        StepOutcome::Skipped { reason } => format!("skipped: {}", reason),
        other => other.label().to_string(),
    };
    Cell::new(text).fg(color)
}

pub fn step_summary(steps: &[StepResult]) -> String {
    let mut table = base_table();

    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Step").add_attribute(Attribute::Bold),
        Cell::new("Outcome").add_attribute(Attribute::Bold),
        Cell::new("Duration").add_attribute(Attribute::Bold),
        Cell::new("Output").add_attribute(Attribute::Bold),
    ]);

    for step in steps {
        let output = step
            .output_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(step.index.to_string()),
            Cell::new(&step.title),
            outcome_cell(&step.outcome),
            Cell::new(format_millis(step.duration_ms)),
            Cell::new(output),
        ]);
    }

    table.to_string()
}
