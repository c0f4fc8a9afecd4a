// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Human-readable results tables.

use std::fmt::Write;

use crate::commands::run::BenchOutcome;

/// Minimum inner width of the box.
const WIDTH: usize = 62;

/// Width of the threads column and of each per-operation column.
const THREADS_COL: usize = 8;
const OP_COL: usize = 12;

/// Inner width needed to fit the per-operation table of `ops` operations.
fn box_width(ops: usize) -> usize {
    // leading space, columns, one separator per op, trailing space
    WIDTH.max(1 + THREADS_COL + ops * (OP_COL + 1) + 1)
}

/// Render the rate table and per-operation figures for one pairing.
pub fn render(outcome: &BenchOutcome) -> String {
    let mut out = String::new();
    let width = box_width(outcome.commands.len());
    let rule = "═".repeat(width);
    let row = |out: &mut String, content: &str| write_row(out, width, content);

    let _ = writeln!(out, "╔{}╗", rule);
    row(
        &mut out,
        &format!("{} [{}] on {}", outcome.name, outcome.kind, outcome.engine),
    );
    let sequence: Vec<_> = outcome.commands.iter().map(|op| op.name()).collect();
    row(&mut out, &format!("Sequence: {}", sequence.join(" → ")));
    for line in outcome.info.lines().skip(1) {
        row(&mut out, line);
    }
    let _ = writeln!(out, "╠{}╣", rule);

    if let Some((stage, reason)) = &outcome.failure {
        if outcome.results.is_empty() {
            row(&mut out, &format!("FAILED during {}", stage));
            row(&mut out, reason);
            let _ = writeln!(out, "╚{}╝", rule);
            return out;
        }
    }

    row(
        &mut out,
        &format!(
            "{:>8} {:>10} {:>12} {:>14} {:>8}",
            "Threads", "Iter/Thd", "Elapsed ms", "Rate (seq/s)", "Errors"
        ),
    );
    for level in &outcome.results {
        row(
            &mut out,
            &format!(
                "{:>8} {:>10} {:>12} {:>14.2} {:>8}",
                level.threads(),
                level.iterations(),
                level.elapsed().as_millis(),
                level.rate(),
                level.total_errors()
            ),
        );
    }

    let _ = writeln!(out, "╠{}╣", rule);
    row(&mut out, "Average ms per operation (errors)");
    let mut header = format!("{:>w$}", "Threads", w = THREADS_COL);
    for op in &outcome.commands {
        let _ = write!(header, " {:>w$}", op.name(), w = OP_COL);
    }
    row(&mut out, &header);
    for level in &outcome.results {
        let mut line = format!("{:>w$}", level.threads(), w = THREADS_COL);
        for &op in &outcome.commands {
            let cell = match level.average_ms(op) {
                Some(avg) => format!("{:.1} ({})", avg, level.errors(op)),
                None => format!("- ({})", level.errors(op)),
            };
            let _ = write!(line, " {:>w$}", cell, w = OP_COL);
        }
        if level.create_errors() > 0 {
            let _ = write!(line, "  create errors: {}", level.create_errors());
        }
        row(&mut out, &line);
    }

    if let Some((stage, reason)) = &outcome.failure {
        let _ = writeln!(out, "╠{}╣", rule);
        row(&mut out, &format!("Stopped during {}: {}", stage, reason));
    }

    let _ = writeln!(out, "╚{}╝", rule);
    out
}

/// One boxed line; content wider than the box pushes the right border out.
fn write_row(out: &mut String, width: usize, content: &str) {
    let len = content.chars().count();
    let pad = (width - 1).saturating_sub(len);
    let _ = writeln!(out, "║ {}{}║", content, " ".repeat(pad));
}
