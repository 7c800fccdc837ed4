//! Plain-text rendering of simulation reports

use std::fmt::Write;

use crate::simulation::SimulationReport;

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Render the full report: worker status, progress, task log, table snapshot
pub fn render(report: &SimulationReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    write_report(&mut out, report)?;
    Ok(out)
}

fn write_report(out: &mut String, report: &SimulationReport) -> std::fmt::Result {
    writeln!(out, "Worker Queues")?;
    writeln!(out, "=============")?;
    for (worker, length) in report.queues.iter().enumerate() {
        writeln!(out, "  Worker {worker}: {length} tasks")?;
    }

    writeln!(out, "\nLearning Progress")?;
    writeln!(out, "=================")?;
    let epsilons = report.epsilon_history();
    if let (Some(first), Some(last)) = (epsilons.first(), epsilons.last()) {
        writeln!(out, "  Epsilon: {first:.4} -> {last:.4}")?;
    }
    writeln!(out, "  Mean task time: {:.3}s", report.mean_latency())?;
    writeln!(
        out,
        "  Explored: {} of {} decisions",
        report.snapshot.stats.explorations, report.snapshot.stats.decisions
    )?;
    writeln!(out, "  {:<8} {:>6} {:>12}", "WORKER", "TASKS", "MEAN TIME")?;
    for summary in &report.workers {
        writeln!(
            out,
            "  {:<8} {:>6} {:>11.3}s",
            format!("W{}", summary.worker),
            summary.tasks,
            summary.mean_latency
        )?;
    }

    writeln!(out, "\nTask Log")?;
    writeln!(out, "========")?;
    if report.records.is_empty() {
        writeln!(out, "  No tasks yet")?;
    } else {
        writeln!(
            out,
            "  {:<6} {:<8} {:>10} {:>9} {:>8}",
            "TASK", "WORKER", "COMPLEXITY", "TIME (s)", "EPSILON"
        )?;
        for record in report.records.iter().rev() {
            writeln!(
                out,
                "  {:<6} {:<8} {:>10} {:>9} {:>8}",
                record.sequence,
                record.worker,
                round(record.complexity, 2),
                round(record.elapsed, 2),
                round(record.epsilon, 3)
            )?;
        }
    }

    writeln!(out, "\nQ-Table Snapshot")?;
    writeln!(out, "================")?;
    if report.snapshot.rows.is_empty() {
        writeln!(out, "  Q-table is empty")?;
    } else {
        writeln!(
            out,
            "  {} states learned, showing last {}",
            report.snapshot.total_states,
            report.snapshot.rows.len()
        )?;
        for row in &report.snapshot.rows {
            let values: Vec<String> = row
                .values
                .iter()
                .enumerate()
                .map(|(i, v)| format!("W{i}={}", round(*v, 3)))
                .collect();
            writeln!(out, "  {:<16} {}", row.state.to_string(), values.join("  "))?;
        }
    }

    Ok(())
}
