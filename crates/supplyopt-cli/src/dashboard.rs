use std::fmt;

use supplyopt_core::{Report, SolutionStatus};

const BAR_WIDTH: usize = 40;

/// Render the report as a plain-text dashboard
pub fn render(report: &Report) -> String {
    Dashboard(report).to_string()
}

struct Dashboard<'a>(&'a Report);

impl fmt::Display for Dashboard<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_report(out, self.0)
    }
}

fn write_report(out: &mut fmt::Formatter<'_>, report: &Report) -> fmt::Result {
    let title = "Supply Chain Optimization Dashboard";
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "=".repeat(title.len()))?;
    writeln!(out)?;

    writeln!(out, "Total Historical Cost")?;
    writeln!(out, "  {:.2}", report.total_historical_cost)?;
    if report.unmatched_cost_orders > 0 {
        writeln!(out, "  ({} orders had no warehouse cost)", report.unmatched_cost_orders)?;
    }
    writeln!(out)?;

    writeln!(out, "Capacity Utilization")?;
    let ratios = &report.utilization.ratios;
    let max_ratio = ratios.values().copied().fold(0.0_f64, f64::max);
    let label_width = ratios.keys().map(|k| k.len()).max().unwrap_or(0);
    for (plant, &ratio) in ratios {
        let filled = if max_ratio > 0.0 {
            ((ratio / max_ratio) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        writeln!(
            out,
            "  {:label_width$}  {:bar_width$}  {:.4}",
            plant,
            "#".repeat(filled),
            ratio,
            bar_width = BAR_WIDTH,
        )?;
    }
    if ratios.is_empty() {
        writeln!(out, "  (no plant has a usable capacity)")?;
    }
    if !report.utilization.uncapacitated.is_empty() {
        writeln!(out, "  No capacity data: {}", report.utilization.uncapacitated.join(", "))?;
    }
    writeln!(out)?;

    let opt = &report.optimization;
    writeln!(out, "Optimal Cost")?;
    match opt.objective {
        Some(objective) => writeln!(out, "  {:.2}", objective)?,
        None => {
            writeln!(out, "  {}", opt.status)?;
            match opt.status {
                SolutionStatus::Infeasible => {
                    writeln!(out, "  No allocation satisfies every order.")?;
                    for v in &opt.violations {
                        writeln!(out, "    - {}", v.description)?;
                    }
                }
                SolutionStatus::Unbounded => writeln!(out, "  The problem has no finite optimal solution.")?,
                SolutionStatus::IterationLimit => {
                    writeln!(out, "  Stopped after {} pivots without proving optimality.", opt.iterations)?
                }
                SolutionStatus::Optimal => {}
            }
        }
    }
    writeln!(out)?;

    writeln!(out, "Optimal Routing Solution")?;
    match opt.allocation_by_plant() {
        Some(allocation) => {
            for (plant, value) in allocation {
                writeln!(out, "  {:label_width$}  {:12.4}", plant, value, label_width = label_width.max(plant.len()))?;
            }
        }
        None => writeln!(out, "  (none)")?,
    }

    Ok(())
}
