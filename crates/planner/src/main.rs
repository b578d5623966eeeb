//! Venue Planner CLI

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use venue_layout::{
    analyze_layout, compute_energy_breakdown, compute_objectives, count_violations, Layout,
    LayoutStyle, LayoutWeights, Orchestrator, PipelineConfig, PlanRequest, PlanResponse,
    RoomBoundary, OBJECTIVE_NAMES,
};

#[derive(Parser)]
#[command(name = "venue-planner")]
#[command(about = "Venue layout optimization and event scheduling")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on a JSON plan request
    Plan {
        /// Path to the request JSON
        #[arg(short, long)]
        request: PathBuf,

        /// Base random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Use small solver budgets
        #[arg(short, long)]
        quick: bool,

        /// Output file for the response (JSON); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score a layout JSON file
    Score {
        /// Path to the layout JSON
        #[arg(short, long)]
        layout: PathBuf,

        /// Seat target (defaults to the layout's seat count)
        #[arg(short, long)]
        target: Option<u32>,
    },

    /// Plan a demo event in a rectangular room
    Demo {
        /// Layout style (theater, banquet, classroom, cocktail, boardroom, u-shape)
        #[arg(long, default_value = "banquet")]
        style: String,

        /// Guest count
        #[arg(short, long, default_value = "100")]
        capacity: u32,

        /// Room width in feet
        #[arg(long, default_value = "60")]
        width: f64,

        /// Room depth in feet
        #[arg(long, default_value = "40")]
        depth: f64,

        /// Base random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            request,
            seed,
            quick,
            output,
        } => {
            let text = fs::read_to_string(&request)
                .with_context(|| format!("reading {}", request.display()))?;
            let plan: PlanRequest = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", request.display()))?;

            let response = orchestrator(seed, quick).run_full_pipeline(&plan)?;
            print_summary(&response);

            let json = serde_json::to_string_pretty(&response)?;
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    println!("\nResponse saved to: {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Score { layout, target } => {
            let layout = read_layout(&layout)?;
            layout.validate()?;
            score(&layout, target.unwrap_or_else(|| layout.total_seats()));
        }

        Commands::Demo {
            style,
            capacity,
            width,
            depth,
            seed,
        } => {
            let style: LayoutStyle = style.parse()?;
            let room = RoomBoundary::rectangle(width, depth)
                .with_exit(0.0, depth / 2.0, 6.0)
                .with_exit(width, depth / 2.0, 6.0);
            let request = PlanRequest::new(format!("{} for {} guests", style, capacity), room);

            let response = orchestrator(seed, true).run_full_pipeline(&request)?;
            print_summary(&response);
            println!();
            score(&response.optimized, capacity);
        }
    }

    Ok(())
}

fn orchestrator(seed: u64, quick: bool) -> Orchestrator {
    let config = if quick {
        PipelineConfig::quick()
    } else {
        PipelineConfig::default()
    };
    Orchestrator::new(config.with_seed(seed))
}

fn read_layout(path: &Path) -> anyhow::Result<Layout> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_summary(response: &PlanResponse) {
    println!("Pipeline Stages:");
    println!("{:-<72}", "");
    println!(
        "{:<10} {:>12} {:>12} {:>9} {:>10} {:>12}",
        "stage", "time", "iterations", "quality", "violations", "placed"
    );
    for s in &response.stats {
        println!(
            "{:<10} {:>12} {:>12} {:>9.3} {:>10} {:>12}",
            s.stage.to_string(),
            format!("{:.2?}", s.solve_time),
            s.iterations,
            s.quality,
            s.violations,
            format!("{}/{}", s.items_placed, s.items_requested)
        );
    }

    let schedule = &response.schedule;
    println!(
        "\nSchedule: {} assignments, feasible: {}, objective {:.3}",
        schedule.assignments.len(),
        schedule.feasible,
        schedule.objective
    );
    for v in &schedule.violations {
        println!("  ! {}", v);
    }
    println!(
        "Layout: {} items, {} seats, energy {:.3}",
        response.optimized.items.len(),
        response.optimized.total_seats(),
        response.optimized.energy
    );
    println!(
        "Alternatives: {}, Pareto front: {}",
        response.alternatives.len(),
        response.pareto.len()
    );
}

fn score(layout: &Layout, target: u32) {
    let weights = LayoutWeights::default();
    let breakdown = compute_energy_breakdown(&layout.items, &layout.room, target);

    println!("Energy Terms (unweighted):");
    println!("{:-<40}", "");
    let names = [
        "overlap",
        "aisle",
        "egress",
        "sightline",
        "capacity",
        "ada",
        "aesthetic",
        "service",
    ];
    for (name, value) in names.iter().zip(breakdown.as_array()) {
        println!("  {:<12} {:>12.4}", name, value);
    }
    println!("  {:<12} {:>12.4}", "weighted", breakdown.total(&weights));
    println!("  {:<12} {:>12}", "violations", count_violations(&breakdown, 1e-6));

    let objectives = compute_objectives(&layout.items, &layout.room, &weights, target);
    println!("\nObjectives:");
    for (name, value) in OBJECTIVE_NAMES.iter().zip(objectives.as_array()) {
        println!("  {:<14} {:>12.4}", name, value);
    }

    let report = analyze_layout(&layout.items, &layout.room);
    println!("\nFloor Use:");
    println!("  coverage       {:>11.1}%", report.coverage * 100.0);
    println!(
        "  dead space     {:>9.1} sq ft in {} regions",
        report.dead_space_area,
        report.regions.len()
    );
    println!(
        "  clusters       {:>12} (connectivity {:.2})",
        report.clusters, report.connectivity
    );
}
