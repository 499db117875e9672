//! Whittle CLI - mesh simplification command-line tool.
//!
//! Usage: whittle <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `whittle --help` for available commands.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};

use whittle::io;
use whittle::mesh::Mesh;
use whittle::simplify::{Algorithm, MeshSimplifier, Progress, SimplifyOptions};

#[derive(Parser)]
#[command(name = "whittle")]
#[command(author, version, about = "Mesh simplification CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Decimate (simplify) a mesh
    Decimate {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Target number of triangles
        #[arg(short = 'f', long, conflicts_with_all = ["ratio", "lossless"])]
        faces: Option<usize>,

        /// Target ratio of triangles to keep (0.0 to 1.0)
        #[arg(short, long, default_value = "0.5", conflicts_with = "lossless")]
        ratio: f64,

        /// Remove only zero-error edges until a fixpoint
        #[arg(long)]
        lossless: bool,

        /// Threshold schedule exponent (higher = better quality, more passes)
        #[arg(short, long, default_value = "7.0")]
        aggressiveness: f64,

        /// Never collapse edges with a border endpoint
        #[arg(long)]
        preserve_borders: bool,

        /// Disable merging of coincident border vertices
        #[arg(long)]
        no_smart_link: bool,

        /// Stop once the vertex count drops below this bound (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_vertices: usize,

        /// Simplification algorithm
        #[arg(long, default_value = "fast-quadric")]
        algorithm: String,

        /// Log per-pass progress
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Decimate { verbose: true, .. });
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "info" }),
    )
    .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => {
            cmd_info(&input)?;
        }

        Commands::Decimate {
            input,
            output,
            faces,
            ratio,
            lossless,
            aggressiveness,
            preserve_borders,
            no_smart_link,
            max_vertices,
            algorithm,
            verbose,
        } => {
            cmd_decimate(
                &input,
                &output,
                faces,
                ratio,
                lossless,
                aggressiveness,
                preserve_borders,
                no_smart_link,
                max_vertices,
                &algorithm,
                verbose,
            )?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |iteration, original, current, target| {
        if target < 0 {
            // Lossless mode has no meaningful percentage; show the pass count.
            eprint!("\r[pass {:4}] {} triangles", iteration, current);
            let _ = std::io::stderr().flush();
            return;
        }

        let total = original.saturating_sub(target as usize);
        if total == 0 {
            return;
        }
        let done = original.saturating_sub(current);
        let raw_percent = if done >= total {
            100
        } else {
            ((done * 100) + (total / 2)) / total
        };

        // Only ever advance, so the bar doesn't bounce between passes.
        let percent = max_percent.fetch_max(raw_percent, Ordering::Relaxed).max(raw_percent);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar: String = std::iter::repeat('=').take(filled).collect();
        let space: String = std::iter::repeat(' ').take(bar_width - filled).collect();

        eprint!("\r[{}{}] {:3}% {} triangles", bar, space, percent, current);
        let _ = std::io::stderr().flush();
    })
}

fn cmd_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: Mesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.vertex_count());
    println!("Triangles: {}", mesh.triangle_count());
    println!("Sub-meshes: {}", mesh.sub_mesh_count());
    for sub in 0..mesh.sub_mesh_count() {
        println!("  [{}]: {} triangles", sub, mesh.sub_mesh(sub)?.len() / 3);
    }

    println!(
        "Normals: {}",
        if mesh.normals.is_some() { "yes" } else { "no" }
    );
    let uv_count = mesh.uv_channels.iter().flatten().count();
    println!("UV channels: {}", uv_count);
    println!(
        "Colors: {}",
        if mesh.colors.is_some() { "yes" } else { "no" }
    );
    println!(
        "Bone weights: {}",
        if mesh.bone_weights.is_some() { "yes" } else { "no" }
    );

    // Bounding box
    if let Some(first) = mesh.positions.first() {
        let mut min = first.coords;
        let mut max = first.coords;
        for p in &mesh.positions {
            min = min.inf(&p.coords);
            max = max.sup(&p.coords);
        }
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_decimate(
    input: &PathBuf,
    output: &PathBuf,
    faces: Option<usize>,
    ratio: f64,
    lossless: bool,
    aggressiveness: f64,
    preserve_borders: bool,
    no_smart_link: bool,
    max_vertices: usize,
    algorithm: &str,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: Mesh = io::load(input)?;

    println!(
        "Loaded: {} vertices, {} triangles, {} sub-meshes",
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.sub_mesh_count()
    );

    let options = SimplifyOptions::default()
        .with_aggressiveness(aggressiveness)
        .with_preserve_borders(preserve_borders)
        .with_smart_link(!no_smart_link)
        .with_max_vertex_count(max_vertices)
        .with_verbose(verbose);

    let mut simplifier: MeshSimplifier = Algorithm::from_name(algorithm)?.create(options);
    simplifier.set_progress(create_progress());
    simplifier.initialize(&mesh)?;

    let start = Instant::now();
    if lossless {
        println!("Decimating losslessly...");
        simplifier.decimate_lossless()?;
    } else {
        let target = faces.unwrap_or(((mesh.triangle_count() as f64) * ratio).round() as usize);
        println!("Decimating to {} triangles...", target);
        simplifier.decimate_to_triangles(target)?;
    }
    let elapsed = start.elapsed();
    eprintln!();

    let result = simplifier.to_mesh();
    println!(
        "Result: {} vertices, {} triangles",
        result.vertex_count(),
        result.triangle_count()
    );
    io::save(&result, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}
