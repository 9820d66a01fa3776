use std::path::PathBuf;

use clap::{Parser, Subcommand};
use projection::ViewParams;
use tools::{Workspace, inspect, parse_pair, switch_view, transform_point};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect Maplat map descriptors and their projections")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the strategy, projection, extents and tile grid of a map
    Inspect {
        descriptor: PathBuf,
    },

    /// Transform one point through the map's projection
    Transform {
        descriptor: PathBuf,

        /// Source projection code (default: the map's own)
        #[arg(long)]
        from: Option<String>,

        /// Target projection code (default: EPSG:3857)
        #[arg(long)]
        to: Option<String>,

        #[arg(allow_hyphen_values = true)]
        x: f64,

        #[arg(allow_hyphen_values = true)]
        y: f64,
    },

    /// Carry a view from one map to another
    Switch {
        from: PathBuf,
        to: PathBuf,

        /// View center as x,y in the first map's coordinates
        #[arg(long, allow_hyphen_values = true)]
        center: String,

        /// Radians
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        rotation: f64,

        #[arg(long, default_value_t = 1.0)]
        resolution: f64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut ws = Workspace::new();

    match args.command {
        Command::Inspect { descriptor } => {
            let source = ws.load(&descriptor)?;
            let report = inspect(&ws, &source)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Transform {
            descriptor,
            from,
            to,
            x,
            y,
        } => {
            let source = ws.load(&descriptor)?;
            let p = transform_point(
                &ws,
                &source,
                from.as_deref(),
                to.as_deref(),
                foundation::Vec2::new(x, y),
            )?;
            println!("{}\t{}", p.x, p.y);
        }
        Command::Switch {
            from,
            to,
            center,
            rotation,
            resolution,
        } => {
            let a = ws.load(&from)?;
            let b = ws.load(&to)?;
            let view = ViewParams::new(parse_pair(&center)?, rotation, resolution);
            let report = switch_view(&ws, &a, &b, view)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
